use image::{imageops, RgbImage};

use super::traits::ConvolutionFilter;
use crate::types::FilterKind;

const BLUR_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
// filter3x3 divides by the kernel sum, giving the usual /2 edge-enhance weighting
const EDGE_ENHANCE_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 10.0, -1.0, -1.0, -1.0, -1.0];
const EMBOSS_KERNEL: [f32; 9] = [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0];

/// 3x3 kernels run through `image::imageops::filter3x3`.
///
/// `filter3x3` leaves the one-pixel frame black; the frame is carried over
/// from the previous pass instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFilters;

impl ImageFilters {
    fn keep_frame(previous: &RgbImage, filtered: &mut RgbImage) {
        let (width, height) = previous.dimensions();
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    filtered.put_pixel(x, y, *previous.get_pixel(x, y));
                }
            }
        }
    }

    fn kernel(kind: FilterKind) -> &'static [f32; 9] {
        match kind {
            FilterKind::Blur => &BLUR_KERNEL,
            FilterKind::EdgeEnhance => &EDGE_ENHANCE_KERNEL,
            FilterKind::Emboss => &EMBOSS_KERNEL,
        }
    }
}

impl ConvolutionFilter for ImageFilters {
    fn apply(&self, kind: FilterKind, image: &RgbImage, passes: usize) -> RgbImage {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            // No interior pixels to convolve
            return image.clone();
        }
        let kernel = Self::kernel(kind);
        let mut current = image.clone();
        for _ in 0..passes {
            let mut filtered = imageops::filter3x3(&current, kernel);
            Self::keep_frame(&current, &mut filtered);
            current = filtered;
        }
        current
    }
}
