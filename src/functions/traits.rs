use image::RgbImage;

use crate::types::FilterKind;

/// Maps a normalized scalar to a displayable colour
pub trait ColorMap: Send + Sync {
    fn color_of(&self, value: f64) -> [u8; 3];
}

/// Applies a named convolution filter to an RGB raster `passes` times
pub trait ConvolutionFilter: Send + Sync {
    fn apply(&self, kind: FilterKind, image: &RgbImage, passes: usize) -> RgbImage;
}
