//! Image-valued primitives.
//!
//! Each primitive consumes resolved pixel buffers and finishes by min-max
//! normalizing its own output. Numeric degeneracies (division by zero,
//! out-of-domain trig/log/power arguments, non-finite intermediates) are
//! substituted with 0 rather than reported.

use image::{Rgb, RgbImage};
use rayon::prelude::*;
use std::sync::Arc;

use super::noise::PerlinNoise;
use super::registry::Function;
use super::traits::{ColorMap, ConvolutionFilter};
use crate::error::{PicEvolveError, Result};
use crate::types::{FilterKind, PixelBuffer};

const MANDEL_ITERATIONS: usize = 50;
const MANDEL_EXTENT: f64 = 3.0;

/// Scale `data` into [0, 1]. Constant buffers become all zeros and
/// non-finite entries count as 0.
pub fn normalize(mut data: Vec<f64>) -> PixelBuffer {
    data.par_iter_mut().for_each(|v| {
        if !v.is_finite() {
            *v = 0.0;
        }
    });
    if data.is_empty() {
        return data;
    }

    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if range == 0.0 {
        data.par_iter_mut().for_each(|v| *v = 0.0);
    } else if range.is_finite() {
        data.par_iter_mut().for_each(|v| *v = (*v - min) / range);
    } else {
        // Span overflows f64; halving is exact, so the ratios are unchanged
        let (half_min, half_range) = (min / 2.0, max / 2.0 - min / 2.0);
        data.par_iter_mut()
            .for_each(|v| *v = (*v / 2.0 - half_min) / half_range);
    }
    data
}

/// Mean of all pixels, 0 for an empty buffer
pub fn average(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Floored modulus: the result takes the divisor's sign
pub fn floored_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

/// Round `a` to `digits` decimal places, ties away from zero.
/// Negative `digits` round to tens, hundreds, ...
pub fn round_to(a: f64, digits: f64) -> f64 {
    let digits = (digits as i64).clamp(-400, 400) as i32;
    if !a.is_finite() {
        return a;
    }
    if digits >= 0 {
        let scale = 10f64.powi(digits);
        let scaled = a * scale;
        if !scale.is_finite() || !scaled.is_finite() {
            return a;
        }
        scaled.round() / scale
    } else {
        let scale = 10f64.powi(-digits);
        if !scale.is_finite() {
            return 0.0 * a.signum();
        }
        (a / scale).round() * scale
    }
}

/// `a` raised to `b`; negative bases use the truncated exponent and
/// zero to a negative power is 0
pub fn power(a: f64, b: f64) -> f64 {
    if a == 0.0 && b < 0.0 {
        return 0.0;
    }
    let exponent = if a < 0.0 { b.trunc() } else { b };
    a.powf(exponent)
}

/// log base `b` of `a`, 0 outside the real domain
pub fn log_base(a: f64, b: f64) -> f64 {
    if a > 0.0 && b > 0.0 && b != 1.0 {
        a.ln() / b.ln()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    /// Bit equivalence, 1 where the digits match
    And,
    Or,
    Xor,
}

/// Binary digits of `n`, most significant first. Negative values keep a
/// leading `b` marker in place of the sign.
fn binary_digits(n: i64) -> String {
    if n < 0 {
        format!("b{:b}", n.unsigned_abs())
    } else {
        format!("{:b}", n)
    }
}

/// Combine the digit strings of two integers position by position from the
/// most significant end, over the shorter of the two lengths.
pub fn bitwise_combine(a: i64, b: i64, op: BitOp) -> u128 {
    let a_digits = binary_digits(a);
    let b_digits = binary_digits(b);

    let combined: String = a_digits
        .bytes()
        .zip(b_digits.bytes())
        .map(|(x, y)| {
            let set = match op {
                BitOp::And => x == y,
                BitOp::Or => x == b'1' || y == b'1',
                BitOp::Xor => (x == b'1' && y == b'0') || (x == b'0' && y == b'1'),
            };
            if set {
                '1'
            } else {
                '0'
            }
        })
        .collect();

    if combined.is_empty() {
        return 0;
    }
    u128::from_str_radix(&combined, 2).unwrap_or(0)
}

/// Pixel scalars become integers by scaling ×100 and truncating
fn scaled_int(v: f64) -> i64 {
    (v * 100.0) as i64
}

/// The primitive operators, bound to an output size and the injected
/// colour-map and convolution collaborators.
#[derive(Clone)]
pub struct ImageLibrary {
    width: usize,
    height: usize,
    color_map: Arc<dyn ColorMap>,
    filter: Arc<dyn ConvolutionFilter>,
}

impl ImageLibrary {
    pub fn new(
        width: usize,
        height: usize,
        color_map: Arc<dyn ColorMap>,
        filter: Arc<dyn ConvolutionFilter>,
    ) -> Self {
        Self {
            width,
            height,
            color_map,
            filter,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn color_map(&self) -> &Arc<dyn ColorMap> {
        &self.color_map
    }

    /// Run `function` on already-resolved argument buffers
    pub fn apply(&self, function: Function, args: &[PixelBuffer]) -> Result<PixelBuffer> {
        if args.len() != function.arity() {
            return Err(PicEvolveError::ArityMismatch {
                function: function.name().to_string(),
                expected: function.arity(),
                actual: args.len(),
            });
        }

        let raw = match function {
            Function::Add => zip_with(&args[0], &args[1], |a, b| a + b),
            Function::Sub => zip_with(&args[0], &args[1], |a, b| a - b),
            Function::Mul => zip_with(&args[0], &args[1], |a, b| a * b),
            Function::Div => zip_with(&args[0], &args[1], |a, b| if b != 0.0 { a / b } else { 0.0 }),
            Function::Mod => zip_with(&args[0], &args[1], |a, b| {
                if b != 0.0 {
                    floored_mod(a, b)
                } else {
                    0.0
                }
            }),
            Function::Rnd => zip_with(&args[0], &args[1], round_to),
            Function::Minimum => zip_with(&args[0], &args[1], f64::min),
            Function::Maximum => zip_with(&args[0], &args[1], f64::max),
            Function::Absolute => map(&args[0], f64::abs),
            Function::Expt => zip_with(&args[0], &args[1], power),
            Function::Logarithm => zip_with(&args[0], &args[1], log_base),
            Function::Sine => map(&args[0], f64::sin),
            Function::Cosine => map(&args[0], f64::cos),
            Function::Tangent => map(&args[0], f64::tan),
            Function::Asine => map(&args[0], |a| if (-1.0..=1.0).contains(&a) { a.asin() } else { 0.0 }),
            Function::Acosine => map(&args[0], |a| if (-1.0..=1.0).contains(&a) { a.acos() } else { 0.0 }),
            Function::Atangent => map(&args[0], f64::atan),
            Function::And => self.bitwise(&args[0], &args[1], BitOp::And),
            Function::Or => self.bitwise(&args[0], &args[1], BitOp::Or),
            Function::Xor => self.bitwise(&args[0], &args[1], BitOp::Xor),
            Function::Noise => self.noise(&args[0], &args[1]),
            Function::Blur => self.filtered(FilterKind::Blur, &args[0], &args[1]),
            Function::EdgeEnhance => self.filtered(FilterKind::EdgeEnhance, &args[0], &args[1]),
            Function::Emboss => self.filtered(FilterKind::Emboss, &args[0], &args[1]),
            Function::Mandel => self.mandel(&args[0], &args[1]),
            Function::Lerp => self.lerp(&args[0], &args[1], &args[2]),
        };

        Ok(normalize(raw))
    }

    fn bitwise(&self, a: &[f64], b: &[f64], op: BitOp) -> Vec<f64> {
        zip_with(a, b, move |x, y| {
            bitwise_combine(scaled_int(x), scaled_int(y), op) as f64
        })
    }

    /// Perlin field seeded by ten times the mean of `a`, sampled at pixel
    /// indices divided by ten times the mean of `b`.
    ///
    /// The field is filled column by column: buffer index `x * height + y`
    /// holds the sample at (x, y).
    fn noise(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        let seed = average(a) * 10.0;
        let scale = average(b) * 10.0;
        let height = self.height;
        let pixels = self.width * self.height;

        if scale == 0.0 {
            return vec![0.0; pixels];
        }

        let perlin = PerlinNoise::new(seed);
        (0..pixels)
            .into_par_iter()
            .map(|index| {
                let x = (index / height) as f64;
                let y = (index % height) as f64;
                let n = perlin.noise(x / scale, y / scale);
                (((n + 1.0) * 128.0) as i64).clamp(0, 255) as f64
            })
            .collect()
    }

    /// Colour `a`, run the filter `int(mean(b) * 10)` times and average the
    /// channels back to one scalar per pixel.
    fn filtered(&self, kind: FilterKind, a: &[f64], b: &[f64]) -> Vec<f64> {
        let passes = (average(b) * 10.0) as i64;
        let passes = passes.max(0) as usize;

        let raster = self.rasterize(a);
        let filtered = self.filter.apply(kind, &raster, passes);

        filtered
            .pixels()
            .map(|p| (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0)
            .collect()
    }

    /// Escape-time fractal over a 3×3 viewport whose corner is
    /// (mean(a), mean(b)). Row 0 samples the corner's imaginary part.
    fn mandel(&self, a: &[f64], b: &[f64]) -> Vec<f64> {
        let corner_re = average(a);
        let corner_im = average(b);
        let x_step = MANDEL_EXTENT / self.width as f64;
        let y_step = MANDEL_EXTENT / self.height as f64;

        // Coordinates advance by repeated addition, one step per pixel
        let mut xs = Vec::with_capacity(self.width);
        let mut x = corner_re;
        for _ in 0..self.width {
            xs.push(x);
            x += x_step;
        }
        let mut ys = Vec::with_capacity(self.height);
        let mut y = corner_im;
        for _ in 0..self.height {
            ys.push(y);
            y += y_step;
        }

        let width = self.width;
        (0..self.width * self.height)
            .into_par_iter()
            .map(|index| escape_time(xs[index % width], ys[index / width]))
            .collect()
    }

    fn lerp(&self, a: &[f64], b: &[f64], c: &[f64]) -> Vec<f64> {
        let t = average(c);
        zip_with(a, b, move |x, y| t * x + (1.0 - t) * y)
    }

    /// Map a buffer through the colour map, row-major
    pub fn rasterize(&self, data: &[f64]) -> RgbImage {
        let width = self.width;
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let value = data
                .get(y as usize * width + x as usize)
                .copied()
                .unwrap_or(0.0);
            Rgb(self.color_map.color_of(value))
        })
    }
}

impl std::fmt::Debug for ImageLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLibrary")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Iteration at which z escapes |z|² > 4, or 0 if it never does
fn escape_time(re: f64, im: f64) -> f64 {
    let (mut z_re, mut z_im) = (re, im);
    for i in 0..MANDEL_ITERATIONS {
        let next_re = z_re * z_re - z_im * z_im + re;
        let next_im = 2.0 * z_re * z_im + im;
        z_re = next_re;
        z_im = next_im;
        if z_re * z_re + z_im * z_im > 4.0 {
            return i as f64;
        }
    }
    0.0
}

fn map<F>(a: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    a.par_iter().map(|&x| f(x)).collect()
}

fn zip_with<F>(a: &[f64], b: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    a.par_iter().zip(b.par_iter()).map(|(&x, &y)| f(x, y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::color::Gradient;
    use crate::functions::filters::ImageFilters;

    fn library(width: usize, height: usize) -> ImageLibrary {
        ImageLibrary::new(
            width,
            height,
            Arc::new(Gradient::new(vec![[0, 0, 0], [255, 255, 255]])),
            Arc::new(ImageFilters),
        )
    }

    fn assert_normalized(data: &[f64]) {
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)), "{:?}", data);
        let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(min == 0.0 || max == 1.0 || data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_normalize_scales_into_unit_range() {
        assert_eq!(normalize(vec![2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_normalize_constant_is_zero() {
        assert_eq!(normalize(vec![3.5; 4]), vec![0.0; 4]);
        assert!(normalize(Vec::new()).is_empty());
    }

    #[test]
    fn test_normalize_substitutes_non_finite() {
        let out = normalize(vec![f64::INFINITY, 1.0, f64::NAN, 3.0]);
        assert_eq!(out, vec![0.0, 1.0 / 3.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_survives_overflowing_span() {
        let out = normalize(vec![-f64::MAX, 0.0, f64::MAX]);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_floored_mod_follows_divisor_sign() {
        assert_eq!(floored_mod(5.0, 3.0), 2.0);
        assert_eq!(floored_mod(-5.0, 3.0), 1.0);
        assert_eq!(floored_mod(5.0, -3.0), -1.0);
    }

    #[test]
    fn test_round_to_digits() {
        assert_eq!(round_to(3.14159, 2.9), 3.14);
        assert_eq!(round_to(2.5, 0.0), 3.0);
        assert_eq!(round_to(-2.5, 0.0), -3.0);
        assert_eq!(round_to(0.125, 2.0), 0.13);
        assert_eq!(round_to(-150.0, -2.0), -200.0);
        assert_eq!(round_to(1234.0, -2.0), 1200.0);
        assert_eq!(round_to(0.123, 1000.0), 0.123);
    }

    #[test]
    fn test_power_guards() {
        assert_eq!(power(0.0, -1.0), 0.0);
        assert_eq!(power(-2.0, 3.7), -8.0);
        assert_eq!(power(4.0, 0.5), 2.0);
    }

    #[test]
    fn test_log_base_domain() {
        assert!((log_base(8.0, 2.0) - 3.0).abs() < 1e-12);
        assert_eq!(log_base(-1.0, 2.0), 0.0);
        assert_eq!(log_base(5.0, 1.0), 0.0);
        assert_eq!(log_base(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_bitwise_equal_lengths() {
        // 101 vs 110
        assert_eq!(bitwise_combine(5, 6, BitOp::And), 0b100);
        assert_eq!(bitwise_combine(5, 6, BitOp::Or), 0b111);
        assert_eq!(bitwise_combine(5, 6, BitOp::Xor), 0b011);
    }

    #[test]
    fn test_bitwise_aligns_from_most_significant_digit() {
        // "101" against "11": only the first two digits are compared
        assert_eq!(bitwise_combine(5, 3, BitOp::And), 0b10);
        assert_eq!(bitwise_combine(5, 3, BitOp::Or), 0b11);
        assert_eq!(bitwise_combine(5, 3, BitOp::Xor), 0b01);
    }

    #[test]
    fn test_bitwise_and_is_equivalence() {
        assert_eq!(bitwise_combine(0, 0, BitOp::And), 1);
        assert_eq!(bitwise_combine(7, 7, BitOp::And), 0b111);
    }

    #[test]
    fn test_bitwise_negative_marker() {
        // "b101" against "110": the marker never matches a digit
        assert_eq!(bitwise_combine(-5, 6, BitOp::And), 0b011);
        assert_eq!(bitwise_combine(-5, 6, BitOp::Or), 0b110);
        assert_eq!(bitwise_combine(-5, 6, BitOp::Xor), 0b000);
        // "b101" against "b11"
        assert_eq!(bitwise_combine(-5, -3, BitOp::And), 0b110);
    }

    #[test]
    fn test_div_and_mod_zero_guard() {
        let lib = library(1, 1);
        let raw = zip_with(&[5.0], &[0.0], |a, b| if b != 0.0 { a / b } else { 0.0 });
        assert_eq!(raw, vec![0.0]);
        assert_eq!(lib.apply(Function::Div, &[vec![5.0], vec![0.0]]).unwrap(), vec![0.0]);
        assert_eq!(lib.apply(Function::Mod, &[vec![5.0], vec![0.0]]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_div_mixes_guarded_and_real_pixels() {
        let lib = library(3, 1);
        let out = lib
            .apply(Function::Div, &[vec![5.0, 6.0, 1.0], vec![0.0, 2.0, 1.0]])
            .unwrap();
        // raw: [0, 3, 1]
        assert_eq!(out, vec![0.0, 1.0, 1.0 / 3.0]);
    }

    #[test]
    fn test_every_primitive_normalizes() {
        let lib = library(4, 3);
        let a: Vec<f64> = (0..12).map(|i| i as f64 * 0.3 - 1.5).collect();
        let b: Vec<f64> = (0..12).map(|i| (i as f64 * 0.7).sin()).collect();
        let c: Vec<f64> = vec![0.25; 12];
        for function in Function::ALL {
            let args = match function.arity() {
                1 => vec![a.clone()],
                2 => vec![a.clone(), b.clone()],
                _ => vec![a.clone(), b.clone(), c.clone()],
            };
            let out = lib.apply(function, &args).unwrap();
            assert_eq!(out.len(), 12, "{}", function);
            assert_normalized(&out);
        }
    }

    #[test]
    fn test_arity_is_checked() {
        let lib = library(2, 2);
        let err = lib.apply(Function::Lerp, &[vec![0.0; 4]]).unwrap_err();
        assert!(matches!(err, PicEvolveError::ArityMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_lerp_constant_collapses_to_zero() {
        let lib = library(2, 2);
        let raw = lib.lerp(&[1.0; 4], &[0.0; 4], &[0.5; 4]);
        assert_eq!(raw, vec![0.5; 4]);
        let out = lib
            .apply(Function::Lerp, &[vec![1.0; 4], vec![0.0; 4], vec![0.5; 4]])
            .unwrap();
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn test_noise_zero_scale_is_blank() {
        let lib = library(3, 3);
        assert_eq!(lib.noise(&[0.4; 9], &[0.0; 9]), vec![0.0; 9]);
    }

    #[test]
    fn test_noise_values_are_bytes() {
        let lib = library(6, 5);
        let raw = lib.noise(&[0.3; 30], &[0.25; 30]);
        assert!(raw.iter().all(|v| v.fract() == 0.0 && (0.0..256.0).contains(v)));
    }

    #[test]
    fn test_noise_fills_column_by_column() {
        let lib = library(4, 3);
        let raw = lib.noise(&[0.3; 12], &[0.25; 12]);
        let perlin = PerlinNoise::new(average(&[0.3; 12]) * 10.0);
        for x in 0..4 {
            for y in 0..3 {
                let n = perlin.noise(x as f64 / 2.5, y as f64 / 2.5);
                let expected = (((n + 1.0) * 128.0) as i64).clamp(0, 255) as f64;
                assert_eq!(raw[x * 3 + y], expected, "x={} y={}", x, y);
            }
        }
    }

    #[test]
    fn test_mandel_escape_counts() {
        // Far outside the set: escapes on the first iteration
        assert_eq!(escape_time(3.0, 3.0), 0.0);
        // The origin never escapes
        assert_eq!(escape_time(0.0, 0.0), 0.0);
        // c = 1: 2, 5 -> escapes on the second iteration
        assert_eq!(escape_time(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_mandel_row_zero_uses_corner_imaginary() {
        let lib = library(3, 3);
        let raw = lib.mandel(&[-2.0; 9], &[-1.5; 9]);
        assert_eq!(raw.len(), 9);
        assert_eq!(raw[0], escape_time(-2.0, -1.5));
        assert_eq!(raw[4], escape_time(-1.0, -0.5));
    }

    #[test]
    fn test_filter_passes_from_mean() {
        let lib = library(4, 4);
        let a: Vec<f64> = (0..16).map(|i| (i % 4) as f64 / 3.0).collect();
        let unfiltered = lib.filtered(FilterKind::Blur, &a, &[0.05; 16]);
        // 0.05 * 10 truncates to zero passes: only the colour round trip remains
        let expected: Vec<f64> = a.iter().map(|v| (v * 255.0).round()).collect();
        assert_eq!(unfiltered, expected);
    }
}
