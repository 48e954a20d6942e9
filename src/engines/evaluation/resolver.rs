use rayon::prelude::*;

use crate::types::{Coordinate, PixelBuffer};

/// Coordinate fields over [-1,1]² sampled on a `width`×`height` grid.
///
/// Column 0 sits at x = -1 and row 0 at y = 1; each step adds 2/width
/// (or subtracts 2/height) to the previous coordinate. The angle field is
/// the unguarded `atan(y / x)`, so the x = 0 column reads ±π/2 and the
/// origin, where the quotient is undefined, reads 0.
#[derive(Debug, Clone)]
pub struct CoordinateGrid {
    width: usize,
    height: usize,
    x: PixelBuffer,
    y: PixelBuffer,
    radius: PixelBuffer,
    angle: PixelBuffer,
}

impl CoordinateGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let columns = axis(-1.0, 2.0 / width as f64, width);
        let rows = axis(1.0, -2.0 / height as f64, height);
        let pixels = width * height;

        let x: PixelBuffer = (0..pixels).into_par_iter().map(|i| columns[i % width]).collect();
        let y: PixelBuffer = (0..pixels).into_par_iter().map(|i| rows[i / width]).collect();
        let radius = x
            .par_iter()
            .zip(y.par_iter())
            .map(|(x, y)| (x * x + y * y).sqrt())
            .collect();
        let angle = x
            .par_iter()
            .zip(y.par_iter())
            .map(|(x, y)| {
                let t = (y / x).atan();
                if t.is_nan() {
                    0.0
                } else {
                    t
                }
            })
            .collect();

        Self {
            width,
            height,
            x,
            y,
            radius,
            angle,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolve(&self, coordinate: Coordinate) -> &PixelBuffer {
        match coordinate {
            Coordinate::X => &self.x,
            Coordinate::Y => &self.y,
            Coordinate::Radius => &self.radius,
            Coordinate::Angle => &self.angle,
        }
    }

    /// Buffer filled with a scalar literal
    pub fn constant(&self, value: f64) -> PixelBuffer {
        vec![value; self.width * self.height]
    }
}

fn axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(count);
    let mut current = start;
    for _ in 0..count {
        values.push(current);
        current += step;
    }
    values
}
