use serde::{Deserialize, Serialize};

use super::traits::ColorMap;

/// Piecewise-linear gradient between evenly spaced colour stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub stops: Vec<[u8; 3]>,
}

impl Gradient {
    pub fn new(stops: Vec<[u8; 3]>) -> Self {
        Self { stops }
    }

    /// Dark purple through red and orange to pale yellow
    pub fn sunrise() -> Self {
        Self::new(vec![
            [24, 8, 48],
            [140, 20, 60],
            [230, 80, 30],
            [250, 170, 40],
            [255, 240, 190],
        ])
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::sunrise()
    }
}

impl ColorMap for Gradient {
    fn color_of(&self, value: f64) -> [u8; 3] {
        match self.stops.len() {
            0 => return [0, 0, 0],
            1 => return self.stops[0],
            _ => {}
        }
        if value.is_nan() {
            return self.stops[0];
        }

        let segments = (self.stops.len() - 1) as f64;
        let position = value.clamp(0.0, 1.0) * segments;
        let index = (position.floor() as usize).min(self.stops.len() - 2);
        let t = position - index as f64;

        let from = self.stops[index];
        let to = self.stops[index + 1];
        let mut rgb = [0u8; 3];
        for channel in 0..3 {
            let c = from[channel] as f64 + (to[channel] as f64 - from[channel] as f64) * t;
            rgb[channel] = c.round().clamp(0.0, 255.0) as u8;
        }
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_hit_first_and_last_stop() {
        let g = Gradient::new(vec![[0, 0, 0], [255, 255, 255]]);
        assert_eq!(g.color_of(0.0), [0, 0, 0]);
        assert_eq!(g.color_of(1.0), [255, 255, 255]);
    }

    #[test]
    fn test_midpoint_interpolates() {
        let g = Gradient::new(vec![[0, 0, 0], [200, 100, 50]]);
        assert_eq!(g.color_of(0.5), [100, 50, 25]);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let g = Gradient::sunrise();
        assert_eq!(g.color_of(-3.0), g.color_of(0.0));
        assert_eq!(g.color_of(7.0), g.color_of(1.0));
        assert_eq!(g.color_of(f64::NAN), g.stops[0]);
    }
}
