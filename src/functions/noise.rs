use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TABLE_SIZE: usize = 256;

/// Quintic falloff, 1 at the corner and 0 one cell away
fn drop(t: f64) -> f64 {
    let t = t.abs();
    1.0 - t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Seeded 2D gradient noise.
///
/// Gradients and the permutation table are drawn from a private generator,
/// so two instances built from the same seed produce identical fields.
#[derive(Debug, Clone)]
pub struct PerlinNoise {
    gradients: Vec<[f64; 2]>,
    permutation: Vec<usize>,
}

impl PerlinNoise {
    pub fn new(seed: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed.to_bits());

        let mut gradients = Vec::with_capacity(TABLE_SIZE);
        while gradients.len() < TABLE_SIZE {
            // Rejection-sample inside the unit disc, then project onto the circle
            let gx = rng.gen::<f64>() * 2.0 - 1.0;
            let gy = rng.gen::<f64>() * 2.0 - 1.0;
            let length = (gx * gx + gy * gy).sqrt();
            if length > 0.0 && length < 1.0 {
                gradients.push([gx / length, gy / length]);
            }
        }

        let mut permutation: Vec<usize> = (0..TABLE_SIZE).collect();
        permutation.shuffle(&mut rng);

        Self {
            gradients,
            permutation,
        }
    }

    /// Noise value at (x, y), clamped to [-1, 1]
    pub fn noise(&self, x: f64, y: f64) -> f64 {
        let cell_x = x.floor();
        let cell_y = y.floor();

        let mut sum = 0.0;
        for (di, dj) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let i = cell_x + di;
            let j = cell_y + dj;
            let u = x - i;
            let v = y - j;
            let gradient = self.gradient_at(i as i64, j as i64);
            sum += drop(u) * drop(v) * (gradient[0] * u + gradient[1] * v);
        }

        sum.clamp(-1.0, 1.0)
    }

    /// Corners past the end of the permutation table contribute nothing;
    /// negative columns wrap around it.
    fn gradient_at(&self, i: i64, j: i64) -> [f64; 2] {
        if i >= TABLE_SIZE as i64 {
            return [0.0, 0.0];
        }
        let size = TABLE_SIZE as i64;
        let first = self.permutation[i.rem_euclid(size) as usize] as i64;
        let index = self.permutation[(first + j).rem_euclid(size) as usize];
        self.gradients[index % self.gradients.len()]
    }
}
