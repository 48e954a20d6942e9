use chrono::Utc;
use image::RgbImage;
use log::{debug, info};
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;

use super::resolver::CoordinateGrid;
use crate::config::RenderConfig;
use crate::engines::generation::ast::{ExprTree, NodeId, NodeValue};
use crate::error::Result;
use crate::functions::filters::ImageFilters;
use crate::functions::primitives::{normalize, ImageLibrary};
use crate::functions::registry::{Function, FunctionRegistry};
use crate::functions::traits::{ColorMap, ConvolutionFilter};
use crate::types::PixelBuffer;

/// Turns expression trees into normalized pixel buffers at a fixed size
#[derive(Debug, Clone)]
pub struct Evaluator {
    library: ImageLibrary,
    grid: CoordinateGrid,
    reseed_noise_from_clock: bool,
}

impl Evaluator {
    pub fn new(
        width: usize,
        height: usize,
        color_map: Arc<dyn ColorMap>,
        filter: Arc<dyn ConvolutionFilter>,
    ) -> Self {
        Self {
            library: ImageLibrary::new(width, height, color_map, filter),
            grid: CoordinateGrid::new(width, height),
            reseed_noise_from_clock: false,
        }
    }

    /// Gradient colour map and the built-in filters from a render section
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            Arc::new(config.gradient.clone()),
            Arc::new(ImageFilters),
        )
        .with_noise_reseeding(config.reseed_noise_from_clock)
    }

    pub fn with_noise_reseeding(mut self, enabled: bool) -> Self {
        self.reseed_noise_from_clock = enabled;
        self
    }

    pub fn width(&self) -> usize {
        self.library.width()
    }

    pub fn height(&self) -> usize {
        self.library.height()
    }

    /// Evaluate bottom-up. A bare leaf at the root is normalized like any
    /// operator output so every result lies in [0, 1].
    pub fn evaluate(&self, tree: &ExprTree) -> Result<PixelBuffer> {
        let root = tree.root();
        let buffer = self.evaluate_node(tree, root)?;
        if tree.node(root).is_function() {
            Ok(buffer)
        } else {
            Ok(normalize(buffer))
        }
    }

    pub fn evaluate_genome(&self, genome: &str, registry: &FunctionRegistry) -> Result<PixelBuffer> {
        let tree = ExprTree::parse(genome, registry)?;
        self.evaluate(&tree)
    }

    /// Evaluate, then reseed `rng` from the wall clock if reseeding is
    /// enabled and the tree uses `noise`
    pub fn evaluate_reseeding<R: SeedableRng>(&self, tree: &ExprTree, rng: &mut R) -> Result<PixelBuffer> {
        let buffer = self.evaluate(tree)?;
        self.reseed_after(tree, rng);
        Ok(buffer)
    }

    /// Reseed `rng` from the wall clock when reseeding is enabled and `tree`
    /// uses `noise`. Returns whether it did.
    pub fn reseed_after<R: SeedableRng>(&self, tree: &ExprTree, rng: &mut R) -> bool {
        if !self.reseed_noise_from_clock || !uses_noise(tree) {
            return false;
        }
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        *rng = R::seed_from_u64(nanos as u64);
        debug!("Reseeded random source from clock after noise");
        true
    }

    /// Map a final buffer through the colour map
    pub fn rasterize(&self, buffer: &PixelBuffer) -> RgbImage {
        self.library.rasterize(buffer)
    }

    /// Rasterize `buffer` and write it as an image file, format chosen by
    /// the path's extension
    pub fn save(&self, buffer: &PixelBuffer, path: &Path) -> Result<()> {
        self.rasterize(buffer).save(path)?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    fn evaluate_node(&self, tree: &ExprTree, id: NodeId) -> Result<PixelBuffer> {
        match tree.value(id) {
            NodeValue::Scalar(v) => Ok(self.grid.constant(v)),
            NodeValue::Variable(c) => Ok(self.grid.resolve(c).clone()),
            NodeValue::Function(function) => {
                let args = tree
                    .node(id)
                    .children()
                    .map(|child| self.evaluate_node(tree, child))
                    .collect::<Result<Vec<_>>>()?;
                self.library.apply(function, &args)
            }
        }
    }
}

fn uses_noise(tree: &ExprTree) -> bool {
    tree.preorder()
        .into_iter()
        .any(|id| tree.value(id) == NodeValue::Function(Function::Noise))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::color::Gradient;
    use rand::rngs::StdRng;
    use rand::Rng;

    fn evaluator(width: usize, height: usize) -> Evaluator {
        Evaluator::new(width, height, Arc::new(Gradient::default()), Arc::new(ImageFilters))
    }

    #[test]
    fn test_sine_of_x() {
        let registry = FunctionRegistry::new();
        let out = evaluator(4, 4).evaluate_genome("(sine x)", &registry).unwrap();
        let raw: Vec<f64> = [-1.0f64, -0.5, 0.0, 0.5].iter().map(|x| x.sin()).collect();
        let (lo, hi) = (raw[0], raw[3]);
        for row in 0..4 {
            for col in 0..4 {
                let expected = (raw[col] - lo) / (hi - lo);
                assert!((out[row * 4 + col] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_leaf_root_is_normalized() {
        let registry = FunctionRegistry::new();
        let ev = evaluator(3, 3);
        assert_eq!(ev.evaluate_genome("0.7", &registry).unwrap(), vec![0.0; 9]);
        let x = ev.evaluate_genome("x", &registry).unwrap();
        assert_eq!(x[0], 0.0);
        assert_eq!(x[2], 1.0);
    }

    #[test]
    fn test_malformed_genome_surfaces() {
        let registry = FunctionRegistry::new();
        assert!(evaluator(2, 2).evaluate_genome("(sine x", &registry).is_err());
        assert!(evaluator(2, 2).evaluate_genome("(warp x)", &registry).is_err());
    }

    #[test]
    fn test_reseeding_only_when_enabled_and_noise_used() {
        let registry = FunctionRegistry::new();
        let noisy = ExprTree::parse("(noise 0.3 0.5)", &registry).unwrap();
        let plain = ExprTree::parse("(sine x)", &registry).unwrap();

        let ev = evaluator(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        ev.evaluate_reseeding(&noisy, &mut rng).unwrap();
        assert_eq!(rng.gen::<u64>(), StdRng::seed_from_u64(1).gen::<u64>());

        let ev = ev.with_noise_reseeding(true);
        let mut rng = StdRng::seed_from_u64(1);
        ev.evaluate_reseeding(&plain, &mut rng).unwrap();
        assert_eq!(rng.gen::<u64>(), StdRng::seed_from_u64(1).gen::<u64>());

        let mut rng = StdRng::seed_from_u64(1);
        ev.evaluate_reseeding(&noisy, &mut rng).unwrap();
        assert_ne!(rng.gen::<u64>(), StdRng::seed_from_u64(1).gen::<u64>());
    }

    #[test]
    fn test_save_reports_image_errors() {
        let ev = evaluator(2, 2);
        let err = ev
            .save(&vec![0.5; 4], Path::new("/definitely/not/here/out.png"))
            .unwrap_err();
        assert!(matches!(err, crate::error::PicEvolveError::Image(_)));
    }

    #[test]
    fn test_save_writes_png() {
        let ev = evaluator(3, 2);
        let path = std::env::temp_dir().join(format!("picevolve-save-{}.png", std::process::id()));
        ev.save(&vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0], &path).unwrap();
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (3, 2));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_rasterize_matches_size() {
        let ev = evaluator(5, 3);
        let image = ev.rasterize(&vec![0.5; 15]);
        assert_eq!(image.dimensions(), (5, 3));
    }
}
