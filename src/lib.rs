pub mod config;
pub mod engines;
pub mod error;
pub mod functions;
pub mod types;

pub use engines::evaluation::Evaluator;
pub use engines::generation::{ExprGenerator, ExprTree, MutationEngine, PicEvolver};
pub use error::{PicEvolveError, Result};
pub use functions::{Function, FunctionRegistry};
pub use types::{Coordinate, Genome, PixelBuffer};
