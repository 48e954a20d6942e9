pub mod resolver;
pub mod evaluator;

pub use resolver::CoordinateGrid;
pub use evaluator::Evaluator;
