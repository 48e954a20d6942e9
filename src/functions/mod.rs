pub mod registry;
pub mod traits;
pub mod noise;
pub mod color;
pub mod filters;
pub mod primitives;

pub use registry::{Function, FunctionRegistry};
pub use traits::{ColorMap, ConvolutionFilter};
pub use color::Gradient;
pub use filters::ImageFilters;
pub use primitives::ImageLibrary;
