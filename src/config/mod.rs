pub mod traits;
pub mod evolution;
pub mod render;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::{EvolutionConfig, MutationRates};
pub use render::RenderConfig;
