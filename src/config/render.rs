use super::traits::ConfigSection;
use crate::error::PicEvolveError;
use crate::functions::color::Gradient;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Reseed the caller's random source from the clock after evaluating
    /// a genome that uses `noise`
    pub reseed_noise_from_clock: bool,
    pub gradient: Gradient,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            reseed_noise_from_clock: false,
            gradient: Gradient::default(),
        }
    }
}

impl ConfigSection for RenderConfig {
    fn section_name() -> &'static str {
        "render"
    }

    fn validate(&self) -> Result<(), PicEvolveError> {
        if self.width == 0 || self.height == 0 {
            return Err(PicEvolveError::Configuration(
                "Image dimensions must be positive".to_string(),
            ));
        }
        if self.gradient.stops.is_empty() {
            return Err(PicEvolveError::Configuration(
                "Gradient needs at least one colour stop".to_string(),
            ));
        }
        Ok(())
    }
}
