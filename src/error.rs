use thiserror::Error;

#[derive(Error, Debug)]
pub enum PicEvolveError {
    #[error("Malformed genome: {0}")]
    MalformedGenome(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Arity mismatch for {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PicEvolveError {
    /// A malformed genome may be fixed by drawing a different random choice;
    /// everything else needs a different input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PicEvolveError::MalformedGenome(_))
    }
}

pub type Result<T> = std::result::Result<T, PicEvolveError>;
