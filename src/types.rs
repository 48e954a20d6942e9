use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual prefix-expression encoding of an image program
pub type Genome = String;

/// Row-major per-pixel scalars, row 0 at the top
pub type PixelBuffer = Vec<f64>;

/// Position-derived fields over the fixed [-1,1]² domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coordinate {
    X,
    Y,
    Radius,
    Angle,
}

impl Coordinate {
    pub const ALL: [Coordinate; 4] = [
        Coordinate::X,
        Coordinate::Y,
        Coordinate::Radius,
        Coordinate::Angle,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Coordinate::X => "x",
            Coordinate::Y => "y",
            Coordinate::Radius => "r",
            Coordinate::Angle => "a",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "x" => Some(Coordinate::X),
            "y" => Some(Coordinate::Y),
            "r" => Some(Coordinate::Radius),
            "a" => Some(Coordinate::Angle),
            _ => None,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convolution filters the blur/edgeEnhance/emboss primitives delegate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Blur,
    EdgeEnhance,
    Emboss,
}
