//! Glucose → colour rendering.
//!
//! A five-segment piecewise-linear gradient over the named palette:
//!
//! ```text
//!   mg/dL   0 ──── 55 ────────── 152 ────────── 250 ──── 300 ────▶
//!   colour  RED    RED ──▶ GREEN  GREEN ──▶ BLUE  BLUE ──▶ PURPLE  PURPLE
//! ```
//!
//! Segments are half-open `[lo, hi)`; a value on a boundary belongs to the
//! segment that starts there (fraction 0).

pub mod color;

use core::fmt;

pub use color::Color;
use color::{BLUE, GREEN, PURPLE, RED};

/// Below this value the light is solid red.
pub const LOW_LIMIT: i32 = 55;
/// Green anchor (in-range centre).
pub const TARGET: i32 = 152;
/// Blue anchor.
pub const HIGH: i32 = 250;
/// At or above this value the light is solid purple.
pub const HIGH_LIMIT: i32 = 300;

/// One interpolating segment of the gradient.
struct Segment {
    lo: i32,
    hi: i32,
    from: Color,
    to: Color,
}

const GRADIENT: [Segment; 3] = [
    Segment { lo: LOW_LIMIT, hi: TARGET, from: RED, to: GREEN },
    Segment { lo: TARGET, hi: HIGH, from: GREEN, to: BLUE },
    Segment { lo: HIGH, hi: HIGH_LIMIT, from: BLUE, to: PURPLE },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// Negative readings carry no colour.
    InvalidReading(i32),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReading(v) => write!(f, "invalid glucose reading {}", v),
        }
    }
}

/// Map a glucose reading (mg/dL) to its display colour.
pub fn render(value: i32) -> Result<Color, RenderError> {
    if value < 0 {
        return Err(RenderError::InvalidReading(value));
    }
    if value < LOW_LIMIT {
        return Ok(RED);
    }
    for seg in &GRADIENT {
        if value < seg.hi {
            let fraction = (value - seg.lo) as f32 / (seg.hi - seg.lo) as f32;
            return Ok(seg.from.lerp(seg.to, fraction));
        }
    }
    Ok(PURPLE)
}
