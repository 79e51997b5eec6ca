use crate::foundation::error::{BoothError, BoothResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Print-ready portrait target.
    pub const PORTRAIT: Canvas = Canvas {
        width: 2400,
        height: 3600,
    };

    /// Print-ready landscape target.
    pub const LANDSCAPE: Canvas = Canvas {
        width: 3600,
        height: 2400,
    };

    /// Create a validated, non-empty canvas.
    pub fn new(width: u32, height: u32) -> BoothResult<Self> {
        if width == 0 || height == 0 {
            return Err(BoothError::validation("canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Canvas for a target orientation.
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => Self::PORTRAIT,
            Orientation::Landscape => Self::LANDSCAPE,
        }
    }

    /// Number of pixels covered by the canvas.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Byte length of a tightly packed RGBA8 buffer for this canvas.
    pub fn rgba_len(self) -> usize {
        self.pixel_count().saturating_mul(4)
    }
}

/// Target print orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Taller than wide.
    Portrait,
    /// Wider than tall.
    Landscape,
}

/// Axis-aligned integer rectangle in some pixel space.
///
/// `x`/`y` may be negative after projection; drawing code clips to the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels.
    pub w: i64,
    /// Height in pixels.
    pub h: i64,
}

impl PixelRect {
    /// Build a rectangle from its origin and size.
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self { x, y, w, h }
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
