use crate::{
    assets::decode::encode_png,
    foundation::core::Canvas,
    foundation::error::{BoothError, BoothResult},
};

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is kept to make this explicit at
/// API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Allocate a frame, cleared to `clear_rgba` or fully transparent.
    pub fn new(canvas: Canvas, clear_rgba: Option<[u8; 4]>) -> BoothResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(BoothError::render("frame dimensions must be > 0"));
        }
        let data = match clear_rgba {
            Some(px) => px.repeat(canvas.pixel_count()),
            None => vec![0u8; canvas.rgba_len()],
        };
        Ok(Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        })
    }

    /// Frame size.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Encode as a straight-alpha PNG.
    pub fn to_png(&self) -> BoothResult<Vec<u8>> {
        encode_png(self.width, self.height, &self.data)
    }
}

/// Backend-agnostic settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderSettings {
    /// If set, the destination is cleared to this RGBA8 color before drawing.
    pub clear_rgba: Option<[u8; 4]>,
}

impl RenderSettings {
    /// Opaque black background of the final edit render.
    pub fn opaque_black() -> Self {
        Self {
            clear_rgba: Some([0, 0, 0, 255]),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
