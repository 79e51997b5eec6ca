use crate::{
    assets::store::PreparedImage,
    effects::cover::{Surface, cover_crop, draw_image_rect},
    foundation::core::{Canvas, PixelRect},
    foundation::error::{BoothError, BoothResult},
};

/// Capture preferences baked into every photo before it reaches the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureOpts {
    /// Flip horizontally (selfie view).
    pub mirror: bool,
    /// Convert to grayscale.
    pub monochrome: bool,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            mirror: true,
            monochrome: false,
        }
    }
}

/// Cover-fit `src` onto an opaque black `target` canvas, applying the capture preferences.
///
/// Camera frames and uploaded files both go through this, so every photo in a flow has the
/// target size and the same mirroring and color treatment.
#[tracing::instrument(skip(src), fields(src_w = src.width, src_h = src.height))]
pub fn normalize_photo(
    src: &PreparedImage,
    target: Canvas,
    opts: CaptureOpts,
) -> BoothResult<PreparedImage> {
    let dest = PixelRect::new(0, 0, i64::from(target.width), i64::from(target.height));
    let crop = cover_crop(src.width, src.height, dest.w, dest.h)
        .ok_or_else(|| BoothError::validation("photo and target must be non-empty"))?;

    let mut data = [0u8, 0, 0, 255].repeat(target.pixel_count());
    draw_image_rect(
        &mut Surface {
            canvas: target,
            data: &mut data,
        },
        src,
        crop,
        dest,
        opts.mirror,
    );
    if opts.monochrome {
        grayscale_in_place(&mut data);
    }
    PreparedImage::from_premul(target.width, target.height, data)
}

/// Rec. 709 luma, applied to opaque pixels.
fn grayscale_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let y = 0.2126 * f32::from(px[0]) + 0.7152 * f32::from(px[1]) + 0.0722 * f32::from(px[2]);
        let y = y.round().clamp(0.0, 255.0) as u8;
        px[0] = y;
        px[1] = y;
        px[2] = y;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/capture.rs"]
mod tests;
