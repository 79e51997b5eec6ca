use std::io::Cursor;

use anyhow::Context;

use crate::{
    assets::store::PreparedImage,
    foundation::error::{BoothError, BoothResult},
};

/// Decode an encoded raster (PNG, JPEG, ...) into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> BoothResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(PreparedImage::from_rgba_image(dyn_img.to_rgba8()))
}

/// Encode premultiplied RGBA8 pixels as PNG bytes.
pub fn encode_png(width: u32, height: u32, rgba8_premul: &[u8]) -> BoothResult<Vec<u8>> {
    if rgba8_premul.len() != (width as usize) * (height as usize) * 4 {
        return Err(BoothError::render("png encode expects width*height*4 bytes"));
    }
    let mut straight = rgba8_premul.to_vec();
    unpremultiply_rgba8_in_place(&mut straight);
    let img = image::RgbaImage::from_raw(width, height, straight)
        .ok_or_else(|| BoothError::render("png encode buffer size mismatch"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
