use crate::{
    assets::store::PreparedImage,
    effects::composite::over,
    foundation::core::{Canvas, PixelRect},
    foundation::math::round_px,
};

/// Source region selected by cover-fit, in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

/// Crop-to-fill: keep the destination aspect ratio by trimming the longer source axis
/// symmetrically.
///
/// Returns `None` when either box is degenerate.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: i64, dst_h: i64) -> Option<CropRect> {
    if src_w == 0 || src_h == 0 || dst_w <= 0 || dst_h <= 0 {
        return None;
    }
    let target_r = dst_w as f64 / dst_h as f64;
    let src_r = f64::from(src_w) / f64::from(src_h);

    let (iw, ih) = (i64::from(src_w), i64::from(src_h));
    let crop = if src_r > target_r {
        let sw = round_px(ih as f64 * target_r).clamp(1, iw);
        CropRect {
            x: round_px((iw - sw) as f64 / 2.0) as u32,
            y: 0,
            w: sw as u32,
            h: src_h,
        }
    } else {
        let sh = round_px(iw as f64 / target_r).clamp(1, ih);
        CropRect {
            x: 0,
            y: round_px((ih - sh) as f64 / 2.0) as u32,
            w: src_w,
            h: sh as u32,
        }
    };
    Some(crop)
}

/// Mutable premultiplied RGBA8 raster being drawn into.
pub struct Surface<'a> {
    /// Surface size.
    pub canvas: Canvas,
    /// Row-major premultiplied RGBA8 pixels.
    pub data: &'a mut [u8],
}

/// Scale `crop` of `src` into `dest` on the surface with bilinear sampling and source-over.
///
/// `dest` may extend past the surface; it is clipped. `mirror_x` flips the image horizontally
/// within `dest`.
pub fn draw_image_rect(
    surface: &mut Surface<'_>,
    src: &PreparedImage,
    crop: CropRect,
    dest: PixelRect,
    mirror_x: bool,
) {
    if dest.is_empty() || crop.w == 0 || crop.h == 0 {
        return;
    }
    let (cw, ch) = (
        i64::from(surface.canvas.width),
        i64::from(surface.canvas.height),
    );
    let x0 = dest.x.clamp(0, cw);
    let x1 = (dest.x + dest.w).clamp(0, cw);
    let y0 = dest.y.clamp(0, ch);
    let y1 = (dest.y + dest.h).clamp(0, ch);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let scale_x = f64::from(crop.w) / dest.w as f64;
    let scale_y = f64::from(crop.h) / dest.h as f64;
    let row_stride = surface.canvas.width as usize * 4;

    for py in y0..y1 {
        let v = f64::from(crop.y) + ((py - dest.y) as f64 + 0.5) * scale_y - 0.5;
        let row = py as usize * row_stride;
        for px in x0..x1 {
            let local = if mirror_x {
                dest.w - 1 - (px - dest.x)
            } else {
                px - dest.x
            };
            let u = f64::from(crop.x) + (local as f64 + 0.5) * scale_x - 0.5;
            let sample = sample_bilinear(src, crop, u, v);
            let i = row + px as usize * 4;
            let d = [
                surface.data[i],
                surface.data[i + 1],
                surface.data[i + 2],
                surface.data[i + 3],
            ];
            surface.data[i..i + 4].copy_from_slice(&over(d, sample, 1.0));
        }
    }
}

/// Cover-fit `src` into `dest`, returning the crop that was used.
pub fn draw_image_cover(
    surface: &mut Surface<'_>,
    src: &PreparedImage,
    dest: PixelRect,
) -> Option<CropRect> {
    let crop = cover_crop(src.width, src.height, dest.w, dest.h)?;
    draw_image_rect(surface, src, crop, dest, false);
    Some(crop)
}

/// Bilinear sample in premultiplied space, clamped to the crop window.
fn sample_bilinear(src: &PreparedImage, crop: CropRect, u: f64, v: f64) -> [u8; 4] {
    let min_x = f64::from(crop.x);
    let max_x = f64::from(crop.x + crop.w - 1);
    let min_y = f64::from(crop.y);
    let max_y = f64::from(crop.y + crop.h - 1);
    let u = u.clamp(min_x, max_x);
    let v = v.clamp(min_y, max_y);

    let x0 = u.floor();
    let y0 = v.floor();
    let fx = u - x0;
    let fy = v - y0;
    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(crop.x + crop.w - 1);
    let y1 = (y0 + 1).min(crop.y + crop.h - 1);

    let data = src.rgba8_premul.as_slice();
    let stride = src.width as usize * 4;
    let at = |x: u32, y: u32| y as usize * stride + x as usize * 4;
    let (p00, p10, p01, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(data[p00 + c]) * (1.0 - fx) + f64::from(data[p10 + c]) * fx;
        let bottom = f64::from(data[p01 + c]) * (1.0 - fx) + f64::from(data[p11 + c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/cover.rs"]
mod tests;
