use crate::assets::color::HexColor;
use crate::foundation::error::{BoothError, BoothResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8};

pub type PremulRgba8 = [u8; 4];

/// Source-over of one premultiplied pixel onto another.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = u16::from(unit_to_u8(opacity));
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> BoothResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BoothError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Flat color fill composited "source-atop" onto a premultiplied layer.
///
/// Destination alpha is preserved, so fully transparent pixels stay untouched and only the
/// layer's existing artwork takes the color.
pub fn tint_atop_in_place(layer: &mut [u8], color: HexColor, opacity: f32) -> BoothResult<()> {
    if !layer.len().is_multiple_of(4) {
        return Err(BoothError::render("tint expects an rgba8 buffer"));
    }
    let a = u16::from(unit_to_u8(opacity));
    if a == 0 {
        return Ok(());
    }
    let inv = 255 - a;
    let src = [
        mul_div255(u16::from(color.r), a),
        mul_div255(u16::from(color.g), a),
        mul_div255(u16::from(color.b), a),
    ];

    for px in layer.chunks_exact_mut(4) {
        let da = px[3];
        if da == 0 {
            continue;
        }
        for i in 0..3 {
            let sc = mul_div255(u16::from(src[i]), u16::from(da));
            let dc = mul_div255(u16::from(px[i]), inv);
            px[i] = add_sat_u8(sc, dc).min(da);
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
