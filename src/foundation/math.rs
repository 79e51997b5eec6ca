pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Round a non-negative pixel measure to the nearest integer (half rounds up).
pub(crate) fn round_px(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Map an opacity fraction onto the 0..=255 scale.
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    ((v.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
