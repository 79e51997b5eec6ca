use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque sRGB color kept in canonical `#RRGGBB` form.
///
/// Parsing never fails: anything that is not a 3- or 6-digit hex color collapses to black, the
/// same way the color inputs of the editor behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HexColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl HexColor {
    /// Pure black.
    pub const BLACK: HexColor = HexColor { r: 0, g: 0, b: 0 };
    /// Pure white.
    pub const WHITE: HexColor = HexColor {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Build from channel values.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lenient parse: trims, tolerates a missing `#`, expands `#RGB`, falls back to black.
    pub fn parse_lenient(s: &str) -> Self {
        normalize_hex(s)
            .and_then(|norm| parse_six(&norm[1..]))
            .unwrap_or(Self::BLACK)
    }

    /// Canonical upper-case `#RRGGBB` string.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HexColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&s))
    }
}

/// Normalize user-entered hex into `#RRGGBB`, or `None` when it is not a hex color.
pub fn normalize_hex(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let digits = s.strip_prefix('#').unwrap_or(s).to_ascii_uppercase();
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        3 => {
            let mut out = String::with_capacity(7);
            out.push('#');
            for c in digits.chars() {
                out.push(c);
                out.push(c);
            }
            Some(out)
        }
        6 => Some(format!("#{digits}")),
        _ => None,
    }
}

fn parse_six(digits: &str) -> Option<HexColor> {
    let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(HexColor::rgb(byte(0)?, byte(2)?, byte(4)?))
}
