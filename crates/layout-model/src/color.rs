//! RGBA color value with hex-string wire format.
//!
//! Layouts author colors as CSS-style hex strings (`#rgb`, `#rrggbb`,
//! `#rrggbbaa`); the compositor consumes them as premultipliable RGBA bytes.

use serde::{Deserialize, Serialize};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Neutral placeholder fill for unresolved photo slots.
    pub const PLACEHOLDER: Color = Color::rgb(0xe2, 0xe4, 0xe8);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS-style hex color string.
    ///
    /// Accepts `#rgb`, `#rrggbb`, and `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(s: &str) -> Result<Self, ColorParseError> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let parse =
            |chunk: &str| u8::from_str_radix(chunk, 16).map_err(|_| ColorParseError(s.to_string()));

        match hex.len() {
            3 => {
                let r = parse(&hex[0..1])?;
                let g = parse(&hex[1..2])?;
                let b = parse(&hex[2..3])?;
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Ok(Self::rgb(
                parse(&hex[0..2])?,
                parse(&hex[2..4])?,
                parse(&hex[4..6])?,
            )),
            8 => Ok(Self::rgba(
                parse(&hex[0..2])?,
                parse(&hex[2..4])?,
                parse(&hex[4..6])?,
                parse(&hex[6..8])?,
            )),
            _ => Err(ColorParseError(s.to_string())),
        }
    }

    /// Format as `#rrggbb` or `#rrggbbaa` when alpha is not opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// As an `image` crate pixel.
    pub fn to_pixel(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Failed to parse a hex color string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex color: {0}")]
pub struct ColorParseError(pub String);

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}
