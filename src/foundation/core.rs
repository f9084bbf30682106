use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{DashflowError, DashflowResult};

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex(s: &str) -> DashflowResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(DashflowError::validation(format!("invalid hex color '{s}'")));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| DashflowError::validation(format!("invalid hex color '{s}'")))
        };
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| DashflowError::validation(format!("invalid hex color '{s}'")))
        };

        match hex.len() {
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(DashflowError::validation(format!(
                "hex color '{s}' must have 3, 6 or 8 digits"
            ))),
        }
    }

    /// Lowercase `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// The same color with alpha forced to 255.
    pub fn opaque(self) -> Self {
        Self { a: 255, ..self }
    }

    pub fn to_image_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    pub fn to_skia(self) -> resvg::tiny_skia::Color {
        resvg::tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Color {
    type Err = DashflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => Self::parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "color array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running generation.
///
/// Checked between frames and around encoder invocation; never interrupts a frame mid-raster.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> DashflowResult<()> {
        if self.is_cancelled() {
            return Err(DashflowError::Cancelled);
        }
        Ok(())
    }
}

/// Compact decimal for SVG attributes: at most 4 fractional digits, no trailing zeros, no `-0`.
pub(crate) fn fmt_num(v: f64) -> String {
    let v = if v.abs() < 5e-5 { 0.0 } else { v };
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
