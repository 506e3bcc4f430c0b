use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 8-bit RGB color. Serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `rrggbb` or the `rgb(r, g, b)` form browsers report.
    pub fn parse(input: &str) -> Result<Self, ModelError> {
        let trimmed = input.trim();
        let invalid = || ModelError::InvalidColor(input.to_owned());

        if let Some(body) = trimmed.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
            let channels = body
                .split(',')
                .map(|part| part.trim().parse::<u8>().map_err(|_| invalid()))
                .collect::<Result<Vec<_>, _>>()?;
            return match channels.as_slice() {
                [r, g, b] => Ok(Self::new(*r, *g, *b)),
                _ => Err(invalid()),
            };
        }

        let hex = trimmed.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channels scaled to `0.0..=1.0`, the form PDF color operators take.
    pub fn to_normalized(self) -> (f32, f32, f32) {
        (self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        assert_eq!(Rgb::parse("#ff8000").expect("valid"), Rgb::new(255, 128, 0));
        assert_eq!(Rgb::parse("00FF00").expect("valid"), Rgb::new(0, 255, 0));
    }

    #[test]
    fn parses_css_rgb_function() {
        assert_eq!(Rgb::parse("rgb(12, 34, 56)").expect("valid"), Rgb::new(12, 34, 56));
        assert!(Rgb::parse("rgb(1, 2)").is_err());
        assert!(Rgb::parse("rgb(1, 2, 300)").is_err());
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(Rgb::parse("#fff").is_err());
        assert!(Rgb::parse("#gg0000").is_err());
        assert!(Rgb::parse("").is_err());
    }

    #[test]
    fn hex_formatting_is_lowercase_and_padded() {
        assert_eq!(Rgb::new(1, 2, 255).to_hex(), "#0102ff");
        assert_eq!(Rgb::BLACK.to_string(), "#000000");
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb::RED).expect("serialize");
        assert_eq!(json, "\"#ff0000\"");
        let back: Rgb = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Rgb::RED);
    }
}
