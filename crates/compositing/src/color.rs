//! Hex color parsing and small color helpers.
//!
//! Colors are straight-alpha RGBA in perceptual (sRGB) space, `[f32; 4]`
//! with every component in 0..=1.

use thiserror::Error;
use tracing::warn;

/// Straight-alpha sRGB color
pub type Rgba = [f32; 4];

pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
pub const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];
pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];

/// Every channel at or above this counts as near-white.
const NEAR_WHITE_THRESHOLD: f32 = 0.9;

#[derive(Debug, Error, PartialEq)]
pub enum ColorError {
    #[error("Color must start with '#': {0:?}")]
    MissingHash(String),
    #[error("Invalid hex color: {0:?}")]
    InvalidHex(String),
}

/// Build a color from 8-bit channels.
pub const fn rgb8(r: u8, g: u8, b: u8) -> Rgba {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex(input: &str) -> Result<Rgba, ColorError> {
    let trimmed = input.trim();
    let Some(hex) = trimmed.strip_prefix('#') else {
        return Err(ColorError::MissingHash(trimmed.to_string()));
    };
    if !hex.is_ascii() {
        return Err(ColorError::InvalidHex(trimmed.to_string()));
    }

    let channel = |s: &str| {
        u8::from_str_radix(s, 16).map_err(|_| ColorError::InvalidHex(trimmed.to_string()))
    };

    match hex.len() {
        3 => {
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for (i, c) in hex.chars().enumerate() {
                let doubled: String = [c, c].iter().collect();
                out[i] = channel(&doubled)? as f32 / 255.0;
            }
            Ok(out)
        }
        6 | 8 => {
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for i in 0..hex.len() / 2 {
                out[i] = channel(&hex[i * 2..i * 2 + 2])? as f32 / 255.0;
            }
            Ok(out)
        }
        _ => Err(ColorError::InvalidHex(trimmed.to_string())),
    }
}

/// Parse a color, logging and returning `fallback` when it is malformed.
pub fn parse_hex_or(input: &str, fallback: Rgba) -> Rgba {
    parse_hex(input).unwrap_or_else(|err| {
        warn!("{err}, using fallback");
        fallback
    })
}

/// Format as `#rrggbb` (alpha dropped).
pub fn to_hex(color: Rgba) -> String {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", c(color[0]), c(color[1]), c(color[2]))
}

pub fn is_near_white(color: Rgba) -> bool {
    color[..3].iter().all(|&c| c >= NEAR_WHITE_THRESHOLD)
}

pub fn with_alpha(color: Rgba, alpha: f32) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

/// Linear interpolation between two colors.
pub fn mix(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Quantize to RGBA8.
pub fn to_rgba8(color: Rgba) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Rgba, b: Rgba) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn test_parse_long_and_short_forms() {
        assert!(approx(parse_hex("#FFD700").unwrap(), rgb8(255, 215, 0)));
        assert!(approx(parse_hex(" #fff ").unwrap(), WHITE));
        let with_alpha = parse_hex("#00000080").unwrap();
        assert!((with_alpha[3] - 128.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            parse_hex("FFD700"),
            Err(ColorError::MissingHash("FFD700".to_string()))
        );
        assert!(parse_hex("#GGHHII").is_err());
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn test_parse_fallback() {
        assert_eq!(parse_hex_or("nope", BLACK), BLACK);
    }

    #[test]
    fn test_near_white() {
        assert!(is_near_white(parse_hex("#F0F0F0").unwrap()));
        assert!(!is_near_white(parse_hex("#FFD700").unwrap()));
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(to_hex(parse_hex("#cc0000").unwrap()), "#cc0000");
    }
}
