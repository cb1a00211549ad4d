//! Hex color parsing and simple color math

use nom::{
    bytes::complete::{tag, take_while_m_n},
    combinator::{all_consuming, map_res},
    sequence::{preceded, tuple},
    IResult,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ColorParseError;

/// RGB color with channels in `0.0..=1.0` (scaled colors may exceed 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` literal
    pub fn from_u32(hex: u32) -> Self {
        Self::from_rgb8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse a `#RRGGBB` string
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        match all_consuming(hex_color)(input.trim()) {
            Ok((_, color)) => Ok(color),
            Err(_) => Err(ColorParseError(input.to_string())),
        }
    }

    /// Multiply every channel by `factor`. No clamping.
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Linear interpolation towards `other`
    pub fn lerp(self, other: Rgb, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Component-wise product, used to tint a texture by a material color
    pub fn tint(self, other: Rgb) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// CSS `rgba(...)` string for canvas fill/stroke styles
    pub fn to_css_rgba(self, alpha: f32) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("rgba({r}, {g}, {b}, {})", alpha.clamp(0.0, 1.0))
    }

    /// Relative luminance (Rec. 709 weights)
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

impl std::ops::Add for Rgb {
    type Output = Rgb;

    /// Channel-wise sum, as used by additive blending
    fn add(self, other: Rgb) -> Rgb {
        Rgb::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

/// Color plus opacity, as used by 2D canvas drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f32,
}

impl Rgba {
    pub const fn new(rgb: Rgb, alpha: f32) -> Self {
        Self { rgb, alpha }
    }

    pub fn opaque(rgb: Rgb) -> Self {
        Self::new(rgb, 1.0)
    }

    pub fn to_css(self) -> String {
        self.rgb.to_css_rgba(self.alpha)
    }
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |s| {
        u8::from_str_radix(s, 16)
    })(input)
}

fn hex_color(input: &str) -> IResult<&str, Rgb> {
    let (input, (r, g, b)) = preceded(tag("#"), tuple((hex_byte, hex_byte, hex_byte)))(input)?;
    Ok((input, Rgb::from_rgb8(r, g, b)))
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let c = Rgb::parse("#722F37").unwrap();
        assert_eq!(c.to_rgb8(), [0x72, 0x2f, 0x37]);
        assert_eq!(Rgb::parse("#ffffff").unwrap(), Rgb::WHITE);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["722F37", "#722F3", "#722F37FF", "#GG0000", ""] {
            assert!(Rgb::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_scale_does_not_clamp() {
        let c = Rgb::new(0.9, 0.5, 0.0).scale(1.2);
        assert!((c.r - 1.08).abs() < 1e-6);
        assert_eq!(c.clamped().r, 1.0);
    }

    #[test]
    fn test_from_u32_matches_parse() {
        assert_eq!(Rgb::from_u32(0xE8A317), Rgb::parse("#E8A317").unwrap());
    }

    #[test]
    fn test_css_output() {
        assert_eq!(Rgb::from_u32(0x722F37).to_css_rgba(0.1), "rgba(114, 47, 55, 0.1)");
    }
}
