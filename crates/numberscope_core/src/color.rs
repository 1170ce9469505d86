use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

lazy_static! {
    static ref NAMED_COLORS: HashMap<&'static str, Color> = {
        let mut m = HashMap::new();
        m.insert("black", Color::rgb(0, 0, 0));
        m.insert("white", Color::rgb(255, 255, 255));
        m.insert("red", Color::rgb(255, 0, 0));
        m.insert("green", Color::rgb(0, 128, 0));
        m.insert("lime", Color::rgb(0, 255, 0));
        m.insert("blue", Color::rgb(0, 0, 255));
        m.insert("yellow", Color::rgb(255, 255, 0));
        m.insert("cyan", Color::rgb(0, 255, 255));
        m.insert("magenta", Color::rgb(255, 0, 255));
        m.insert("orange", Color::rgb(255, 165, 0));
        m.insert("purple", Color::rgb(128, 0, 128));
        m.insert("pink", Color::rgb(255, 192, 203));
        m.insert("brown", Color::rgb(165, 42, 42));
        m.insert("gray", Color::rgb(128, 128, 128));
        m.insert("grey", Color::rgb(128, 128, 128));
        m.insert("navy", Color::rgb(0, 0, 128));
        m.insert("teal", Color::rgb(0, 128, 128));
        m.insert("olive", Color::rgb(128, 128, 0));
        m.insert("maroon", Color::rgb(128, 0, 0));
        m.insert("silver", Color::rgb(192, 192, 192));
        m
    };
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Looks up a CSS-style color name.
    pub fn named(name: &str) -> Option<Color> {
        NAMED_COLORS.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// Iterates the color name table, for formula symbol lookup.
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMED_COLORS.keys().copied()
    }

    /// Parses `#RGB`, `#RRGGBB`, `#RRGGBBAA` or a color name.
    pub fn parse(text: &str) -> Option<Color> {
        let text = text.trim();
        let Some(hex) = text.strip_prefix('#') else {
            return Self::named(text);
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
                Some(Color::rgb(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_argb(&self) -> u32 {
        u32::from_be_bytes([self.a, self.r, self.g, self.b])
    }

    pub fn from_argb(packed: u32) -> Self {
        let [a, r, g, b] = packed.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Opaque grey from black (0) to white (1).
    pub fn grey(level: f64) -> Self {
        let l = unit_to_byte(level);
        Color::rgb(l, l, l)
    }

    /// Fully saturated color of the given hue, in degrees.
    pub fn rainbow(hue: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Color::rgb(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: unit_to_byte(alpha),
            ..self
        }
    }

    /// Interprets a numeric formula result as a color.
    ///
    /// Zero (or false) and NaN mean "draw nothing". Magnitudes up to 1 are a
    /// grey level, up to `0xFFFFFF` an opaque `RRGGBB`, up to `0xFFFFFFFF` an
    /// `AARRGGBB` value; anything larger is white.
    pub fn from_formula_value(value: f64) -> Option<Color> {
        if value.is_nan() || value == 0.0 {
            return None;
        }
        let magnitude = value.abs();
        if magnitude <= 1.0 {
            return Some(Color::grey(magnitude));
        }
        let packed = magnitude.round();
        if packed <= f64::from(0xFF_FFFFu32) {
            let [_, r, g, b] = (packed as u32).to_be_bytes();
            Some(Color::rgb(r, g, b))
        } else if packed <= f64::from(u32::MAX) {
            Some(Color::from_argb(packed as u32))
        } else {
            Some(Color::WHITE)
        }
    }

    /// Composites `top` over `self`.
    pub fn overlay(self, top: Color) -> Color {
        let ta = f64::from(top.a) / 255.0;
        let ba = f64::from(self.a) / 255.0;
        let alpha = ta + ba * (1.0 - ta);
        if alpha <= 0.0 {
            return Color::TRANSPARENT;
        }
        let mix = |t: u8, b: u8| {
            let value = (f64::from(t) * ta + f64::from(b) * ba * (1.0 - ta)) / alpha;
            value.round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: mix(top.r, self.r),
            g: mix(top.g, self.g),
            b: mix(top.b, self.b),
            a: unit_to_byte(alpha),
        }
    }

    /// WCAG relative luminance.
    pub fn luminance(&self) -> f64 {
        let linear = |c: u8| {
            let c = f64::from(c) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// WCAG contrast ratio between two colors, at least 1.
    pub fn contrast(&self, other: &Color) -> f64 {
        let (a, b) = (self.luminance(), other.luminance());
        (a.max(b) + 0.05) / (a.min(b) + 0.05)
    }

    /// Black or white, whichever reads better on top of `self`.
    pub fn contrasting_text(&self) -> Color {
        if self.contrast(&Color::WHITE) > self.contrast(&Color::BLACK) {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }
}

fn unit_to_byte(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("invalid color {value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parse_and_format() {
        assert_eq!(Color::parse("#ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#F00"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#11223380"), Some(Color::rgba(0x11, 0x22, 0x33, 0x80)));
        assert_eq!(Color::parse("red"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#gg0000"), None);
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
        assert_eq!(Color::rgb(0xc9, 0x87, 0x87).to_hex(), "#c98787");
    }

    #[test]
    fn formula_values() {
        assert_eq!(Color::from_formula_value(0.0), None);
        assert_eq!(Color::from_formula_value(f64::NAN), None);
        assert_eq!(Color::from_formula_value(1.0), Some(Color::WHITE));
        assert_eq!(Color::from_formula_value(0.5), Some(Color::rgb(128, 128, 128)));
        assert_eq!(
            Color::from_formula_value(f64::from(0xFF0000u32)),
            Some(Color::rgb(255, 0, 0))
        );
        assert_eq!(
            Color::from_formula_value(f64::from(0xFF000000u32)),
            Some(Color::BLACK)
        );
        assert_eq!(
            Color::from_formula_value(f64::from(0x8000FF00u32)),
            Some(Color::rgba(0, 255, 0, 0x80))
        );
        assert_eq!(Color::from_formula_value(1e12), Some(Color::WHITE));
    }

    #[test]
    fn overlay_composites() {
        let base = Color::rgb(0, 0, 255);
        assert_eq!(base.overlay(Color::rgb(255, 0, 0)), Color::rgb(255, 0, 0));
        assert_eq!(base.overlay(Color::TRANSPARENT), base);
        let half = base.overlay(Color::rgba(255, 0, 0, 128));
        assert_eq!(half.a, 255);
        assert!(half.r > 120 && half.r < 135);
        assert!(half.b > 120 && half.b < 135);
    }

    #[test]
    fn text_contrast() {
        assert_eq!(Color::BLACK.contrasting_text(), Color::WHITE);
        assert_eq!(Color::rgb(255, 255, 0).contrasting_text(), Color::BLACK);
        assert!((Color::BLACK.contrast(&Color::WHITE) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn rainbow_primaries() {
        assert_eq!(Color::rainbow(0.0), Color::rgb(255, 0, 0));
        assert_eq!(Color::rainbow(120.0), Color::rgb(0, 255, 0));
        assert_eq!(Color::rainbow(240.0), Color::rgb(0, 0, 255));
        assert_eq!(Color::rainbow(360.0), Color::rgb(255, 0, 0));
    }
}
