//! Colours and fonts used for flattened text
//!
//! Text is drawn with one of the PDF standard 14 Type 1 fonts so no font
//! program ever needs to be embedded.

use crate::error::FlattenError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A DeviceRGB colour with components in the 0-1 range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: RgbColor = RgbColor {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse hex color string (e.g., "#FF0000" or "FF0000")
    pub fn from_hex(color: &str) -> Result<Self, FlattenError> {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FlattenError::ConfigError(format!(
                "Invalid hex color: {}",
                color
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| v as f64 / 255.0)
                .map_err(|_| FlattenError::ConfigError(format!("Invalid hex color: {}", color)))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}",
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b)
        )
    }

    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        RgbColor::BLACK
    }
}

impl Serialize for RgbColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RgbColor::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// PDF standard 14 text fonts
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum StandardFont {
    #[default]
    #[serde(rename = "Helvetica")]
    Helvetica,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
    #[serde(rename = "Helvetica-Oblique")]
    HelveticaOblique,
    #[serde(rename = "Helvetica-BoldOblique")]
    HelveticaBoldOblique,
    #[serde(rename = "Times-Roman")]
    TimesRoman,
    #[serde(rename = "Times-Bold")]
    TimesBold,
    #[serde(rename = "Times-Italic")]
    TimesItalic,
    #[serde(rename = "Times-BoldItalic")]
    TimesBoldItalic,
    #[serde(rename = "Courier")]
    Courier,
    #[serde(rename = "Courier-Bold")]
    CourierBold,
    #[serde(rename = "Courier-Oblique")]
    CourierOblique,
    #[serde(rename = "Courier-BoldOblique")]
    CourierBoldOblique,
}

impl StandardFont {
    /// The `/BaseFont` name written into the font dictionary
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Name under which the font is registered in a page's `/Resources /Font`.
    ///
    /// Prefixed so it cannot collide with the document's own `/F1`-style keys.
    pub fn resource_name(&self) -> String {
        format!("FlatText-{}", self.base_font())
    }

    /// Map a font family name to a standard font.
    /// Handles CSS generic families ("serif", "sans-serif", "monospace") and
    /// common names ("Times New Roman", "Arial", "Consolas").
    pub fn from_family(name: &str, bold: bool, italic: bool) -> Self {
        let lower = name.to_lowercase();
        let bold = bold || lower.contains("bold");
        let italic = italic || lower.contains("italic") || lower.contains("oblique");

        let family = match lower.as_str() {
            "serif" => Family::Times,
            "sans-serif" | "cursive" | "fantasy" => Family::Helvetica,
            "monospace" => Family::Courier,
            _ if lower.contains("times")
                || lower.contains("georgia")
                || lower.contains("garamond") =>
            {
                Family::Times
            }
            _ if lower.contains("courier")
                || lower.contains("mono")
                || lower.contains("consolas")
                || lower.contains("monaco") =>
            {
                Family::Courier
            }
            _ => Family::Helvetica,
        };

        match family {
            Family::Times => match (bold, italic) {
                (true, true) => StandardFont::TimesBoldItalic,
                (true, false) => StandardFont::TimesBold,
                (false, true) => StandardFont::TimesItalic,
                (false, false) => StandardFont::TimesRoman,
            },
            Family::Helvetica => match (bold, italic) {
                (true, true) => StandardFont::HelveticaBoldOblique,
                (true, false) => StandardFont::HelveticaBold,
                (false, true) => StandardFont::HelveticaOblique,
                (false, false) => StandardFont::Helvetica,
            },
            Family::Courier => match (bold, italic) {
                (true, true) => StandardFont::CourierBoldOblique,
                (true, false) => StandardFont::CourierBold,
                (false, true) => StandardFont::CourierOblique,
                (false, false) => StandardFont::Courier,
            },
        }
    }
}

enum Family {
    Helvetica,
    Times,
    Courier,
}

/// Where the fill colour of a flattened text run comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ColorSource {
    /// Every run uses the same colour
    Fixed { color: RgbColor },
    /// Use the annotation's default-appearance colour, else `fallback`
    FromAnnotation { fallback: RgbColor },
}

impl Default for ColorSource {
    fn default() -> Self {
        ColorSource::Fixed {
            color: RgbColor::BLACK,
        }
    }
}

impl ColorSource {
    pub fn resolve(&self, annotation_color: Option<RgbColor>) -> RgbColor {
        match self {
            ColorSource::Fixed { color } => *color,
            ColorSource::FromAnnotation { fallback } => annotation_color.unwrap_or(*fallback),
        }
    }

    fn color(&self) -> RgbColor {
        match self {
            ColorSource::Fixed { color } => *color,
            ColorSource::FromAnnotation { fallback } => *fallback,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.color().is_valid()
    }
}
