//! Content elements written into a page's content stream

use crate::style::{RgbColor, StandardFont};

/// 2D affine text matrix `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMatrix(pub [f64; 6]);

impl TextMatrix {
    /// Translation only: no scale, rotation or shear
    pub fn translate(x: f64, y: f64) -> Self {
        TextMatrix([1.0, 0.0, 0.0, 1.0, x, y])
    }
}

/// A drawing primitive appended to a page. Write-only.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentElement {
    TextBegin {
        font: StandardFont,
        size: f64,
    },
    TextRun {
        text: String,
        matrix: TextMatrix,
        fill: RgbColor,
    },
    TextEnd,
}

/// Builds text elements for one font and size
#[derive(Debug, Clone, Copy)]
pub struct ElementBuilder {
    font: StandardFont,
    size: f64,
}

impl ElementBuilder {
    pub fn new(font: StandardFont, size: f64) -> Self {
        Self { font, size }
    }

    pub fn text_begin(&self) -> ContentElement {
        ContentElement::TextBegin {
            font: self.font,
            size: self.size,
        }
    }

    pub fn text_run(&self, text: &str, x: f64, y: f64, fill: RgbColor) -> ContentElement {
        ContentElement::TextRun {
            text: text.to_string(),
            matrix: TextMatrix::translate(x, y),
            fill,
        }
    }

    pub fn text_end(&self) -> ContentElement {
        ContentElement::TextEnd
    }
}
