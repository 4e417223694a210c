//! Annotation model and import from PDF `/Annots` arrays
//!
//! Annotations are positioned in a top-left-origin coordinate system (the
//! one a viewer works in), measured from the top-left corner of the page's
//! MediaBox. PDF stores `/Rect` bottom-left-origin in user space, so import
//! flips the y axis against the top of the MediaBox.

use crate::page::box_corners;
use crate::style::RgbColor;
use encoding_rs::UTF_16BE;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

/// Identifier of an annotation within the viewer's store
pub type AnnotationId = String;

/// An annotation overlaid on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Page number (1-indexed)
    pub page: u32,
    /// Left edge, in points from the page's left edge
    pub x: f64,
    /// Top edge, in points from the page's top edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub kind: AnnotationKind,
    /// The `/Annot` object this was imported from, if it lives in the document
    pub source: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeText {
    pub contents: String,
    /// Text colour from the default appearance string (`/DA`)
    #[serde(default)]
    pub text_color: Option<RgbColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    FreeText(FreeText),
    Highlight,
    Underline,
    StrikeOut,
    Square,
    Circle,
    Line,
    Ink,
    /// Sticky note (`/Text` subtype)
    Note,
    Link,
    Widget,
    Other(String),
}

impl AnnotationKind {
    pub fn from_subtype(subtype: &[u8], dict: &Dictionary) -> Self {
        match subtype {
            b"FreeText" => AnnotationKind::FreeText(FreeText {
                contents: text_entry(dict, b"Contents").unwrap_or_default(),
                text_color: text_entry(dict, b"DA")
                    .as_deref()
                    .and_then(parse_da_color),
            }),
            b"Highlight" => AnnotationKind::Highlight,
            b"Underline" => AnnotationKind::Underline,
            b"StrikeOut" => AnnotationKind::StrikeOut,
            b"Square" => AnnotationKind::Square,
            b"Circle" => AnnotationKind::Circle,
            b"Line" => AnnotationKind::Line,
            b"Ink" => AnnotationKind::Ink,
            b"Text" => AnnotationKind::Note,
            b"Link" => AnnotationKind::Link,
            b"Widget" => AnnotationKind::Widget,
            other => AnnotationKind::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnnotationKind::FreeText(_) => "FreeText",
            AnnotationKind::Highlight => "Highlight",
            AnnotationKind::Underline => "Underline",
            AnnotationKind::StrikeOut => "StrikeOut",
            AnnotationKind::Square => "Square",
            AnnotationKind::Circle => "Circle",
            AnnotationKind::Line => "Line",
            AnnotationKind::Ink => "Ink",
            AnnotationKind::Note => "Text",
            AnnotationKind::Link => "Link",
            AnnotationKind::Widget => "Widget",
            AnnotationKind::Other(name) => name,
        }
    }
}

impl Annotation {
    /// A free-text annotation that only exists in the viewer's store
    pub fn free_text(
        id: impl Into<AnnotationId>,
        page: u32,
        x: f64,
        y: f64,
        contents: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            page,
            x,
            y,
            width: 0.0,
            height: 0.0,
            kind: AnnotationKind::FreeText(FreeText {
                contents: contents.into(),
                text_color: None,
            }),
            source: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn is_free_text(&self) -> bool {
        matches!(self.kind, AnnotationKind::FreeText(_))
    }
}

/// Read every annotation in the document, page by page, in `/Annots` order.
///
/// Popups are children of other annotations and are not reported. Entries
/// without a usable `/Subtype` or `/Rect` are skipped.
pub fn read_annotations(doc: &Document) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    for (page_num, page_id) in doc.get_pages() {
        let Ok(page_dict) = doc.get_dictionary(page_id) else {
            continue;
        };
        let (left, _, top) = box_corners(doc, page_dict);

        let annots = match page_dict.get(b"Annots") {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => continue,
            },
            _ => continue,
        };

        for (index, entry) in annots.iter().enumerate() {
            let (source, dict) = match entry {
                Object::Reference(id) => match doc.get_dictionary(*id) {
                    Ok(dict) => (Some(*id), dict),
                    Err(_) => continue,
                },
                Object::Dictionary(dict) => (None, dict),
                _ => continue,
            };

            let Ok(subtype) = dict.get(b"Subtype").and_then(Object::as_name) else {
                continue;
            };
            if subtype == b"Popup" {
                continue;
            }
            let Some([x1, y1, x2, y2]) = rect_entry(dict) else {
                continue;
            };

            let id = text_entry(dict, b"NM").unwrap_or_else(|| match source {
                Some((num, gen)) => format!("obj-{}-{}", num, gen),
                None => format!("page-{}-annot-{}", page_num, index),
            });

            annotations.push(Annotation {
                id,
                page: page_num,
                x: x1.min(x2) - left,
                y: top - y1.max(y2),
                width: (x2 - x1).abs(),
                height: (y2 - y1).abs(),
                kind: AnnotationKind::from_subtype(subtype, dict),
                source,
            });
        }
    }

    annotations
}

fn rect_entry(dict: &Dictionary) -> Option<[f64; 4]> {
    let arr = dict.get(b"Rect").ok()?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, obj) in rect.iter_mut().zip(arr) {
        *slot = number(obj)?;
    }
    Some(rect)
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// PDFDocEncoding code points for bytes 0x80-0xA0; every other byte maps
/// as in Latin-1 apart from the accents at 0x18-0x1F.
const PDF_DOC_HIGH: [u16; 33] = [
    0x2022, 0x2020, 0x2021, 0x2026, 0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203a, 0x2212,
    0x2030, 0x201e, 0x201c, 0x201d, 0x2018, 0x2019, 0x201a, 0x2122, 0xfb01, 0xfb02, 0x0141,
    0x0152, 0x0160, 0x0178, 0x017d, 0x0131, 0x0142, 0x0153, 0x0161, 0x017e, 0xfffd, 0x20ac,
];

const PDF_DOC_ACCENTS: [u16; 8] = [
    0x02d8, 0x02c7, 0x02c6, 0x02d9, 0x02dd, 0x02db, 0x02da, 0x02dc,
];

fn pdf_doc_char(byte: u8) -> char {
    let code = match byte {
        0x18..=0x1F => PDF_DOC_ACCENTS[(byte - 0x18) as usize],
        0x80..=0xA0 => PDF_DOC_HIGH[(byte - 0x80) as usize],
        _ => byte as u16,
    };
    char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Decode a PDF text string: UTF-16BE when it carries a byte order mark,
/// otherwise PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (text, _) = UTF_16BE.decode_without_bom_handling(body);
        return text.into_owned();
    }
    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

/// Extract the non-stroking colour from a default appearance string,
/// e.g. `/Helv 12 Tf 0 0 1 rg`. Grey (`g`) is widened to RGB.
pub fn parse_da_color(da: &str) -> Option<RgbColor> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let mut color = None;

    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "rg" if i >= 3 => {
                let parsed: Option<Vec<f64>> = tokens[i - 3..i]
                    .iter()
                    .map(|t| t.parse::<f64>().ok())
                    .collect();
                if let Some(c) = parsed {
                    color = Some(RgbColor::new(c[0], c[1], c[2]));
                }
            }
            "g" if i >= 1 => {
                if let Ok(grey) = tokens[i - 1].parse::<f64>() {
                    color = Some(RgbColor::new(grey, grey, grey));
                }
            }
            _ => {}
        }
    }

    color.filter(RgbColor::is_valid)
}
