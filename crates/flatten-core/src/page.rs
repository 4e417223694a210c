//! Page geometry
//!
//! Flattened text is placed relative to the page's MediaBox, which may be
//! inherited from any ancestor in the page tree.

use crate::annotation::number;
use lopdf::{Dictionary, Document, Object};

/// US Letter, used when no MediaBox can be found
pub const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Get MediaBox from page, inheriting from ancestors if necessary
pub fn media_box(doc: &Document, page_dict: &Dictionary) -> [f64; 4] {
    let mut current = Some(page_dict);
    // Bounded walk so a cyclic /Parent chain cannot hang us
    for _ in 0..32 {
        let Some(dict) = current else { break };

        if let Some(found) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| parse_box_array(arr))
        {
            return found;
        }

        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    DEFAULT_MEDIA_BOX
}

/// Page height in points
pub fn page_height(doc: &Document, page_dict: &Dictionary) -> f64 {
    let [_, y1, _, y2] = media_box(doc, page_dict);
    (y2 - y1).abs()
}

/// Bottom-left and top-left corners of the MediaBox, as `(left, bottom, top)`.
///
/// Viewer coordinates are measured from the box's top-left corner, which is
/// only `(0, height)` when the box sits at the origin.
pub fn box_corners(doc: &Document, page_dict: &Dictionary) -> (f64, f64, f64) {
    let [x1, y1, x2, y2] = media_box(doc, page_dict);
    (x1.min(x2), y1.min(y2), y1.max(y2))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Option<[f64; 4]> {
    if array.len() != 4 {
        return None;
    }
    let mut result = [0.0; 4];
    for (slot, obj) in result.iter_mut().zip(array) {
        *slot = number(obj)?;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_media_box_on_page() {
        let doc = Document::with_version("1.7");
        let page = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 200.into()],
        };
        assert_eq!(page_height(&doc, &page), 200.0);
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), Object::Real(841.5)],
        });
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        };
        assert_eq!(page_height(&doc, &page), 841.5);
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let doc = Document::with_version("1.7");
        let page = dictionary! { "Type" => "Page" };
        assert_eq!(media_box(&doc, &page), DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn test_offset_media_box_height() {
        let doc = Document::with_version("1.7");
        let page = dictionary! {
            "MediaBox" => vec![0.into(), 100.into(), 612.into(), 892.into()],
        };
        assert_eq!(page_height(&doc, &page), 792.0);
    }

    #[test]
    fn test_box_corners_follow_offset_media_box() {
        let doc = Document::with_version("1.7");
        let page = dictionary! {
            "MediaBox" => vec![50.into(), 100.into(), 662.into(), 892.into()],
        };
        assert_eq!(box_corners(&doc, &page), (50.0, 100.0, 892.0));
    }
}
