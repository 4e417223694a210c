//! Free-text annotation flattening
//!
//! This crate bakes free-text annotations into permanent page content using
//! lopdf.
//!
//! - `viewer`: the viewer host holding the displayed document and its
//!   annotation store
//! - `document`: editable document handles and the lopdf backend
//! - `writer`: scoped page writer sessions
//! - `flatten`: the flattening procedure

pub mod annotation;
pub mod document;
pub mod element;
pub mod error;
pub mod flatten;
pub mod options;
pub mod page;
pub mod style;
pub mod viewer;
pub mod writer;

pub use annotation::{read_annotations, Annotation, AnnotationId, AnnotationKind, FreeText};
pub use document::{DocumentHandle, DocumentOpener, LopdfOpener, PdfDocument};
pub use element::{ContentElement, ElementBuilder, TextMatrix};
pub use error::FlattenError;
pub use flatten::{flatten_free_text, text_origin, FlattenReport, SkippedAnnotation};
pub use options::{ErrorPolicy, FlattenOptions, DEFAULT_FONT_SIZE};
pub use style::{ColorSource, RgbColor, StandardFont};
pub use viewer::{Viewer, ViewerHost, ViewerInstance};
pub use writer::WriterSession;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, FlattenError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| FlattenError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Flatten the free-text annotations stored in a PDF and return the new bytes.
///
/// Convenience for callers without a viewer: the document's own `/Annots`
/// serve as the annotation store.
pub fn flatten_pdf_bytes(
    bytes: &[u8],
    options: &FlattenOptions,
) -> Result<(Vec<u8>, FlattenReport), FlattenError> {
    let mut viewer = Viewer::new();
    viewer.initialize_with_bytes("memory", "document.pdf", bytes.to_vec())?;
    let report = flatten_free_text(&mut viewer, &LopdfOpener, options)?;
    let output = viewer.current_document_bytes()?;
    Ok((output, report))
}
