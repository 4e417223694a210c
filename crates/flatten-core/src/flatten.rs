//! Free-text annotation flattening
//!
//! Every free-text annotation in the viewer's store is drawn as a text run
//! onto its page in an independent copy of the displayed document, then the
//! viewer is reloaded with that copy. The annotations themselves are only
//! read; the displayed document is never mutated in place.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, FreeText};
use crate::document::{DocumentHandle, DocumentOpener};
use crate::element::ElementBuilder;
use crate::error::FlattenError;
use crate::options::{ErrorPolicy, FlattenOptions};
use crate::viewer::ViewerHost;
use crate::writer::WriterSession;
use serde::Serialize;
use tracing::{debug, info, warn};

/// An annotation that could not be flattened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedAnnotation {
    pub id: AnnotationId,
    pub page: u32,
    pub reason: String,
}

/// Outcome of a flattening run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlattenReport {
    /// Free-text annotations drawn into page content
    pub flattened: usize,
    /// Annotations of other kinds, left alone
    pub ignored: usize,
    /// Flattened annotations removed from the document copy
    pub removed: usize,
    pub skipped: Vec<SkippedAnnotation>,
}

impl FlattenReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Baseline origin for a run of text at the annotation's top-left corner.
///
/// Annotation coordinates are top-left-origin; page content is
/// bottom-left-origin, and the text baseline sits one font size below the
/// annotation's top edge. The result is relative to the bottom-left corner
/// of the page's MediaBox.
pub fn text_origin(annotation: &Annotation, page_height: f64, font_size: f64) -> (f64, f64) {
    (annotation.x, page_height - annotation.y - font_size)
}

/// Flatten every free-text annotation of the viewer's document and reload
/// the viewer with the result.
///
/// Failing to open the document is fatal: nothing is written and the viewer
/// is not reloaded. Failures on a single annotation follow
/// `options.on_annotation_error`.
pub fn flatten_free_text<H, O>(
    host: &mut H,
    opener: &O,
    options: &FlattenOptions,
) -> Result<FlattenReport, FlattenError>
where
    H: ViewerHost,
    O: DocumentOpener,
{
    options.validate()?;

    let bytes = host.current_document_bytes()?;
    let mut document = opener.open(&bytes)?;
    let annotations = host.list_annotations()?;
    debug!(
        annotations = annotations.len(),
        bytes = bytes.len(),
        "flattening free-text annotations"
    );

    let mut report = FlattenReport::default();

    for annotation in &annotations {
        match &annotation.kind {
            AnnotationKind::FreeText(free_text) => {
                match flatten_one(&mut document, annotation, free_text, options) {
                    Ok(removed) => {
                        report.flattened += 1;
                        if removed {
                            report.removed += 1;
                        }
                    }
                    Err(e)
                        if e.is_recoverable()
                            && options.on_annotation_error == ErrorPolicy::Skip =>
                    {
                        warn!(
                            id = %annotation.id,
                            page = annotation.page,
                            error = %e,
                            "skipping annotation"
                        );
                        report.skipped.push(SkippedAnnotation {
                            id: annotation.id.clone(),
                            page: annotation.page,
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            AnnotationKind::Highlight
            | AnnotationKind::Underline
            | AnnotationKind::StrikeOut
            | AnnotationKind::Square
            | AnnotationKind::Circle
            | AnnotationKind::Line
            | AnnotationKind::Ink
            | AnnotationKind::Note
            | AnnotationKind::Link
            | AnnotationKind::Widget
            | AnnotationKind::Other(_) => {
                report.ignored += 1;
            }
        }
    }

    host.reload_with(document)?;

    info!(
        flattened = report.flattened,
        ignored = report.ignored,
        removed = report.removed,
        skipped = report.skipped.len(),
        "flattening complete"
    );
    Ok(report)
}

/// Draw one annotation. Returns whether its `/Annot` object was removed.
fn flatten_one<D: DocumentHandle>(
    document: &mut D,
    annotation: &Annotation,
    free_text: &FreeText,
    options: &FlattenOptions,
) -> Result<bool, FlattenError> {
    if !(annotation.x.is_finite() && annotation.y.is_finite()) {
        return Err(FlattenError::InvalidAnnotation(format!(
            "{} has a non-finite position",
            annotation.id
        )));
    }

    let page_height = document.page_height(annotation.page)?;
    let (left, bottom) = document.page_origin(annotation.page)?;
    let (x, y) = text_origin(annotation, page_height, options.font_size);
    let (x, y) = (left + x, bottom + y);
    let fill = options.text_color.resolve(free_text.text_color);
    let builder = ElementBuilder::new(options.font, options.font_size);

    let mut session = WriterSession::begin(document, annotation.page)?;
    session.write_all(&[
        builder.text_begin(),
        builder.text_run(&free_text.contents, x, y, fill),
        builder.text_end(),
    ])?;
    session.finish()?;

    match annotation.source {
        Some(object_id) if options.remove_flattened => {
            document.remove_annotation(annotation.page, object_id)
        }
        _ => Ok(false),
    }
}
