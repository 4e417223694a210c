//! Viewer host
//!
//! The viewer owns the displayed document and the annotation store. It
//! starts `Uninitialized` and becomes `Ready` once a document is mounted;
//! every host operation on an uninitialized viewer fails with
//! `ViewerNotReady`.

use crate::annotation::{read_annotations, Annotation};
use crate::document::DocumentHandle;
use crate::error::FlattenError;
use lopdf::Document;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// What the flattening procedure needs from the viewer
pub trait ViewerHost {
    /// Serialized bytes of the displayed document
    fn current_document_bytes(&self) -> Result<Vec<u8>, FlattenError>;

    /// Every annotation in the store, in store order
    fn list_annotations(&self) -> Result<Vec<Annotation>, FlattenError>;

    /// Display `document` in place of the current one
    fn reload_with<D: DocumentHandle>(&mut self, document: D) -> Result<(), FlattenError>;
}

/// A mounted viewer
#[derive(Debug, Clone)]
pub struct ViewerInstance {
    container: String,
    document_name: String,
    bytes: Vec<u8>,
    page_count: u32,
    annotations: Vec<Annotation>,
    reload_count: u32,
}

impl ViewerInstance {
    fn mount(container: &str, document_name: &str, bytes: Vec<u8>) -> Result<Self, FlattenError> {
        let (page_count, annotations) = inspect(&bytes)?;
        info!(
            container,
            document = document_name,
            pages = page_count,
            annotations = annotations.len(),
            "viewer mounted"
        );
        Ok(Self {
            container: container.to_string(),
            document_name: document_name.to_string(),
            bytes,
            page_count,
            annotations,
            reload_count: 0,
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn reload_count(&self) -> u32 {
        self.reload_count
    }
}

fn inspect(bytes: &[u8]) -> Result<(u32, Vec<Annotation>), FlattenError> {
    let doc = Document::load_mem(bytes).map_err(|e| FlattenError::ParseError(e.to_string()))?;
    Ok((doc.get_pages().len() as u32, read_annotations(&doc)))
}

/// Viewer state machine
#[derive(Debug, Clone, Default)]
pub enum Viewer {
    #[default]
    Uninitialized,
    Ready(ViewerInstance),
}

impl Viewer {
    pub fn new() -> Self {
        Viewer::Uninitialized
    }

    /// Mount the viewer on `container`, displaying the document at
    /// `initial_document_path`
    pub fn initialize<P: AsRef<Path>>(
        &mut self,
        container: &str,
        initial_document_path: P,
    ) -> Result<&ViewerInstance, FlattenError> {
        let path = initial_document_path.as_ref();
        self.ensure_uninitialized()?;
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.initialize_with_bytes(container, &name, bytes)
    }

    /// Mount the viewer on an in-memory document
    pub fn initialize_with_bytes(
        &mut self,
        container: &str,
        document_name: &str,
        bytes: Vec<u8>,
    ) -> Result<&ViewerInstance, FlattenError> {
        self.ensure_uninitialized()?;
        let instance = ViewerInstance::mount(container, document_name, bytes)?;
        *self = Viewer::Ready(instance);
        self.instance()
    }

    fn ensure_uninitialized(&self) -> Result<(), FlattenError> {
        match self {
            Viewer::Uninitialized => Ok(()),
            Viewer::Ready(instance) => Err(FlattenError::AlreadyInitialized(
                instance.document_name.clone(),
            )),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Viewer::Ready(_))
    }

    pub fn instance(&self) -> Result<&ViewerInstance, FlattenError> {
        match self {
            Viewer::Ready(instance) => Ok(instance),
            Viewer::Uninitialized => Err(FlattenError::ViewerNotReady),
        }
    }

    fn instance_mut(&mut self) -> Result<&mut ViewerInstance, FlattenError> {
        match self {
            Viewer::Ready(instance) => Ok(instance),
            Viewer::Uninitialized => Err(FlattenError::ViewerNotReady),
        }
    }

    /// Add a user-created annotation to the store.
    ///
    /// Store-only annotations are not part of the document bytes and are
    /// dropped when the viewer reloads.
    pub fn add_annotation(&mut self, annotation: Annotation) -> Result<(), FlattenError> {
        let instance = self.instance_mut()?;
        if annotation.page == 0 || annotation.page > instance.page_count {
            return Err(FlattenError::PageNotFound(annotation.page));
        }
        debug!(id = %annotation.id, page = annotation.page, "annotation added");
        instance.annotations.push(annotation);
        Ok(())
    }

    /// Remove an annotation from the store by id
    pub fn remove_annotation(&mut self, id: &str) -> Result<bool, FlattenError> {
        let instance = self.instance_mut()?;
        let before = instance.annotations.len();
        instance.annotations.retain(|a| a.id != id);
        Ok(instance.annotations.len() != before)
    }

    /// Replace the displayed document with raw bytes
    pub fn reload_bytes(&mut self, bytes: Vec<u8>) -> Result<(), FlattenError> {
        let (page_count, annotations) = inspect(&bytes)?;
        let instance = self.instance_mut()?;
        instance.bytes = bytes;
        instance.page_count = page_count;
        instance.annotations = annotations;
        instance.reload_count += 1;
        info!(
            document = %instance.document_name,
            pages = page_count,
            annotations = instance.annotations.len(),
            "viewer reloaded"
        );
        Ok(())
    }
}

impl ViewerHost for Viewer {
    fn current_document_bytes(&self) -> Result<Vec<u8>, FlattenError> {
        Ok(self.instance()?.bytes.clone())
    }

    fn list_annotations(&self) -> Result<Vec<Annotation>, FlattenError> {
        Ok(self.instance()?.annotations.clone())
    }

    fn reload_with<D: DocumentHandle>(&mut self, mut document: D) -> Result<(), FlattenError> {
        self.instance()?;
        let bytes = document.save()?;
        self.reload_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use lopdf::{dictionary, Object};

    fn create_test_pdf(pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_uninitialized_viewer_rejects_host_calls() {
        let mut viewer = Viewer::new();
        assert!(!viewer.is_ready());
        assert!(matches!(
            viewer.current_document_bytes(),
            Err(FlattenError::ViewerNotReady)
        ));
        assert!(matches!(
            viewer.list_annotations(),
            Err(FlattenError::ViewerNotReady)
        ));
        let doc = PdfDocument::load(&create_test_pdf(1)).unwrap();
        assert!(matches!(
            viewer.reload_with(doc),
            Err(FlattenError::ViewerNotReady)
        ));
    }

    #[test]
    fn test_initialize_with_bytes() {
        let mut viewer = Viewer::new();
        let instance = viewer
            .initialize_with_bytes("viewer", "sample.pdf", create_test_pdf(2))
            .unwrap();
        assert_eq!(instance.container(), "viewer");
        assert_eq!(instance.document_name(), "sample.pdf");
        assert_eq!(instance.page_count(), 2);
        assert!(instance.annotations().is_empty());
        assert!(viewer.is_ready());
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut viewer = Viewer::new();
        viewer
            .initialize_with_bytes("viewer", "a.pdf", create_test_pdf(1))
            .unwrap();
        assert!(matches!(
            viewer.initialize_with_bytes("viewer", "b.pdf", create_test_pdf(1)),
            Err(FlattenError::AlreadyInitialized(name)) if name == "a.pdf"
        ));
    }

    #[test]
    fn test_initialize_rejects_malformed_document() {
        let mut viewer = Viewer::new();
        assert!(matches!(
            viewer.initialize_with_bytes("viewer", "bad.pdf", b"%PDF-garbage".to_vec()),
            Err(FlattenError::ParseError(_))
        ));
        assert!(!viewer.is_ready());
    }

    #[test]
    fn test_initialize_from_missing_file() {
        let mut viewer = Viewer::new();
        assert!(matches!(
            viewer.initialize("viewer", "/nonexistent/sample.pdf"),
            Err(FlattenError::Io(_))
        ));
    }

    #[test]
    fn test_annotation_store_order_and_page_bounds() {
        let mut viewer = Viewer::new();
        viewer
            .initialize_with_bytes("viewer", "a.pdf", create_test_pdf(2))
            .unwrap();
        viewer
            .add_annotation(Annotation::free_text("a", 2, 1.0, 2.0, "first"))
            .unwrap();
        viewer
            .add_annotation(Annotation::free_text("b", 1, 1.0, 2.0, "second"))
            .unwrap();
        assert!(matches!(
            viewer.add_annotation(Annotation::free_text("c", 3, 0.0, 0.0, "x")),
            Err(FlattenError::PageNotFound(3))
        ));

        let ids: Vec<String> = viewer
            .list_annotations()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(viewer.remove_annotation("a").unwrap());
        assert!(!viewer.remove_annotation("a").unwrap());
        assert_eq!(viewer.list_annotations().unwrap().len(), 1);
    }

    #[test]
    fn test_reload_replaces_document_and_drops_store_only_annotations() {
        let mut viewer = Viewer::new();
        viewer
            .initialize_with_bytes("viewer", "a.pdf", create_test_pdf(1))
            .unwrap();
        viewer
            .add_annotation(Annotation::free_text("a", 1, 1.0, 2.0, "note"))
            .unwrap();

        let replacement = PdfDocument::load(&create_test_pdf(3)).unwrap();
        viewer.reload_with(replacement).unwrap();

        let instance = viewer.instance().unwrap();
        assert_eq!(instance.page_count(), 3);
        assert_eq!(instance.reload_count(), 1);
        assert!(instance.annotations().is_empty());
    }
}
