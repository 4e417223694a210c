//! Editable document handles
//!
//! `DocumentHandle` is the seam between the flattening procedure and the
//! PDF object model. `PdfDocument` implements it on top of lopdf; tests
//! substitute recording fakes.

use crate::annotation::{read_annotations, Annotation};
use crate::element::ContentElement;
use crate::error::FlattenError;
use crate::page::{box_corners, page_height};
use crate::style::StandardFont;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// An open, independently mutable document.
///
/// Page content is appended through a begin/write/end protocol. At most one
/// writer session is open at a time.
pub trait DocumentHandle {
    fn page_count(&self) -> u32;

    /// Height of a page (1-indexed) in document units
    fn page_height(&self, page: u32) -> Result<f64, FlattenError>;

    /// Bottom-left corner of a page's MediaBox in user space
    fn page_origin(&self, page: u32) -> Result<(f64, f64), FlattenError>;

    /// Open a writer session on a page
    fn begin_on_page(&mut self, page: u32) -> Result<(), FlattenError>;

    /// Append an element to the open session
    fn write_element(&mut self, element: &ContentElement) -> Result<(), FlattenError>;

    /// Commit the open session to the page. The session is closed even when
    /// committing fails.
    fn end(&mut self) -> Result<(), FlattenError>;

    /// Close the open session, discarding anything written to it
    fn abandon(&mut self);

    /// Remove an annotation object from a page's `/Annots`.
    /// Returns whether anything was removed.
    fn remove_annotation(&mut self, page: u32, annotation: ObjectId) -> Result<bool, FlattenError>;

    /// Serialize the document
    fn save(&mut self) -> Result<Vec<u8>, FlattenError>;
}

/// Opens document handles from serialized bytes
pub trait DocumentOpener {
    type Handle: DocumentHandle;

    fn open(&self, bytes: &[u8]) -> Result<Self::Handle, FlattenError>;
}

/// Opens documents with lopdf
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfOpener;

impl DocumentOpener for LopdfOpener {
    type Handle = PdfDocument;

    fn open(&self, bytes: &[u8]) -> Result<PdfDocument, FlattenError> {
        PdfDocument::load(bytes)
    }
}

struct PendingSession {
    page: u32,
    page_id: ObjectId,
    operations: Vec<Operation>,
    fonts: BTreeSet<StandardFont>,
}

/// A lopdf-backed document open for editing
pub struct PdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    font_objects: HashMap<StandardFont, ObjectId>,
    isolated_pages: HashSet<ObjectId>,
    session: Option<PendingSession>,
}

impl PdfDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, FlattenError> {
        let doc = Document::load_mem(bytes).map_err(|e| FlattenError::ParseError(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        debug!(pages = pages.len(), "opened document");
        Self {
            doc,
            pages,
            font_objects: HashMap::new(),
            isolated_pages: HashSet::new(),
            session: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Annotations stored in the document's `/Annots` arrays
    pub fn annotations(&self) -> Vec<Annotation> {
        read_annotations(&self.doc)
    }

    pub fn is_writing(&self) -> bool {
        self.session.is_some()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, FlattenError> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(FlattenError::PageNotFound(page))
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, FlattenError> {
        self.doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| FlattenError::OperationError(e.to_string()))
    }

    /// Shared Type1 font object for a standard font, created on first use
    fn font_object(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.font_objects.get(&font) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_objects.insert(font, id);
        id
    }

    /// Current `/Contents` of a page as a flat list of stream references
    fn content_entries(&self, page_id: ObjectId) -> Result<Vec<Object>, FlattenError> {
        let page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| FlattenError::OperationError(e.to_string()))?;

        Ok(match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        })
    }

    fn add_content_stream(&mut self, operations: Vec<Operation>) -> Result<ObjectId, FlattenError> {
        let encoded = Content { operations }
            .encode()
            .map_err(|e| FlattenError::OperationError(e.to_string()))?;
        // Streams in a /Contents array are read as one sequence and the
        // page's own streams may not end in whitespace
        let mut bytes = Vec::with_capacity(encoded.len() + 2);
        bytes.push(b'\n');
        bytes.extend(encoded);
        bytes.push(b'\n');
        Ok(self.doc.add_object(Stream::new(Dictionary::new(), bytes)))
    }

    /// Append a stream to a page. The page's existing content is wrapped in
    /// `q`/`Q` the first time so its graphics state cannot leak into ours.
    fn append_content(&mut self, page_id: ObjectId, stream_id: ObjectId) -> Result<(), FlattenError> {
        let existing = self.content_entries(page_id)?;
        let mut contents = Vec::with_capacity(existing.len() + 3);

        if !existing.is_empty() && self.isolated_pages.insert(page_id) {
            let save = self.add_content_stream(vec![Operation::new("q", vec![])])?;
            let restore = self.add_content_stream(vec![Operation::new("Q", vec![])])?;
            contents.push(Object::Reference(save));
            contents.extend(existing);
            contents.push(Object::Reference(restore));
        } else {
            contents.extend(existing);
        }
        contents.push(Object::Reference(stream_id));

        self.page_dict_mut(page_id)?
            .set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Resources in effect for a page, inherited through the page tree
    fn effective_resources(&self, page_id: ObjectId) -> Dictionary {
        let mut current = self.doc.get_dictionary(page_id).ok();
        for _ in 0..32 {
            let Some(dict) = current else { break };
            match dict.get(b"Resources") {
                Ok(Object::Dictionary(res)) => return res.clone(),
                Ok(Object::Reference(id)) => {
                    return self
                        .doc
                        .get_dictionary(*id)
                        .cloned()
                        .unwrap_or_else(|_| Dictionary::new());
                }
                _ => {}
            }
            current = dict
                .get(b"Parent")
                .and_then(Object::as_reference)
                .ok()
                .and_then(|id| self.doc.get_dictionary(id).ok());
        }
        Dictionary::new()
    }

    /// Register fonts in the page's `/Resources /Font`. Resources are copied
    /// onto the page so shared or inherited dictionaries stay untouched.
    fn register_fonts(
        &mut self,
        page_id: ObjectId,
        fonts: &BTreeSet<StandardFont>,
    ) -> Result<(), FlattenError> {
        if fonts.is_empty() {
            return Ok(());
        }
        let entries: Vec<(String, ObjectId)> = fonts
            .iter()
            .map(|font| (font.resource_name(), self.font_object(*font)))
            .collect();

        let mut resources = self.effective_resources(page_id);
        let mut font_dict = match resources.get(b"Font") {
            Ok(Object::Dictionary(d)) => d.clone(),
            Ok(Object::Reference(id)) => self
                .doc
                .get_dictionary(*id)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            _ => Dictionary::new(),
        };
        for (name, id) in entries {
            font_dict.set(name.into_bytes(), Object::Reference(id));
        }
        resources.set("Font", Object::Dictionary(font_dict));

        self.page_dict_mut(page_id)?
            .set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn annots_mut(&mut self, page_id: ObjectId) -> Result<Option<&mut Vec<Object>>, FlattenError> {
        let target = match self.doc.get_dictionary(page_id) {
            Ok(page) => match page.get(b"Annots") {
                Ok(Object::Reference(id)) => Some(*id),
                Ok(Object::Array(_)) => None,
                _ => return Ok(None),
            },
            Err(e) => return Err(FlattenError::OperationError(e.to_string())),
        };

        let annots = match target {
            Some(id) => self.doc.get_object_mut(id).ok(),
            None => self.page_dict_mut(page_id)?.get_mut(b"Annots").ok(),
        };
        Ok(match annots {
            Some(Object::Array(arr)) => Some(arr),
            _ => None,
        })
    }
}

impl DocumentHandle for PdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_height(&self, page: u32) -> Result<f64, FlattenError> {
        let page_id = self.page_id(page)?;
        let dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| FlattenError::OperationError(e.to_string()))?;
        Ok(page_height(&self.doc, dict))
    }

    fn page_origin(&self, page: u32) -> Result<(f64, f64), FlattenError> {
        let page_id = self.page_id(page)?;
        let dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| FlattenError::OperationError(e.to_string()))?;
        let (left, bottom, _) = box_corners(&self.doc, dict);
        Ok((left, bottom))
    }

    fn begin_on_page(&mut self, page: u32) -> Result<(), FlattenError> {
        if let Some(open) = &self.session {
            return Err(FlattenError::WriterBusy(open.page));
        }
        let page_id = self.page_id(page)?;
        debug!(page, "begin writer session");
        self.session = Some(PendingSession {
            page,
            page_id,
            operations: vec![Operation::new("q", vec![])],
            fonts: BTreeSet::new(),
        });
        Ok(())
    }

    fn write_element(&mut self, element: &ContentElement) -> Result<(), FlattenError> {
        let session = self.session.as_mut().ok_or(FlattenError::NoActiveSession)?;

        match element {
            ContentElement::TextBegin { font, size } => {
                session.fonts.insert(*font);
                session.operations.push(Operation::new("BT", vec![]));
                session.operations.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font.resource_name().into_bytes()),
                        Object::Real(*size as f32),
                    ],
                ));
            }
            ContentElement::TextRun { text, matrix, fill } => {
                session.operations.push(Operation::new(
                    "rg",
                    vec![
                        Object::Real(fill.r as f32),
                        Object::Real(fill.g as f32),
                        Object::Real(fill.b as f32),
                    ],
                ));
                session.operations.push(Operation::new(
                    "Tm",
                    matrix.0.iter().map(|v| Object::Real(*v as f32)).collect(),
                ));
                session.operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
            }
            ContentElement::TextEnd => {
                session.operations.push(Operation::new("ET", vec![]));
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), FlattenError> {
        let mut session = self.session.take().ok_or(FlattenError::NoActiveSession)?;
        session.operations.push(Operation::new("Q", vec![]));

        let stream_id = self.add_content_stream(session.operations)?;
        self.append_content(session.page_id, stream_id)?;
        self.register_fonts(session.page_id, &session.fonts)?;
        debug!(page = session.page, "end writer session");
        Ok(())
    }

    fn abandon(&mut self) {
        if let Some(session) = self.session.take() {
            warn!(
                page = session.page,
                discarded = session.operations.len(),
                "abandoned writer session"
            );
        }
    }

    fn remove_annotation(&mut self, page: u32, annotation: ObjectId) -> Result<bool, FlattenError> {
        let page_id = self.page_id(page)?;

        let popup = self
            .doc
            .get_dictionary(annotation)
            .ok()
            .and_then(|d| d.get(b"Popup").and_then(Object::as_reference).ok());

        let Some(annots) = self.annots_mut(page_id)? else {
            return Ok(false);
        };
        let before = annots.len();
        annots.retain(|entry| match entry {
            Object::Reference(id) => *id != annotation && Some(*id) != popup,
            _ => true,
        });
        let removed = annots.len() != before;

        if removed {
            self.doc.objects.remove(&annotation);
            if let Some(popup_id) = popup {
                self.doc.objects.remove(&popup_id);
            }
        }
        Ok(removed)
    }

    fn save(&mut self) -> Result<Vec<u8>, FlattenError> {
        if let Some(open) = &self.session {
            return Err(FlattenError::WriterBusy(open.page));
        }
        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| FlattenError::SaveError(e.to_string()))?;
        Ok(output)
    }
}

/// Encode text for a WinAnsiEncoding simple font. Characters the encoding
/// cannot represent become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u8,
            _ => b'?',
        })
        .collect()
}
