//! Shared fixtures: a recording fake document backend and viewer host, and
//! an in-memory PDF builder.

#![allow(dead_code)]

use flatten_core::{
    Annotation, ContentElement, DocumentHandle, DocumentOpener, FlattenError, ViewerHost,
};
use lopdf::{dictionary, Document, Object, ObjectId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Begin(u32),
    Write(ContentElement),
    End,
    Abandon,
    Remove(u32, ObjectId),
    Save,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Document handle that records every call
pub struct RecordingDocument {
    heights: HashMap<u32, f64>,
    open_page: Option<u32>,
    log: EventLog,
}

impl DocumentHandle for RecordingDocument {
    fn page_count(&self) -> u32 {
        self.heights.len() as u32
    }

    fn page_height(&self, page: u32) -> Result<f64, FlattenError> {
        self.heights
            .get(&page)
            .copied()
            .ok_or(FlattenError::PageNotFound(page))
    }

    fn page_origin(&self, page: u32) -> Result<(f64, f64), FlattenError> {
        self.page_height(page).map(|_| (0.0, 0.0))
    }

    fn begin_on_page(&mut self, page: u32) -> Result<(), FlattenError> {
        if let Some(open) = self.open_page {
            return Err(FlattenError::WriterBusy(open));
        }
        if !self.heights.contains_key(&page) {
            return Err(FlattenError::PageNotFound(page));
        }
        self.open_page = Some(page);
        self.log.borrow_mut().push(Event::Begin(page));
        Ok(())
    }

    fn write_element(&mut self, element: &ContentElement) -> Result<(), FlattenError> {
        if self.open_page.is_none() {
            return Err(FlattenError::NoActiveSession);
        }
        self.log.borrow_mut().push(Event::Write(element.clone()));
        Ok(())
    }

    fn end(&mut self) -> Result<(), FlattenError> {
        self.open_page.take().ok_or(FlattenError::NoActiveSession)?;
        self.log.borrow_mut().push(Event::End);
        Ok(())
    }

    fn abandon(&mut self) {
        if self.open_page.take().is_some() {
            self.log.borrow_mut().push(Event::Abandon);
        }
    }

    fn remove_annotation(&mut self, page: u32, annotation: ObjectId) -> Result<bool, FlattenError> {
        self.log.borrow_mut().push(Event::Remove(page, annotation));
        Ok(true)
    }

    fn save(&mut self) -> Result<Vec<u8>, FlattenError> {
        self.log.borrow_mut().push(Event::Save);
        Ok(b"%PDF-fake".to_vec())
    }
}

/// Opener that hands out recording documents, or fails like malformed bytes
pub struct FakeOpener {
    pub heights: HashMap<u32, f64>,
    pub fail: bool,
    pub log: EventLog,
}

impl FakeOpener {
    pub fn with_pages(heights: &[(u32, f64)]) -> Self {
        Self {
            heights: heights.iter().copied().collect(),
            fail: false,
            log: EventLog::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            heights: HashMap::new(),
            fail: true,
            log: EventLog::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn begin_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Begin(_)))
            .count()
    }
}

impl DocumentOpener for FakeOpener {
    type Handle = RecordingDocument;

    fn open(&self, _bytes: &[u8]) -> Result<RecordingDocument, FlattenError> {
        if self.fail {
            return Err(FlattenError::ParseError("invalid file header".into()));
        }
        self.log.borrow_mut().push(Event::Open);
        Ok(RecordingDocument {
            heights: self.heights.clone(),
            open_page: None,
            log: Rc::clone(&self.log),
        })
    }
}

/// Viewer host with a fixed annotation list
pub struct FakeHost {
    pub bytes: Vec<u8>,
    pub annotations: Vec<Annotation>,
    pub reloads: usize,
    pub reloaded_bytes: Option<Vec<u8>>,
}

impl FakeHost {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self {
            bytes: b"%PDF-1.7".to_vec(),
            annotations,
            reloads: 0,
            reloaded_bytes: None,
        }
    }
}

impl ViewerHost for FakeHost {
    fn current_document_bytes(&self) -> Result<Vec<u8>, FlattenError> {
        Ok(self.bytes.clone())
    }

    fn list_annotations(&self) -> Result<Vec<Annotation>, FlattenError> {
        Ok(self.annotations.clone())
    }

    fn reload_with<D: DocumentHandle>(&mut self, mut document: D) -> Result<(), FlattenError> {
        self.reloaded_bytes = Some(document.save()?);
        self.reloads += 1;
        Ok(())
    }
}

/// Build a PDF whose pages are 612x792 and carry the given annotation
/// dictionaries: `annots[i]` goes on page `i + 1`.
pub fn create_pdf_with_annots(annots: Vec<Vec<lopdf::Dictionary>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for page_annots in annots {
        let content_id = doc.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            b"BT /F1 12 Tf 50 700 Td (Original) Tj ET".to_vec(),
        ));
        let refs: Vec<Object> = page_annots
            .into_iter()
            .map(|a| Object::Reference(doc.add_object(a)))
            .collect();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Courier",
                    },
                },
            },
            "Annots" => refs,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
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

pub fn free_text_dict(rect: [i64; 4], contents: &str, da: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "FreeText",
        "Rect" => rect.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        "Contents" => Object::string_literal(contents),
        "DA" => Object::string_literal(da),
    }
}

pub fn highlight_dict(rect: [i64; 4]) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
    }
}
