//! Scoped page writer
//!
//! A `WriterSession` owns the document's single writer for its lifetime.
//! `finish` commits; dropping the guard without finishing abandons the
//! session, so no exit path leaves a writer open.

use crate::document::DocumentHandle;
use crate::element::ContentElement;
use crate::error::FlattenError;
use tracing::warn;

pub struct WriterSession<'a, D: DocumentHandle + ?Sized> {
    document: &'a mut D,
    page: u32,
    open: bool,
}

impl<'a, D: DocumentHandle + ?Sized> WriterSession<'a, D> {
    pub fn begin(document: &'a mut D, page: u32) -> Result<Self, FlattenError> {
        document.begin_on_page(page)?;
        Ok(Self {
            document,
            page,
            open: true,
        })
    }

    pub fn write(&mut self, element: &ContentElement) -> Result<(), FlattenError> {
        self.document.write_element(element)
    }

    pub fn write_all<'e, I>(&mut self, elements: I) -> Result<(), FlattenError>
    where
        I: IntoIterator<Item = &'e ContentElement>,
    {
        for element in elements {
            self.write(element)?;
        }
        Ok(())
    }

    /// Commit everything written to the page
    pub fn finish(mut self) -> Result<(), FlattenError> {
        self.open = false;
        self.document.end()
    }
}

impl<D: DocumentHandle + ?Sized> Drop for WriterSession<'_, D> {
    fn drop(&mut self) {
        if self.open {
            warn!(page = self.page, "writer session dropped before finish");
            self.document.abandon();
        }
    }
}
