//! Stateful flattening session
//!
//! Holds the viewer (displayed document plus annotation store) in Rust
//! memory. JavaScript renders `getDocumentBytes()`, forwards user-placed
//! free-text annotations, and calls `transform()` from its button.

use flatten_core::{
    flatten_free_text, Annotation, ColorSource, FlattenError, FlattenOptions, FlattenReport,
    LopdfOpener, RgbColor, StandardFont, Viewer, ViewerHost,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Viewer session backing the flattening page
#[wasm_bindgen]
pub struct FlattenSession {
    container: String,
    viewer: Viewer,
    options: FlattenOptions,
    next_annotation: u64,
    progress_callback: Option<js_sys::Function>,
}

/// Report for JS serialization
#[derive(Debug, Serialize)]
struct TransformResultJs {
    flattened: usize,
    ignored: usize,
    removed: usize,
    skipped: Vec<SkippedJs>,
    page_count: u32,
}

#[derive(Debug, Serialize)]
struct SkippedJs {
    id: String,
    page: u32,
    reason: String,
}

impl TransformResultJs {
    fn new(report: FlattenReport, page_count: u32) -> Self {
        Self {
            flattened: report.flattened,
            ignored: report.ignored,
            removed: report.removed,
            skipped: report
                .skipped
                .into_iter()
                .map(|s| SkippedJs {
                    id: s.id,
                    page: s.page,
                    reason: s.reason,
                })
                .collect(),
            page_count,
        }
    }
}

fn to_js_error(context: &str, error: FlattenError) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, error))
}

#[wasm_bindgen]
impl FlattenSession {
    /// Create a session bound to the viewer's container element id
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str) -> Self {
        Self {
            container: container_id.to_string(),
            viewer: Viewer::new(),
            options: FlattenOptions::default(),
            next_annotation: 0,
            progress_callback: None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn container(&self) -> String {
        self.container.clone()
    }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.viewer.is_ready()
    }

    /// Set a progress callback function
    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    fn load_document_internal(&mut self, name: &str, bytes: &[u8]) -> Result<u32, FlattenError> {
        let instance = self
            .viewer
            .initialize_with_bytes(&self.container, name, bytes.to_vec())?;
        Ok(instance.page_count())
    }

    /// Mount a document in the viewer. Returns the page count.
    #[wasm_bindgen(js_name = loadDocument)]
    pub fn load_document(&mut self, name: &str, bytes: &[u8]) -> Result<u32, JsValue> {
        self.load_document_internal(name, bytes)
            .map_err(|e| to_js_error("Failed to load document", e))
    }

    fn add_free_text_internal(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: &str,
    ) -> Result<String, FlattenError> {
        let id = format!("freetext-{}", self.next_annotation);
        let annotation =
            Annotation::free_text(id.clone(), page, x, y, text).with_size(width, height);
        self.viewer.add_annotation(annotation)?;
        self.next_annotation += 1;
        Ok(id)
    }

    /// Add a free-text annotation at top-left-origin coordinates.
    /// Returns the annotation id.
    #[wasm_bindgen(js_name = addFreeText)]
    pub fn add_free_text(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: &str,
    ) -> Result<String, JsValue> {
        self.add_free_text_internal(page, x, y, width, height, text)
            .map_err(|e| to_js_error("Failed to add annotation", e))
    }

    /// Remove an annotation from the store
    #[wasm_bindgen(js_name = removeAnnotation)]
    pub fn remove_annotation(&mut self, id: &str) -> Result<bool, JsValue> {
        self.viewer
            .remove_annotation(id)
            .map_err(|e| to_js_error("Failed to remove annotation", e))
    }

    #[wasm_bindgen(js_name = annotationCount)]
    pub fn annotation_count(&self) -> usize {
        self.viewer
            .instance()
            .map(|i| i.annotations().len())
            .unwrap_or(0)
    }

    /// Fixed fill colour for flattened text, as "#RRGGBB"
    #[wasm_bindgen(js_name = setTextColor)]
    pub fn set_text_color(&mut self, hex: &str) -> Result<(), JsValue> {
        let color = RgbColor::from_hex(hex).map_err(|e| to_js_error("Invalid color", e))?;
        self.options.text_color = ColorSource::Fixed { color };
        Ok(())
    }

    /// Use each annotation's own text colour when it has one
    #[wasm_bindgen(js_name = setColorFromAnnotations)]
    pub fn set_color_from_annotations(&mut self, enabled: bool) {
        let current = self.options.text_color.resolve(None);
        self.options.text_color = if enabled {
            ColorSource::FromAnnotation { fallback: current }
        } else {
            ColorSource::Fixed { color: current }
        };
    }

    /// Pick the standard font for flattened text from a family name such as
    /// "serif", "sans-serif" or "Times New Roman". Returns the font used.
    #[wasm_bindgen(js_name = setFontFamily)]
    pub fn set_font_family(&mut self, family: &str, bold: bool, italic: bool) -> String {
        self.options.font = StandardFont::from_family(family, bold, italic);
        self.options.font.base_font().to_string()
    }

    #[wasm_bindgen(js_name = setRemoveFlattened)]
    pub fn set_remove_flattened(&mut self, enabled: bool) {
        self.options.remove_flattened = enabled;
    }

    /// Replace all options from a JSON object string
    #[wasm_bindgen(js_name = setOptionsJson)]
    pub fn set_options_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.options =
            FlattenOptions::from_json_str(json).map_err(|e| to_js_error("Invalid options", e))?;
        Ok(())
    }

    fn transform_internal(&mut self) -> Result<TransformResultJs, FlattenError> {
        let report = flatten_free_text(&mut self.viewer, &LopdfOpener, &self.options)?;
        let page_count = self.viewer.instance()?.page_count();
        Ok(TransformResultJs::new(report, page_count))
    }

    /// Flatten every free-text annotation and reload the viewer.
    /// Returns `{ flattened, ignored, removed, skipped, page_count }`.
    pub fn transform(&mut self) -> Result<JsValue, JsValue> {
        self.report_progress(0, 1, "Flattening annotations...");
        let result = self
            .transform_internal()
            .map_err(|e| to_js_error("Transform failed", e))?;
        self.report_progress(1, 1, "Done");

        serde_wasm_bindgen::to_value(&result)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Get document bytes for rendering
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self
            .viewer
            .current_document_bytes()
            .map_err(|e| to_js_error("No document", e))?;
        let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
        array.copy_from(&bytes);
        Ok(array)
    }

    /// Report progress to JavaScript callback. Exceptions thrown by the
    /// callback are ignored.
    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let this = JsValue::null();
            let _ = callback.call3(
                &this,
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}
