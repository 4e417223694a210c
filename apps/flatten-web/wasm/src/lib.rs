//! WASM bindings for free-text annotation flattening
//!
//! The page shows a single "Transform" button over a viewer container.
//! All document state lives in Rust via `FlattenSession`; JavaScript only
//! renders bytes and forwards DOM events.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { FlattenSession } from './pkg/flatten_wasm.js';
//!
//! await init();
//!
//! const session = new FlattenSession("webviewer");
//! session.loadDocument("about.pdf", bytes);
//! session.addFreeText(1, 72, 72, 200, 24, "Reviewed");
//!
//! transformButton.onclick = () => {
//!   try {
//!     const report = session.transform();
//!     render(session.getDocumentBytes());
//!   } catch (err) {
//!     showError(err);
//!   }
//! };
//! ```

mod logging;
pub mod session;

use wasm_bindgen::prelude::*;

pub use session::FlattenSession;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init_console_logging();
    tracing::debug!("flatten-wasm initialized");
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
