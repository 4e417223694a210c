//! Flattening options
//!
//! Options deserialize from TOML (or JSON) with every field optional:
//!
//! ```toml
//! font_size = 14
//! font = "Helvetica"
//! on_annotation_error = "skip"
//! remove_flattened = false
//!
//! [text_color]
//! source = "fixed"
//! color = "#000000"
//! ```

use crate::error::FlattenError;
use crate::style::{ColorSource, StandardFont};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Font size used when none is configured
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

/// What to do when a single annotation cannot be flattened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record the annotation as skipped and continue with the rest
    #[default]
    Skip,
    /// Fail the whole run
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    pub font_size: f64,
    pub font: StandardFont,
    pub text_color: ColorSource,
    pub on_annotation_error: ErrorPolicy,
    /// Remove each flattened annotation from the copy so the reloaded
    /// document does not show the text twice
    pub remove_flattened: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font: StandardFont::Helvetica,
            text_color: ColorSource::default(),
            on_annotation_error: ErrorPolicy::Skip,
            remove_flattened: false,
        }
    }
}

impl FlattenOptions {
    /// Load options from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FlattenError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, FlattenError> {
        let options: Self =
            toml::from_str(s).map_err(|e| FlattenError::ConfigError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_str(s: &str) -> Result<Self, FlattenError> {
        let options: Self =
            serde_json::from_str(s).map_err(|e| FlattenError::ConfigError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), FlattenError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(FlattenError::ConfigError(format!(
                "font_size must be a positive number, got {}",
                self.font_size
            )));
        }
        if !self.text_color.is_valid() {
            return Err(FlattenError::ConfigError(
                "text color components must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }
}
