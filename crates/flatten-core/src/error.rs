use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Viewer is not initialized")]
    ViewerNotReady,

    #[error("Viewer is already initialized with {0}")]
    AlreadyInitialized(String),

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("A writer session is already open on page {0}")]
    WriterBusy(u32),

    #[error("No writer session is open")]
    NoActiveSession,

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),
}

impl FlattenError {
    /// Whether a failure is scoped to a single annotation.
    ///
    /// Recoverable errors may be skipped by the flattening run; everything
    /// else aborts it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FlattenError::PageNotFound(_)
                | FlattenError::InvalidAnnotation(_)
                | FlattenError::OperationError(_)
        )
    }
}
