use thiserror::Error;

/// Application-wide error types for quarry.
#[derive(Error, Debug)]
pub enum AppError {
    /// The renderer (browser or HTTP client) could not be started.
    #[error("Renderer initialization failed: {0}")]
    RendererInit(String),

    /// Navigating to a page failed.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The ready locator did not appear before the deadline.
    #[error("Timed out after {secs} seconds waiting for '{locator}'")]
    Timeout { locator: String, secs: u64 },

    /// The document is final and does not contain the ready locator.
    #[error("Ready locator '{0}' not present in document")]
    ReadyLocatorMissing(String),

    /// Configuration is missing, malformed or violates an invariant.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The URL input file is missing or unreadable.
    #[error("Input error: {0}")]
    InputError(String),

    /// Writing results failed.
    #[error("Output error: {0}")]
    OutputError(String),

    /// A file format that is not supported for input or output.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error aborts the whole run rather than a single URL.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns true for the expected per-URL failures: unreachable page or content not ready.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Navigation(_) | AppError::Timeout { .. } | AppError::ReadyLocatorMissing(_)
        )
    }
}
