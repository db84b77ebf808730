//! Format error type

/// Error produced while reading or validating a `.mdl` or `.rig` document.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A required top-level key is absent
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// The document parsed but violates a structural invariant
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// JSON syntax or type error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormatError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        FormatError::Malformed(msg.into())
    }
}

/// Result alias for format operations
pub type FormatResult<T> = Result<T, FormatError>;
