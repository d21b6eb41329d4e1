//! Error taxonomy for FormGuide core operations.
//!
//! Every operation returns a distinguishable kind. The gateway maps not-found kinds to 404,
//! input kinds to 400 and upstream generation failures to 502.

use thiserror::Error;

use crate::schema::FieldKind;
use crate::session::SessionId;

/// Result type alias for core operations.
pub type FormResult<T> = Result<T, FormError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Session ID not found: {0}")]
    SessionNotFound(SessionId),

    #[error("No data found for session ID: {0}")]
    NoSubmission(SessionId),

    #[error("Question is required for follow-up assistance")]
    MissingQuestion,

    #[error("Form data is required")]
    EmptyPayload,

    #[error("Field '{key}' expects a value of type {expected}")]
    InvalidFieldValue { key: String, expected: FieldKind },

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),
}

impl FormError {
    /// True for kinds that reference something that does not exist (404 class).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FormError::FieldNotFound(_) | FormError::SessionNotFound(_) | FormError::NoSubmission(_)
        )
    }

    /// True for kinds caused by malformed client input (400 class).
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            FormError::MissingQuestion | FormError::EmptyPayload | FormError::InvalidFieldValue { .. }
        )
    }
}

/// Failures loading a schema at startup.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema read: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate field key: {0}")]
    DuplicateKey(String),

    #[error("schema defines no fields")]
    Empty,
}
