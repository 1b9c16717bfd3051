// Error taxonomy
//
// Validation and NotFound are user-correctable and map to 4xx at the HTTP
// edge. External covers the background rate-source fetch and is never
// surfaced to a caller synchronously. Store is an underlying persistence
// failure surfaced as a generic 500.

use std::fmt;

#[derive(Debug)]
pub enum LedgerError {
    /// The first violated constraint of an incoming submission.
    Validation { field: &'static str, message: String },

    /// A referenced entity does not exist.
    NotFound(String),

    /// The external rate source failed (network, HTTP status, bad payload).
    External(String),

    /// Underlying persistence failure.
    Store(String),
}

impl LedgerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Field the validation failed on, if this is a validation error.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LedgerError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation { message, .. } => write!(f, "{}", message),
            LedgerError::NotFound(what) => write!(f, "{} not found", what),
            LedgerError::External(message) => write!(f, "rate source error: {}", message),
            LedgerError::Store(message) => write!(f, "storage error: {}", message),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Store(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
