//! Temporal error types

use crate::temporal::Resolution;
use thiserror::Error;

/// Errors raised while building or converting temporal values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// The text is not a calendar string, or a component is out of range
    #[error("Invalid datetime '{text}': {reason}")]
    InvalidFormat { text: String, reason: String },

    /// Truncating to the target resolution would discard a non-zero component
    #[error("'{text}' carries more precision than {resolution} allows")]
    ResolutionMismatch { text: String, resolution: Resolution },

    /// The instant does not fit in 64 bits at the target resolution
    #[error("'{text}' is not representable at {resolution} resolution")]
    OutOfRange { text: String, resolution: Resolution },

    /// A resolution name or unit code was not recognised
    #[error("Unknown resolution: {0}")]
    UnknownResolution(String),
}

impl TemporalError {
    pub(crate) fn invalid(text: &str, reason: impl Into<String>) -> Self {
        TemporalError::InvalidFormat {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for temporal operations
pub type TemporalResult<T> = Result<T, TemporalError>;
