//! Masking error types.

use thiserror::Error;

/// Masking result type.
pub type MaskResult<T> = Result<T, MaskError>;

/// Masking errors. All are configuration-time; applying a valid pattern
/// never fails.
#[derive(Debug, Error)]
pub enum MaskError {
    /// A pattern field holds an unusable value.
    #[error("invalid mask pattern: {field}: {reason}")]
    InvalidPattern {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl MaskError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern { .. } => "MASK_INVALID_PATTERN",
        }
    }
}
