//! Detection error types.

use thiserror::Error;

/// Detection result type.
pub type DetectResult<T> = Result<T, DetectError>;

/// Detection errors.
#[derive(Debug, Error)]
pub enum DetectError {
    /// A pattern failed to compile.
    #[error("pattern compilation error for '{name}': {source}")]
    PatternCompilation {
        /// Pattern name.
        name: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The detection policy is malformed.
    #[error("malformed detection policy: {0}")]
    MalformedPolicy(String),
}

impl DetectError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PatternCompilation { .. } => "DETECT_PATTERN_COMPILATION",
            Self::MalformedPolicy(_) => "DETECT_MALFORMED_POLICY",
        }
    }
}
