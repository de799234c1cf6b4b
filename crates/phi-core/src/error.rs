//! Shared configuration error types.

use thiserror::Error;

/// Result type alias using `ConfigError`.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
///
/// These are caught at load time; a configuration that fails validation is
/// never handed to a request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field path.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A role policy violates a structural invariant.
    #[error("invalid role policy for '{role}': {reason}")]
    InvalidRolePolicy {
        /// Role name.
        role: String,
        /// Violated invariant.
        reason: String,
    },

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Convenience constructor for an invalid field value.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            Self::InvalidRolePolicy { .. } => "CONFIG_INVALID_ROLE",
            Self::Parse(_) => "CONFIG_PARSE",
        }
    }
}
