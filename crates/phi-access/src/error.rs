//! Access control error types.

use thiserror::Error;

/// Access result type.
pub type AccessResult<T> = Result<T, AccessError>;

/// Access control errors. Resolution itself never fails (unknown input
/// resolves to denied); these surface only when loading policies.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A role policy violates a load-time invariant.
    #[error("invalid policy for role '{role}': {reason}")]
    InvalidRolePolicy {
        /// Role name.
        role: String,
        /// Violated invariant.
        reason: String,
    },
}

impl AccessError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRolePolicy { .. } => "ACCESS_INVALID_ROLE_POLICY",
        }
    }
}
