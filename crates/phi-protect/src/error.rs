//! Aggregate error type for the protection pipeline.

use thiserror::Error;

/// Protection result type.
pub type ProtectResult<T> = Result<T, ProtectError>;

/// Errors from any stage of a protection cycle.
#[derive(Debug, Error)]
pub enum ProtectError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] phi_core::ConfigError),

    /// Detection error.
    #[error("detection error: {0}")]
    Detect(#[from] phi_detect::DetectError),

    /// Cipher error.
    #[error("cipher error: {0}")]
    Cipher(#[from] phi_cipher::CipherError),

    /// Masking configuration error.
    #[error("masking error: {0}")]
    Mask(#[from] phi_mask::MaskError),

    /// Access policy error.
    #[error("access error: {0}")]
    Access(#[from] phi_access::AccessError),

    /// The session is unknown to the mapping store.
    #[error("unknown session {0}")]
    UnknownSession(phi_core::SessionId),

    /// A cycle operation was attempted out of order.
    #[error("invalid cycle stage: expected {expected}, was {actual}")]
    InvalidStage {
        /// Stage the operation requires.
        expected: &'static str,
        /// Stage the cycle is actually in.
        actual: &'static str,
    },
}

impl ProtectError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "PROTECT_CONFIG",
            Self::Detect(_) => "PROTECT_DETECT",
            Self::Cipher(_) => "PROTECT_CIPHER",
            Self::Mask(_) => "PROTECT_MASK",
            Self::Access(_) => "PROTECT_ACCESS",
            Self::UnknownSession(_) => "PROTECT_UNKNOWN_SESSION",
            Self::InvalidStage { .. } => "PROTECT_INVALID_STAGE",
        }
    }
}
