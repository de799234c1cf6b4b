//! Cipher error types.

use phi_core::EntityType;
use thiserror::Error;

/// Cipher result type.
pub type CipherResult<T> = Result<T, CipherError>;

/// Cipher errors.
#[derive(Debug, Error)]
pub enum CipherError {
    /// No key material is loaded for the requested epoch.
    #[error("unknown key epoch {0}")]
    UnknownEpoch(u32),

    /// Key material is malformed or too short.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The entity type has no configured cipher domain.
    #[error("no cipher domain configured for entity type {0}")]
    UnsupportedEntityType(EntityType),

    /// Cycle-walking failed to land on a valid domain element.
    #[error("domain walk exhausted after {attempts} attempts for {entity_type}")]
    DomainExhausted {
        /// Entity type being enciphered.
        entity_type: EntityType,
        /// Number of permutation applications tried.
        attempts: u32,
    },

    /// The value cannot be enciphered under the configured domain constraint.
    #[error("value violates {entity_type} domain constraint: {reason}")]
    DomainViolation {
        /// Entity type being enciphered.
        entity_type: EntityType,
        /// What failed.
        reason: String,
    },

    /// A substitute value has no recorded original.
    #[error("no original recorded for substitute value")]
    NotInvertible,
}

impl CipherError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownEpoch(_) => "CIPHER_UNKNOWN_EPOCH",
            Self::InvalidKey(_) => "CIPHER_INVALID_KEY",
            Self::UnsupportedEntityType(_) => "CIPHER_UNSUPPORTED_ENTITY_TYPE",
            Self::DomainExhausted { .. } => "CIPHER_DOMAIN_EXHAUSTED",
            Self::DomainViolation { .. } => "CIPHER_DOMAIN_VIOLATION",
            Self::NotInvertible => "CIPHER_NOT_INVERTIBLE",
        }
    }
}
