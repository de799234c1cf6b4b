//! # PHI Core
//!
//! Core domain types for PHI Shield, the PII/PHI protection engine:
//! - The closed `EntityType` enum and detected `Entity` spans
//! - Type-safe identifiers (newtype pattern)
//! - Shared configuration error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, EntityCategory, EntityType, RiskLevel};
pub use error::{ConfigError, ConfigResult};
pub use id::*;
