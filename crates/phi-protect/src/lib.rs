//! Protection orchestrator for PHI Shield.
//!
//! Ties detection, format-preserving encryption, masking, and role-based
//! visibility into one synchronous protect/restore pipeline with
//! session-scoped mappings and four-stage audit records. The engine never
//! performs I/O; network calls to the LLM happen in the caller between
//! [`ProtectionEngine::protect`] and
//! [`ProtectionEngine::record_response`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;

pub use audit::{AuditEntity, AuditRecord, AuditSink, MemorySink, TracingSink};
pub use config::{AuditSettings, MaskingRule, ProtectionConfig};
pub use engine::{CycleStage, ProtectionCycle, ProtectionEngine};
pub use error::{ProtectError, ProtectResult};
pub use session::{ProtectionMapping, SessionMappings, SessionStore};
