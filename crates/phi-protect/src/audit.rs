//! Audit records and sinks.
//!
//! Every protect/restore cycle emits one record carrying the four pipeline
//! stages in order: the raw prompt, the detected original data, the
//! protected text that went to the LLM, the raw LLM response, and the
//! role-filtered output. Enough for compliance review without re-running
//! the pipeline.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use phi_core::{AuditRecordId, CycleId, EntityType, SessionId};
use serde::{Deserialize, Serialize};

/// A detected value as captured for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntity {
    /// Entity type.
    pub entity_type: EntityType,
    /// The original value.
    pub value: String,
}

/// One cycle's audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record id.
    pub id: AuditRecordId,
    /// Cycle the record belongs to.
    pub cycle_id: CycleId,
    /// Session the cycle ran in.
    pub session_id: SessionId,
    /// When the record was emitted.
    pub created_at: DateTime<Utc>,
    /// Role the output was filtered for.
    pub role: String,
    /// Stage 1: the raw prompt as received.
    pub prompt: String,
    /// Stage 1b: the original values detected in the prompt.
    pub original_data: Vec<AuditEntity>,
    /// Stage 2: the protected text, post-FPE and pre-LLM.
    pub after_fpe_before_llm: String,
    /// Stage 3: the raw LLM response.
    pub nlp_response: String,
    /// Stage 4: the restored, role-filtered output.
    pub restored_with_original_data: String,
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Consumes one record.
    fn record(&self, record: &AuditRecord);
}

impl<T: AuditSink + ?Sized> AuditSink for std::sync::Arc<T> {
    fn record(&self, record: &AuditRecord) {
        (**self).record(record);
    }
}

/// Sink that emits records through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, record: &AuditRecord) {
        tracing::info!(
            audit_id = %record.id,
            cycle = %record.cycle_id,
            session = %record.session_id,
            role = %record.role,
            entities = record.original_data.len(),
            "protection cycle delivered"
        );
    }
}

/// Sink that retains records in memory, for tests and short-lived review.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: &AuditRecord) {
        self.records.lock().push(record.clone());
    }
}
