//! The protection orchestrator.
//!
//! Drives one protect/restore cycle through its stages:
//!
//! ```text
//! Received -> Detected -> Protected -> ResponseReceived
//!          -> EntitiesRemapped -> RoleFiltered -> Delivered | Failed
//! ```
//!
//! Any error before the protected text is handed out moves the cycle to
//! `Failed` and nothing leaves the engine, so unprotected text is never
//! transmitted. Errors after the response is back degrade gracefully:
//! unmapped protected values stay in their protected form.

use crate::{
    audit::{AuditEntity, AuditRecord, AuditSink},
    config::ProtectionConfig,
    session::{ProtectionMapping, SessionStore},
    ProtectError, ProtectResult,
};
use phi_access::{resolve_visibility, Visibility};
use phi_cipher::{CipherError, CipherStrategy, FpeCipher, KeyStore, NameSubstituter, SecretKey};
use phi_core::{AuditRecordId, CycleId, EntityType, SessionId};
use phi_detect::Detector;
use phi_mask::{mask, MaskPattern};
use std::collections::HashMap;

/// Stage of a protection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    /// Prompt received, nothing processed.
    Received,
    /// Entities detected.
    Detected,
    /// Protected text produced; safe to transmit.
    Protected,
    /// External response recorded.
    ResponseReceived,
    /// Response mapped back against session mappings.
    EntitiesRemapped,
    /// Role filtering applied.
    RoleFiltered,
    /// Final output handed over and audited.
    Delivered,
    /// A stage failed; nothing was transmitted.
    Failed,
}

impl CycleStage {
    fn name(self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Detected => "Detected",
            Self::Protected => "Protected",
            Self::ResponseReceived => "ResponseReceived",
            Self::EntitiesRemapped => "EntitiesRemapped",
            Self::RoleFiltered => "RoleFiltered",
            Self::Delivered => "Delivered",
            Self::Failed => "Failed",
        }
    }
}

/// One protect/restore cycle.
#[derive(Debug)]
pub struct ProtectionCycle {
    id: CycleId,
    session_id: SessionId,
    stage: CycleStage,
    prompt: String,
    original_data: Vec<AuditEntity>,
    protected_text: Option<String>,
    response: Option<String>,
    restored: Option<String>,
    role: Option<String>,
}

impl ProtectionCycle {
    fn new(session_id: SessionId, prompt: String) -> Self {
        Self {
            id: CycleId::new(),
            session_id,
            stage: CycleStage::Received,
            prompt,
            original_data: Vec::new(),
            protected_text: None,
            response: None,
            restored: None,
            role: None,
        }
    }

    /// Cycle id.
    #[must_use]
    pub fn id(&self) -> CycleId {
        self.id
    }

    /// Session the cycle belongs to.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    /// The protected text, once the cycle reaches `Protected`.
    #[must_use]
    pub fn protected_text(&self) -> Option<&str> {
        self.protected_text.as_deref()
    }

    fn expect_stage(&self, expected: CycleStage) -> ProtectResult<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(ProtectError::InvalidStage {
                expected: expected.name(),
                actual: self.stage.name(),
            })
        }
    }
}

/// Protection engine: detector, cipher, key epochs, session mappings, and
/// audit sinks behind one synchronous API.
pub struct ProtectionEngine {
    detector: Detector,
    cipher: FpeCipher,
    keys: KeyStore,
    substituters: HashMap<u32, NameSubstituter>,
    sessions: SessionStore,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl ProtectionEngine {
    /// Creates an engine over fresh key material.
    #[must_use]
    pub fn new(master: SecretKey) -> Self {
        Self::with_cipher(master, FpeCipher::new())
    }

    /// Creates an engine with an explicitly configured cipher.
    #[must_use]
    pub fn with_cipher(master: SecretKey, cipher: FpeCipher) -> Self {
        let keys = KeyStore::new(master);
        let mut substituters = HashMap::new();
        let epoch = keys.active_epoch();
        substituters.insert(epoch.id(), NameSubstituter::new(epoch.subkey("PERSON/names")));
        Self {
            detector: Detector::new(),
            cipher,
            keys,
            substituters,
            sessions: SessionStore::new(),
            sinks: Vec::new(),
        }
    }

    /// Registers an audit sink.
    pub fn add_sink(&mut self, sink: Box<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    /// Session mapping store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Active key epoch id.
    #[must_use]
    pub fn active_epoch(&self) -> u32 {
        self.keys.active_epoch_id()
    }

    /// Rotates key material into a new epoch. Values protected under
    /// earlier epochs stay restorable through their session mappings.
    pub fn rotate_keys(&mut self) -> u32 {
        let id = self.keys.rotate();
        let epoch = self.keys.active_epoch();
        self.substituters
            .insert(id, NameSubstituter::new(epoch.subkey("PERSON/names")));
        id
    }

    /// Expires an old epoch's key material and substitution table.
    ///
    /// # Errors
    /// Returns an error for the active epoch or an unknown one.
    pub fn expire_epoch(&mut self, id: u32) -> ProtectResult<()> {
        self.keys.expire(id)?;
        self.substituters.remove(&id);
        Ok(())
    }

    /// Starts a cycle for `prompt` in `session_id`.
    #[must_use]
    pub fn begin_cycle(&self, session_id: SessionId, prompt: impl Into<String>) -> ProtectionCycle {
        ProtectionCycle::new(session_id, prompt.into())
    }

    /// Detects and protects every entity in the cycle's prompt.
    ///
    /// Returns the protected text, safe for external transmission. On any
    /// error the cycle moves to `Failed` and no text is returned.
    ///
    /// # Errors
    /// Propagates detection and cipher errors.
    pub fn protect(
        &self,
        cycle: &mut ProtectionCycle,
        config: &ProtectionConfig,
    ) -> ProtectResult<String> {
        cycle.expect_stage(CycleStage::Received)?;
        match self.protect_inner(cycle, config) {
            Ok(text) => Ok(text),
            Err(err) => {
                cycle.stage = CycleStage::Failed;
                tracing::error!(
                    cycle = %cycle.id,
                    code = err.code(),
                    "protection failed; aborting before transmission"
                );
                Err(err)
            }
        }
    }

    fn protect_inner(
        &self,
        cycle: &mut ProtectionCycle,
        config: &ProtectionConfig,
    ) -> ProtectResult<String> {
        let entities = self.detector.detect(&cycle.prompt, &config.phi_detection);
        cycle.original_data = entities
            .iter()
            .map(|e| AuditEntity {
                entity_type: e.entity_type,
                value: e.value.clone(),
            })
            .collect();
        cycle.stage = CycleStage::Detected;
        tracing::debug!(cycle = %cycle.id, count = entities.len(), "entities detected");

        let epoch_id = self.keys.active_epoch_id();
        let mut protected = cycle.prompt.clone();
        let session = self.sessions.session(cycle.session_id);
        let mut mappings = session.lock();

        // Back-to-front so earlier spans keep their byte offsets.
        for entity in entities.iter().rev() {
            let (value, strategy) = self.protect_value(epoch_id, entity.entity_type, &entity.value)?;
            mappings.insert(ProtectionMapping {
                entity_type: entity.entity_type,
                original_value: entity.value.clone(),
                protected_value: value.clone(),
                strategy,
                key_epoch: epoch_id,
                created_at: chrono::Utc::now(),
            });
            protected.replace_range(entity.start..entity.end, &value);
        }

        cycle.protected_text = Some(protected.clone());
        cycle.stage = CycleStage::Protected;
        Ok(protected)
    }

    /// Protects one value under a specific key epoch.
    ///
    /// # Errors
    /// Propagates cipher errors; an entity type without a configured
    /// domain is rejected rather than passed through.
    pub fn protect_value(
        &self,
        epoch_id: u32,
        entity_type: EntityType,
        value: &str,
    ) -> ProtectResult<(String, CipherStrategy)> {
        let strategy = self.cipher.config().strategy(entity_type)?;
        let protected = match strategy {
            CipherStrategy::AlgebraicFpe => {
                self.cipher
                    .encrypt_with_epoch(&self.keys, epoch_id, entity_type, value)?
            }
            CipherStrategy::LookupSubstitution => self
                .substituters
                .get(&epoch_id)
                .ok_or(CipherError::UnknownEpoch(epoch_id))?
                .substitute(value),
        };
        Ok((protected, strategy))
    }

    /// Records the external response for the cycle.
    ///
    /// # Errors
    /// Fails if the cycle has not produced protected text yet.
    pub fn record_response(
        &self,
        cycle: &mut ProtectionCycle,
        response: impl Into<String>,
    ) -> ProtectResult<()> {
        cycle.expect_stage(CycleStage::Protected)?;
        cycle.response = Some(response.into());
        cycle.stage = CycleStage::ResponseReceived;
        Ok(())
    }

    /// Maps protected values in the response back and applies per-entity
    /// role filtering.
    ///
    /// Each session mapping found in the response is replaced according to
    /// the role's visibility: the original value, a fresh mask of the
    /// original, or left protected when denied. Protected-looking values
    /// with no mapping stay untouched and are logged, never a crash on the
    /// response path.
    ///
    /// # Errors
    /// Fails only on stage misuse; restoration itself degrades rather
    /// than erroring.
    pub fn restore(
        &self,
        cycle: &mut ProtectionCycle,
        config: &ProtectionConfig,
        role: &str,
    ) -> ProtectResult<String> {
        cycle.expect_stage(CycleStage::ResponseReceived)?;
        let response = cycle.response.clone().unwrap_or_default();

        let session = self.sessions.session(cycle.session_id);
        let mappings = session.lock();

        // Anomaly check: detected values in the response that match no
        // recorded mapping are left in whatever form they arrived in.
        for entity in self.detector.detect(&response, &config.phi_detection) {
            if mappings.original_for(&entity.value).is_none() {
                tracing::warn!(
                    cycle = %cycle.id,
                    entity_type = %entity.entity_type,
                    "unmapped protected-looking value in response; leaving untouched"
                );
            }
        }
        cycle.stage = CycleStage::EntitiesRemapped;

        let mut restored = response;
        for mapping in mappings.by_length() {
            if !restored.contains(&mapping.protected_value) {
                continue;
            }
            let visibility =
                resolve_visibility(&config.role_based_access, role, mapping.entity_type);
            let replacement = match visibility {
                Visibility::Original => mapping.original_value.clone(),
                Visibility::Masked => self.masked_form(config, mapping),
                Visibility::Denied => continue,
            };
            restored = restored.replace(&mapping.protected_value, &replacement);
        }

        cycle.role = Some(role.to_string());
        cycle.restored = Some(restored.clone());
        cycle.stage = CycleStage::RoleFiltered;
        Ok(restored)
    }

    /// Fresh mask of a mapping's original value, from the entity type's
    /// configured rule or a full mask when none is enabled.
    fn masked_form(&self, config: &ProtectionConfig, mapping: &ProtectionMapping) -> String {
        match config.masking_rule(mapping.entity_type) {
            Some(rule) => mask(&mapping.original_value, &rule.pattern),
            None => mask(&mapping.original_value, &MaskPattern::full_mask()),
        }
    }

    /// Completes the cycle, emitting its audit record to every sink.
    ///
    /// # Errors
    /// Fails if the cycle has not been restored yet.
    pub fn deliver(
        &self,
        cycle: &mut ProtectionCycle,
        config: &ProtectionConfig,
    ) -> ProtectResult<AuditRecord> {
        cycle.expect_stage(CycleStage::RoleFiltered)?;
        cycle.stage = CycleStage::Delivered;

        let record = AuditRecord {
            id: AuditRecordId::new(),
            cycle_id: cycle.id,
            session_id: cycle.session_id,
            created_at: chrono::Utc::now(),
            role: cycle.role.clone().unwrap_or_default(),
            prompt: cycle.prompt.clone(),
            original_data: cycle.original_data.clone(),
            after_fpe_before_llm: cycle.protected_text.clone().unwrap_or_default(),
            nlp_response: cycle.response.clone().unwrap_or_default(),
            restored_with_original_data: cycle.restored.clone().unwrap_or_default(),
        };
        if config.audit_settings.enabled {
            for sink in &self.sinks {
                sink.record(&record);
            }
        }
        Ok(record)
    }

    /// Restores a single protected value from a session's mappings.
    ///
    /// # Errors
    /// Returns [`ProtectError::UnknownSession`] for a session that never
    /// protected anything, and a cipher error when the value has no
    /// recorded original.
    pub fn restore_value(&self, session_id: SessionId, protected: &str) -> ProtectResult<String> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(ProtectError::UnknownSession(session_id))?;
        let mappings = session.lock();
        mappings
            .original_for(protected)
            .map(|m| m.original_value.clone())
            .ok_or_else(|| CipherError::NotInvertible.into())
    }
}

impl std::fmt::Debug for ProtectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionEngine")
            .field("active_epoch", &self.keys.active_epoch_id())
            .field("sessions", &self.sessions.len())
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}
