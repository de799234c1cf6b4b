//! Session-scoped protection mappings.
//!
//! Mappings are retained per session so a later turn's LLM response can be
//! restored against an earlier turn's substitutions. Sessions never share
//! mappings; each session carries its own lock, so concurrent requests on
//! different sessions never contend.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use phi_cipher::CipherStrategy;
use phi_core::{EntityType, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One protected-value association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionMapping {
    /// Entity type of the value.
    pub entity_type: EntityType,
    /// The original value.
    pub original_value: String,
    /// The protected counterpart.
    pub protected_value: String,
    /// How the protected value was produced.
    pub strategy: CipherStrategy,
    /// Key epoch the value was protected under.
    pub key_epoch: u32,
    /// When the mapping was recorded.
    pub created_at: DateTime<Utc>,
}

/// The mappings of one session.
#[derive(Debug, Default)]
pub struct SessionMappings {
    entries: Vec<ProtectionMapping>,
}

impl SessionMappings {
    /// Records a mapping. A protected value already present is not
    /// re-recorded; within one session and key epoch protection is
    /// deterministic, so the existing entry is necessarily identical.
    pub fn insert(&mut self, mapping: ProtectionMapping) {
        let exists = self
            .entries
            .iter()
            .any(|m| m.protected_value == mapping.protected_value && m.key_epoch == mapping.key_epoch);
        if !exists {
            self.entries.push(mapping);
        }
    }

    /// Looks up the original behind a protected value.
    #[must_use]
    pub fn original_for(&self, protected_value: &str) -> Option<&ProtectionMapping> {
        self.entries
            .iter()
            .find(|m| m.protected_value == protected_value)
    }

    /// All entries, longest protected value first. Replacement in this
    /// order prevents a shorter protected value matching inside a longer
    /// one.
    #[must_use]
    pub fn by_length(&self) -> Vec<&ProtectionMapping> {
        let mut entries: Vec<&ProtectionMapping> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.protected_value.len().cmp(&a.protected_value.len()));
        entries
    }

    /// Number of recorded mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Store of per-session mappings.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionMappings>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mappings of `session_id`, creating the session on first
    /// use.
    #[must_use]
    pub fn session(&self, session_id: SessionId) -> Arc<Mutex<SessionMappings>> {
        if let Some(existing) = self.sessions.read().get(&session_id) {
            return Arc::clone(existing);
        }
        Arc::clone(
            self.sessions
                .write()
                .entry(session_id)
                .or_default(),
        )
    }

    /// Returns the mappings of `session_id` only if the session exists.
    #[must_use]
    pub fn get(&self, session_id: SessionId) -> Option<Arc<Mutex<SessionMappings>>> {
        self.sessions.read().get(&session_id).map(Arc::clone)
    }

    /// Drops a session and its mappings.
    pub fn remove(&self, session_id: SessionId) {
        self.sessions.write().remove(&session_id);
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// True if no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(original: &str, protected: &str) -> ProtectionMapping {
        ProtectionMapping {
            entity_type: EntityType::Ssn,
            original_value: original.to_string(),
            protected_value: protected.to_string(),
            strategy: CipherStrategy::AlgebraicFpe,
            key_epoch: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_dedupes_protected_value() {
        let mut mappings = SessionMappings::default();
        mappings.insert(mapping("123-45-6789", "804-12-3391"));
        mappings.insert(mapping("123-45-6789", "804-12-3391"));
        assert_eq!(mappings.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut mappings = SessionMappings::default();
        mappings.insert(mapping("123-45-6789", "804-12-3391"));
        assert_eq!(
            mappings.original_for("804-12-3391").unwrap().original_value,
            "123-45-6789"
        );
        assert!(mappings.original_for("000-00-0000").is_none());
    }

    #[test]
    fn test_by_length_orders_longest_first() {
        let mut mappings = SessionMappings::default();
        mappings.insert(mapping("12", "98"));
        mappings.insert(mapping("123-45-6789", "804-12-3391"));
        let ordered = mappings.by_length();
        assert_eq!(ordered[0].protected_value, "804-12-3391");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = SessionId::new();
        let b = SessionId::new();

        store.session(a).lock().insert(mapping("x", "y"));
        assert_eq!(store.session(a).lock().len(), 1);
        assert!(store.session(b).lock().is_empty());
    }

    #[test]
    fn test_remove_session() {
        let store = SessionStore::new();
        let id = SessionId::new();
        store.session(id).lock().insert(mapping("x", "y"));
        store.remove(id);
        assert!(store.session(id).lock().is_empty());
    }
}
