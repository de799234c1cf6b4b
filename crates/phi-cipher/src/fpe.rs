//! Format-preserving encryption over entity values.
//!
//! Values are split into a format skeleton plus digit and letter payload
//! streams ([`crate::skeleton`]); each stream is permuted by the Feistel
//! core under a subkey derived for the entity type, stream, and payload
//! length. Separators, length, and character classes are preserved
//! exactly, and `decrypt(encrypt(v)) == v` for every supported value.

use crate::{
    feistel,
    skeleton::{Payload, Skeleton, DIGIT_RADIX, LETTER_RADIX},
    CipherError, CipherResult, KeyEpoch, KeyStore,
};
use chrono::NaiveDate;
use phi_core::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on cycle-walking iterations before giving up. With the
/// valid-date fraction of an 8-digit space around 3.7%, a miss at this
/// bound has negligible probability.
const MAX_WALK: u32 = 1_000;

/// How a protected value is produced for an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CipherStrategy {
    /// Feistel permutation of the payload streams.
    AlgebraicFpe,
    /// Keyed deterministic lookup into a curated substitute list.
    /// Invertible only through the recorded reverse index.
    LookupSubstitution,
}

/// Extra restriction on the output domain of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainConstraint {
    /// Any value matching the input's skeleton.
    None,
    /// Output must parse as a real calendar date in the input's layout.
    /// Implemented by cycle-walking the Feistel permutation.
    ValidDate,
}

/// Per-entity-type cipher configuration.
#[derive(Debug, Clone)]
pub struct CipherConfig {
    strategies: HashMap<EntityType, CipherStrategy>,
    constraints: HashMap<EntityType, DomainConstraint>,
}

impl Default for CipherConfig {
    fn default() -> Self {
        let mut strategies = HashMap::new();
        for entity_type in EntityType::ALL {
            // Custom types have no domain until one is registered.
            if entity_type == EntityType::Custom {
                continue;
            }
            let strategy = if entity_type == EntityType::Person {
                CipherStrategy::LookupSubstitution
            } else {
                CipherStrategy::AlgebraicFpe
            };
            strategies.insert(entity_type, strategy);
        }
        Self {
            strategies,
            constraints: HashMap::new(),
        }
    }
}

impl CipherConfig {
    /// Strategy for an entity type.
    ///
    /// # Errors
    /// Returns an error for entity types with no configured domain, such as
    /// unregistered custom types.
    pub fn strategy(&self, entity_type: EntityType) -> CipherResult<CipherStrategy> {
        self.strategies
            .get(&entity_type)
            .copied()
            .ok_or(CipherError::UnsupportedEntityType(entity_type))
    }

    /// Registers or overrides the strategy for an entity type.
    pub fn set_strategy(&mut self, entity_type: EntityType, strategy: CipherStrategy) {
        self.strategies.insert(entity_type, strategy);
    }

    /// Domain constraint for an entity type. Unconstrained by default.
    #[must_use]
    pub fn constraint(&self, entity_type: EntityType) -> DomainConstraint {
        self.constraints
            .get(&entity_type)
            .copied()
            .unwrap_or(DomainConstraint::None)
    }

    /// Opts an entity type into a domain constraint.
    pub fn set_constraint(&mut self, entity_type: EntityType, constraint: DomainConstraint) {
        self.constraints.insert(entity_type, constraint);
    }
}

/// Format-preserving cipher bound to a key store.
#[derive(Debug)]
pub struct FpeCipher {
    config: CipherConfig,
}

impl FpeCipher {
    /// Creates a cipher with the default per-type configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CipherConfig::default(),
        }
    }

    /// Creates a cipher with explicit configuration.
    #[must_use]
    pub fn with_config(config: CipherConfig) -> Self {
        Self { config }
    }

    /// Cipher configuration.
    #[must_use]
    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Encrypts `value` under the active epoch of `keys`.
    ///
    /// The empty string is its own ciphertext. Values with no encipherable
    /// payload (all separators) also pass through unchanged.
    ///
    /// # Errors
    /// Returns an error for unsupported entity types or if a constrained
    /// domain walk exhausts its budget.
    pub fn encrypt(
        &self,
        keys: &KeyStore,
        entity_type: EntityType,
        value: &str,
    ) -> CipherResult<String> {
        self.encrypt_with_epoch(keys, keys.active_epoch_id(), entity_type, value)
    }

    /// Encrypts `value` under a specific key epoch.
    ///
    /// # Errors
    /// As [`Self::encrypt`], plus [`CipherError::UnknownEpoch`].
    pub fn encrypt_with_epoch(
        &self,
        keys: &KeyStore,
        epoch_id: u32,
        entity_type: EntityType,
        value: &str,
    ) -> CipherResult<String> {
        self.apply(keys, epoch_id, entity_type, value, Direction::Encrypt)
    }

    /// Decrypts a value produced by [`Self::encrypt`] under the active
    /// epoch.
    ///
    /// # Errors
    /// As [`Self::encrypt`].
    pub fn decrypt(
        &self,
        keys: &KeyStore,
        entity_type: EntityType,
        value: &str,
    ) -> CipherResult<String> {
        self.decrypt_with_epoch(keys, keys.active_epoch_id(), entity_type, value)
    }

    /// Decrypts a value produced under a specific key epoch.
    ///
    /// # Errors
    /// As [`Self::encrypt`], plus [`CipherError::UnknownEpoch`].
    pub fn decrypt_with_epoch(
        &self,
        keys: &KeyStore,
        epoch_id: u32,
        entity_type: EntityType,
        value: &str,
    ) -> CipherResult<String> {
        self.apply(keys, epoch_id, entity_type, value, Direction::Decrypt)
    }

    fn apply(
        &self,
        keys: &KeyStore,
        epoch_id: u32,
        entity_type: EntityType,
        value: &str,
        direction: Direction,
    ) -> CipherResult<String> {
        let strategy = self.config.strategy(entity_type)?;
        if strategy != CipherStrategy::AlgebraicFpe {
            return Err(CipherError::DomainViolation {
                entity_type,
                reason: "lookup substitution types are handled by the name substituter".into(),
            });
        }
        if value.is_empty() {
            return Ok(String::new());
        }

        let epoch = keys.epoch(epoch_id)?;
        let (skeleton, payload) = Skeleton::split(value);
        if skeleton.is_all_separators() {
            return Ok(value.to_string());
        }

        match self.config.constraint(entity_type) {
            DomainConstraint::None => {
                let out = permute(epoch, entity_type, payload, direction);
                Ok(skeleton.assemble(&out))
            }
            DomainConstraint::ValidDate => {
                walk_valid_date(epoch, entity_type, &skeleton, payload, direction)
            }
        }
    }
}

impl Default for FpeCipher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Applies the Feistel core to both payload streams. The tweak binds the
/// entity type, stream name, and stream length, and the subkey binds the
/// entity type and stream, so equal payloads of different types or lengths
/// never share a permutation.
fn permute(
    epoch: &KeyEpoch,
    entity_type: EntityType,
    mut payload: Payload,
    direction: Direction,
) -> Payload {
    let streams: [(&str, &mut Vec<u8>, u8); 2] = [
        ("digits", &mut payload.digits, DIGIT_RADIX),
        ("letters", &mut payload.letters, LETTER_RADIX),
    ];

    for (stream, symbols, radix) in streams {
        if symbols.is_empty() {
            continue;
        }
        let subkey = epoch.subkey(&format!("{entity_type}/{stream}"));
        let tweak = format!("{entity_type}/{stream}/{}", symbols.len());
        match direction {
            Direction::Encrypt => feistel::encrypt(&subkey, tweak.as_bytes(), radix, symbols),
            Direction::Decrypt => feistel::decrypt(&subkey, tweak.as_bytes(), radix, symbols),
        }
    }
    payload
}

/// Cycle-walks the permutation until the assembled value is a real
/// calendar date. Encryption and decryption walk the same cycle from
/// opposite directions, so the restricted map stays a bijection over
/// valid dates.
fn walk_valid_date(
    epoch: &KeyEpoch,
    entity_type: EntityType,
    skeleton: &Skeleton,
    payload: Payload,
    direction: Direction,
) -> CipherResult<String> {
    let original = skeleton.assemble(&payload);
    if parse_date(&original).is_none() {
        return Err(CipherError::DomainViolation {
            entity_type,
            reason: format!("'{original}' is not a recognizable calendar date"),
        });
    }

    let mut current = payload;
    for _ in 0..MAX_WALK {
        current = permute(epoch, entity_type, current, direction);
        let candidate = skeleton.assemble(&current);
        if parse_date(&candidate).is_some() {
            return Ok(candidate);
        }
    }
    Err(CipherError::DomainExhausted {
        entity_type,
        attempts: MAX_WALK,
    })
}

/// Recognizes `MM/DD/YYYY`, `MM-DD-YYYY`, and `YYYY-MM-DD`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    for format in ["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecretKey;

    fn store() -> KeyStore {
        KeyStore::new(SecretKey::from_passphrase("test key"))
    }

    #[test]
    fn test_round_trip_preserves_format() {
        let keys = store();
        let cipher = FpeCipher::new();
        let cases = [
            (EntityType::Ssn, "123-45-6789"),
            (EntityType::Phone, "(555) 123-4567"),
            (EntityType::CreditCard, "4532-1234-5678-9012"),
            (EntityType::Email, "john.doe@example.com"),
            (EntityType::InsuranceId, "INS-12345678"),
            (EntityType::MedicalRecordNumber, "MRN: 00482913"),
        ];

        for (entity_type, value) in cases {
            let encrypted = cipher.encrypt(&keys, entity_type, value).unwrap();
            assert_ne!(encrypted, value, "{value} should change");
            assert_eq!(encrypted.len(), value.len());
            for (o, e) in value.chars().zip(encrypted.chars()) {
                assert_eq!(o.is_ascii_digit(), e.is_ascii_digit());
                assert_eq!(o.is_ascii_uppercase(), e.is_ascii_uppercase());
                assert_eq!(o.is_ascii_lowercase(), e.is_ascii_lowercase());
                if !o.is_ascii_alphanumeric() {
                    assert_eq!(o, e, "separator must survive in {value}");
                }
            }

            let decrypted = cipher.decrypt(&keys, entity_type, &encrypted).unwrap();
            assert_eq!(decrypted, value);
        }
    }

    #[test]
    fn test_deterministic_within_epoch() {
        let keys = store();
        let cipher = FpeCipher::new();
        let a = cipher.encrypt(&keys, EntityType::Ssn, "123-45-6789").unwrap();
        let b = cipher.encrypt(&keys, EntityType::Ssn, "123-45-6789").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_entity_type_domain_separation() {
        let keys = store();
        let cipher = FpeCipher::new();
        let as_ssn = cipher.encrypt(&keys, EntityType::Ssn, "123456789").unwrap();
        let as_phone = cipher.encrypt(&keys, EntityType::Phone, "123456789").unwrap();
        assert_ne!(as_ssn, as_phone);
    }

    #[test]
    fn test_empty_value_is_identity() {
        let keys = store();
        let cipher = FpeCipher::new();
        assert_eq!(cipher.encrypt(&keys, EntityType::Ssn, "").unwrap(), "");
    }

    #[test]
    fn test_all_separator_value_passes_through() {
        let keys = store();
        let cipher = FpeCipher::new();
        assert_eq!(cipher.encrypt(&keys, EntityType::Ssn, "--- ---").unwrap(), "--- ---");
    }

    #[test]
    fn test_single_digit_round_trip() {
        let keys = store();
        let cipher = FpeCipher::new();
        let encrypted = cipher.encrypt(&keys, EntityType::Phone, "7").unwrap();
        assert_eq!(encrypted.len(), 1);
        assert_eq!(cipher.decrypt(&keys, EntityType::Phone, &encrypted).unwrap(), "7");
    }

    #[test]
    fn test_person_rejected_by_fpe() {
        let keys = store();
        let cipher = FpeCipher::new();
        assert!(cipher.encrypt(&keys, EntityType::Person, "Ramesh Kumar").is_err());
    }

    #[test]
    fn test_custom_type_rejected_without_registration() {
        let keys = store();
        let cipher = FpeCipher::new();
        let err = cipher
            .encrypt(&keys, EntityType::Custom, "whatever")
            .unwrap_err();
        assert!(matches!(err, CipherError::UnsupportedEntityType(_)));

        let mut config = CipherConfig::default();
        config.set_strategy(EntityType::Custom, CipherStrategy::AlgebraicFpe);
        let cipher = FpeCipher::with_config(config);
        assert!(cipher.encrypt(&keys, EntityType::Custom, "whatever").is_ok());
    }

    #[test]
    fn test_plain_date_fpe_ignores_calendar() {
        let keys = store();
        let cipher = FpeCipher::new();
        // Default constraint is None: output digits are free to form an
        // invalid calendar date, round trip still holds.
        let encrypted = cipher
            .encrypt(&keys, EntityType::DateOfBirth, "03/15/1985")
            .unwrap();
        assert_eq!(encrypted.len(), 10);
        assert_eq!(
            cipher.decrypt(&keys, EntityType::DateOfBirth, &encrypted).unwrap(),
            "03/15/1985"
        );
    }

    #[test]
    fn test_valid_date_constraint_round_trip() {
        let keys = store();
        let mut config = CipherConfig::default();
        config.set_constraint(EntityType::DateOfBirth, DomainConstraint::ValidDate);
        let cipher = FpeCipher::with_config(config);

        for value in ["03/15/1985", "1985-03-15", "12-31-1999"] {
            let encrypted = cipher.encrypt(&keys, EntityType::DateOfBirth, value).unwrap();
            assert!(parse_date(&encrypted).is_some(), "{encrypted} must be a real date");
            assert_eq!(
                cipher.decrypt(&keys, EntityType::DateOfBirth, &encrypted).unwrap(),
                value
            );
        }
    }

    #[test]
    fn test_valid_date_constraint_rejects_non_dates() {
        let keys = store();
        let mut config = CipherConfig::default();
        config.set_constraint(EntityType::DateOfBirth, DomainConstraint::ValidDate);
        let cipher = FpeCipher::with_config(config);

        assert!(matches!(
            cipher.encrypt(&keys, EntityType::DateOfBirth, "99/99/9999"),
            Err(CipherError::DomainViolation { .. })
        ));
    }

    #[test]
    fn test_rotation_changes_ciphertext_old_epoch_still_decrypts() {
        let mut keys = store();
        let cipher = FpeCipher::new();

        let old_epoch = keys.active_epoch_id();
        let old_ct = cipher.encrypt(&keys, EntityType::Ssn, "123-45-6789").unwrap();

        keys.rotate();
        let new_ct = cipher.encrypt(&keys, EntityType::Ssn, "123-45-6789").unwrap();
        assert_ne!(old_ct, new_ct);

        let recovered = cipher
            .decrypt_with_epoch(&keys, old_epoch, EntityType::Ssn, &old_ct)
            .unwrap();
        assert_eq!(recovered, "123-45-6789");
    }

    #[test]
    fn test_unknown_epoch_errors() {
        let keys = store();
        let cipher = FpeCipher::new();
        assert!(matches!(
            cipher.encrypt_with_epoch(&keys, 42, EntityType::Ssn, "123-45-6789"),
            Err(CipherError::UnknownEpoch(42))
        ));
    }
}
