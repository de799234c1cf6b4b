//! PII/PHI entity types.

use serde::{Deserialize, Serialize};

/// Types of PII/PHI entities the engine recognizes.
///
/// This is a closed set: configuration naming an unknown type fails at load
/// time rather than silently defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Person's name.
    Person,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Social Security Number.
    Ssn,
    /// Credit card number.
    CreditCard,
    /// Date of birth.
    DateOfBirth,
    /// Physical address.
    Address,
    /// Health insurance ID.
    InsuranceId,
    /// Medical record number.
    MedicalRecordNumber,
    /// Custom entity type (requires explicit cipher configuration).
    Custom,
}

impl EntityType {
    /// All entity types, in detection priority order.
    pub const ALL: [Self; 10] = [
        Self::Ssn,
        Self::CreditCard,
        Self::Email,
        Self::Phone,
        Self::DateOfBirth,
        Self::InsuranceId,
        Self::MedicalRecordNumber,
        Self::Address,
        Self::Person,
        Self::Custom,
    ];

    /// Returns the category of this entity type.
    #[must_use]
    pub const fn category(&self) -> EntityCategory {
        match self {
            Self::Person | Self::Email | Self::Phone | Self::Address => {
                EntityCategory::ContactInformation
            }
            Self::Ssn => EntityCategory::GovernmentId,
            Self::CreditCard => EntityCategory::Financial,
            Self::DateOfBirth | Self::InsuranceId | Self::MedicalRecordNumber => {
                EntityCategory::Health
            }
            Self::Custom => EntityCategory::Other,
        }
    }

    /// Returns the baseline risk level of this entity type.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        match self {
            Self::Ssn | Self::CreditCard | Self::MedicalRecordNumber | Self::InsuranceId => {
                RiskLevel::High
            }
            Self::Person | Self::Phone | Self::DateOfBirth | Self::Address | Self::Custom => {
                RiskLevel::Medium
            }
            Self::Email => RiskLevel::Low,
        }
    }

    /// Returns the config-facing label (`PERSON`, `CREDIT_CARD`, ...).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Ssn => "SSN",
            Self::CreditCard => "CREDIT_CARD",
            Self::DateOfBirth => "DATE_OF_BIRTH",
            Self::Address => "ADDRESS",
            Self::InsuranceId => "INSURANCE_ID",
            Self::MedicalRecordNumber => "MEDICAL_RECORD_NUMBER",
            Self::Custom => "CUSTOM",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Contact information (name, email, phone, address).
    ContactInformation,
    /// Government-issued identifiers.
    GovernmentId,
    /// Financial data.
    Financial,
    /// Health and medical data.
    Health,
    /// Other/custom.
    Other,
}

/// Risk level of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

/// A detected PII/PHI occurrence within a text blob.
///
/// Created per detection pass; immutable; discarded once the protection pass
/// completes (it is not persisted beyond the audit record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Detected entity type.
    pub entity_type: EntityType,
    /// The matched text.
    pub value: String,
    /// Start byte offset in the source text.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f64,
    /// Surrounding context, if extracted.
    pub context: Option<String>,
}

impl Entity {
    /// Creates a new entity.
    #[must_use]
    pub fn new(
        entity_type: EntityType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        confidence: f64,
    ) -> Self {
        Self {
            entity_type,
            value: value.into(),
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
            context: None,
        }
    }

    /// Returns the span length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if this span overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_labels_roundtrip() {
        for ty in EntityType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.label()));
            let back: EntityType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ty);
        }
    }

    #[test]
    fn test_unknown_entity_type_rejected() {
        let result: Result<EntityType, _> = serde_json::from_str("\"FAVORITE_COLOR\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(EntityType::Ssn.risk_level(), RiskLevel::High);
        assert_eq!(EntityType::Email.risk_level(), RiskLevel::Low);
        assert_eq!(EntityType::Person.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_overlap() {
        let a = Entity::new(EntityType::Phone, "555-123-4567", 10, 22, 0.9);
        let b = Entity::new(EntityType::Ssn, "123-45-6789", 14, 25, 0.9);
        let c = Entity::new(EntityType::Email, "a@b.com", 30, 37, 0.9);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }
}
