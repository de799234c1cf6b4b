//! Strongly-typed protection configuration.
//!
//! Mirrors the JSON shape produced by the configuration dashboard. Every
//! section is validated eagerly when a snapshot is built; a rejected
//! config never reaches a request. Snapshots are immutable and passed
//! explicitly into protect/restore, so concurrent in-flight requests each
//! see exactly one config version.

use crate::ProtectResult;
use phi_access::{AccessLevel, RolePolicy, RoleSet};
use phi_core::EntityType;
use phi_detect::DetectionPolicy;
use phi_mask::MaskPattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of the `maskingStrategies` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskingRule {
    /// Whether this rule is applied at all.
    pub enabled: bool,
    /// The mask pattern.
    pub pattern: MaskPattern,
    /// Contexts the rule applies in (informational).
    #[serde(default)]
    pub context: Vec<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// The `auditSettings` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSettings {
    /// Whether audit records are emitted.
    pub enabled: bool,
    /// Log level for audit output.
    pub log_level: String,
    /// Retention period, enforced by the consuming audit store.
    pub retention_days: u32,
    /// Whether sinks should alert in real time.
    pub real_time_alerts: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "INFO".to_string(),
            retention_days: 90,
            real_time_alerts: true,
        }
    }
}

/// A complete, versioned configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionConfig {
    /// Detection section.
    pub phi_detection: DetectionPolicy,
    /// Per-entity-type masking rules.
    pub masking_strategies: HashMap<EntityType, MaskingRule>,
    /// Audit section.
    #[serde(default)]
    pub audit_settings: AuditSettings,
    /// Role table.
    pub role_based_access: RoleSet,
}

impl ProtectionConfig {
    /// Parses and validates a JSON snapshot.
    ///
    /// # Errors
    /// Returns an error on unknown entity types, unknown pattern types,
    /// out-of-range thresholds, or role policies violating the decrypt
    /// invariant.
    pub fn from_json(json: &str) -> ProtectResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(phi_core::ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    /// Returns the first section-level violation found.
    pub fn validate(&self) -> ProtectResult<()> {
        self.phi_detection.validate()?;
        for rule in self.masking_strategies.values() {
            rule.pattern.validate()?;
        }
        self.role_based_access.validate()?;
        Ok(())
    }

    /// Masking rule for an entity type, if enabled.
    #[must_use]
    pub fn masking_rule(&self, entity_type: EntityType) -> Option<&MaskingRule> {
        self.masking_strategies
            .get(&entity_type)
            .filter(|rule| rule.enabled)
    }
}

impl Default for ProtectionConfig {
    /// The built-in healthcare demo defaults: four roles and per-entity
    /// masking rules.
    fn default() -> Self {
        let mut masking_strategies = HashMap::new();
        masking_strategies.insert(
            EntityType::Person,
            rule(
                {
                    let mut p = MaskPattern::show_first(1);
                    p.preserve_format = false;
                    p
                },
                "Show first initial, mask rest (e.g., J*** S***)",
            ),
        );
        masking_strategies.insert(
            EntityType::Email,
            rule(
                MaskPattern::email(1),
                "Show first char and domain (e.g., j***@company.com)",
            ),
        );
        masking_strategies.insert(
            EntityType::Phone,
            rule(
                MaskPattern::show_last(4),
                "Show last 4 digits (e.g., ***-***-1234)",
            ),
        );
        masking_strategies.insert(
            EntityType::Ssn,
            rule(
                MaskPattern::show_last(4),
                "Show last 4 digits (e.g., ***-**-1234)",
            ),
        );
        masking_strategies.insert(
            EntityType::CreditCard,
            rule(
                MaskPattern::show_first_last(4, 4),
                "Show first 4 and last 4 (e.g., 1234-****-****-5678)",
            ),
        );
        masking_strategies.insert(
            EntityType::DateOfBirth,
            rule(
                MaskPattern::show_last(4),
                "Show only year (e.g., **/**/1985)",
            ),
        );
        masking_strategies.insert(
            EntityType::Address,
            rule(
                {
                    let mut p = MaskPattern::show_last(15);
                    p.preserve_format = false;
                    p
                },
                "Show city/state only",
            ),
        );

        let mut roles = RoleSet::new();
        roles.insert(
            "doctor",
            RolePolicy {
                phi_access: AccessLevel::Full,
                can_decrypt: true,
                can_generate_pdf: true,
                allowed_entities: vec![
                    EntityType::Person,
                    EntityType::Email,
                    EntityType::Phone,
                    EntityType::Ssn,
                    EntityType::DateOfBirth,
                ],
            },
        );
        roles.insert(
            "nurse",
            RolePolicy {
                phi_access: AccessLevel::Masked,
                can_decrypt: false,
                can_generate_pdf: false,
                allowed_entities: vec![EntityType::Person, EntityType::Email],
            },
        );
        roles.insert(
            "supervisor",
            RolePolicy {
                phi_access: AccessLevel::Full,
                can_decrypt: true,
                can_generate_pdf: true,
                allowed_entities: vec![
                    EntityType::Person,
                    EntityType::Email,
                    EntityType::Phone,
                    EntityType::Ssn,
                    EntityType::CreditCard,
                    EntityType::DateOfBirth,
                ],
            },
        );
        roles.insert(
            "admin",
            RolePolicy {
                phi_access: AccessLevel::Full,
                can_decrypt: true,
                can_generate_pdf: true,
                allowed_entities: vec![
                    EntityType::Person,
                    EntityType::Email,
                    EntityType::Phone,
                    EntityType::Ssn,
                    EntityType::CreditCard,
                    EntityType::DateOfBirth,
                ],
            },
        );

        Self {
            phi_detection: DetectionPolicy::default(),
            masking_strategies,
            audit_settings: AuditSettings::default(),
            role_based_access: roles,
        }
    }
}

fn rule(pattern: MaskPattern, description: &str) -> MaskingRule {
    MaskingRule {
        enabled: true,
        pattern,
        context: Vec::new(),
        description: description.to_string(),
    }
}
