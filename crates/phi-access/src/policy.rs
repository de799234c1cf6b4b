//! Role policies, typically the `roleBasedAccess` config section.

use crate::{AccessError, AccessResult};
use phi_core::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How much PHI a role may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Original values, subject to the decrypt capability.
    Full,
    /// Masked values only.
    Masked,
    /// No PHI at all.
    None,
}

/// Per-role access policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePolicy {
    /// Access level for allowed entity types.
    pub phi_access: AccessLevel,
    /// Whether protected values may be restored to originals for this
    /// role. Enforced independently of `phi_access` and the stricter of
    /// the two gates.
    pub can_decrypt: bool,
    /// Whether the role may export PDF reports.
    #[serde(default, rename = "canGeneratePDF")]
    pub can_generate_pdf: bool,
    /// Entity types this role may see in any form. Types outside this
    /// list are denied outright.
    pub allowed_entities: Vec<EntityType>,
}

impl RolePolicy {
    /// Validates the policy.
    ///
    /// # Errors
    /// Returns an error when `can_decrypt` is granted without full access;
    /// decryption implies seeing originals, so the combination is a
    /// misconfiguration rather than a stricter policy.
    pub fn validate(&self, role: &str) -> AccessResult<()> {
        if self.can_decrypt && self.phi_access != AccessLevel::Full {
            return Err(AccessError::InvalidRolePolicy {
                role: role.to_string(),
                reason: "canDecrypt requires phiAccess=full".into(),
            });
        }
        Ok(())
    }

    /// True if the role may see `entity_type` in some form.
    #[must_use]
    pub fn allows(&self, entity_type: EntityType) -> bool {
        self.allowed_entities.contains(&entity_type)
    }
}

/// The full role table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: HashMap<String, RolePolicy>,
}

impl RoleSet {
    /// Creates an empty role set. Everything resolves to denied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a role.
    pub fn insert(&mut self, role: impl Into<String>, policy: RolePolicy) {
        self.roles.insert(role.into(), policy);
    }

    /// Looks up a role.
    #[must_use]
    pub fn get(&self, role: &str) -> Option<&RolePolicy> {
        self.roles.get(role)
    }

    /// Iterates over role names and policies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RolePolicy)> {
        self.roles.iter().map(|(name, policy)| (name.as_str(), policy))
    }

    /// Validates every role policy.
    ///
    /// # Errors
    /// Returns the first invariant violation found.
    pub fn validate(&self) -> AccessResult<()> {
        for (role, policy) in &self.roles {
            policy.validate(role)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_requires_full_access() {
        let policy = RolePolicy {
            phi_access: AccessLevel::Masked,
            can_decrypt: true,
            can_generate_pdf: false,
            allowed_entities: vec![EntityType::Ssn],
        };
        assert!(policy.validate("nurse").is_err());
    }

    #[test]
    fn test_role_set_validation_surfaces_bad_role() {
        let mut roles = RoleSet::new();
        roles.insert(
            "doctor",
            RolePolicy {
                phi_access: AccessLevel::Full,
                can_decrypt: true,
                can_generate_pdf: true,
                allowed_entities: vec![EntityType::Person],
            },
        );
        assert!(roles.validate().is_ok());

        roles.insert(
            "intern",
            RolePolicy {
                phi_access: AccessLevel::None,
                can_decrypt: true,
                can_generate_pdf: false,
                allowed_entities: vec![],
            },
        );
        assert!(roles.validate().is_err());
    }

    #[test]
    fn test_config_json_shape() {
        let json = r#"{
            "doctor": {
                "phiAccess": "full",
                "canDecrypt": true,
                "canGeneratePDF": true,
                "allowedEntities": ["PERSON", "SSN"]
            }
        }"#;
        let roles: RoleSet = serde_json::from_str(json).unwrap();
        let doctor = roles.get("doctor").unwrap();
        assert_eq!(doctor.phi_access, AccessLevel::Full);
        assert!(doctor.can_decrypt);
        assert!(doctor.allows(EntityType::Ssn));
        assert!(!doctor.allows(EntityType::Email));
    }
}
