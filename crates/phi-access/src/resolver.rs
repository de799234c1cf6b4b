//! Visibility resolution.

use crate::{AccessLevel, RoleSet};
use phi_core::EntityType;
use serde::{Deserialize, Serialize};

/// What a role is allowed to see for one entity occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// The original value may be shown.
    Original,
    /// A masked rendering may be shown.
    Masked,
    /// Nothing may be shown.
    Denied,
}

/// Resolves what `role` may see of `entity_type`.
///
/// Pure lookup with default-deny: an unknown role or an entity type
/// outside the role's allow list resolves to [`Visibility::Denied`]
/// regardless of access level. A role without the decrypt capability
/// caps out at [`Visibility::Masked`] even with full access.
#[must_use]
pub fn resolve_visibility(roles: &RoleSet, role: &str, entity_type: EntityType) -> Visibility {
    let Some(policy) = roles.get(role) else {
        tracing::debug!(role, "unknown role; denying");
        return Visibility::Denied;
    };
    if !policy.allows(entity_type) {
        return Visibility::Denied;
    }
    match policy.phi_access {
        AccessLevel::Full if policy.can_decrypt => Visibility::Original,
        AccessLevel::Full | AccessLevel::Masked => Visibility::Masked,
        AccessLevel::None => Visibility::Denied,
    }
}
