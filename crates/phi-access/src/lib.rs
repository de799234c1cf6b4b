//! Role-based PHI visibility for PHI Shield.
//!
//! Maps a role and entity type to a visibility decision under a
//! default-deny policy table. Access level and the decrypt capability are
//! enforced independently; the decrypt capability is the stricter gate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod policy;
pub mod resolver;

pub use error::{AccessError, AccessResult};
pub use policy::{AccessLevel, RolePolicy, RoleSet};
pub use resolver::{resolve_visibility, Visibility};
