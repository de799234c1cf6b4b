//! Format-preserving encryption for PHI Shield.
//!
//! Structured values (SSNs, phone numbers, card numbers) are enciphered in
//! place with a keyed Feistel permutation that preserves length,
//! separators, and character classes. Person names go through keyed
//! deterministic substitution from curated lists instead. Key material is
//! organized into epochs so rotation never strands previously protected
//! values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod feistel;
pub mod fpe;
pub mod key;
pub mod names;
pub mod skeleton;

pub use error::{CipherError, CipherResult};
pub use fpe::{CipherConfig, CipherStrategy, DomainConstraint, FpeCipher};
pub use key::{KeyEpoch, KeyStore, SecretKey, MASTER_KEY_LEN};
pub use names::NameSubstituter;
pub use skeleton::{Payload, Skeleton, Slot};
