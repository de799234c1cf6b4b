//! Key material, per-domain subkey derivation, and epoch rotation.
//!
//! A single 32-byte master key is loaded per epoch. Every cipher domain
//! (entity type plus payload stream) works with a subkey derived from the
//! master via HMAC-SHA256, so values of different entity types never share
//! a permutation even when their payloads are identical.

use crate::{CipherError, CipherResult};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Master key length in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// Separation label mixed into every subkey derivation.
const SUBKEY_LABEL: &[u8] = b"phi-shield/domain/v1";

/// Secret bytes that are zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wraps raw key material.
    ///
    /// # Errors
    /// Returns an error unless the material is exactly [`MASTER_KEY_LEN`]
    /// bytes.
    pub fn new(material: Vec<u8>) -> CipherResult<Self> {
        if material.len() != MASTER_KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "expected {MASTER_KEY_LEN} bytes, got {}",
                material.len()
            )));
        }
        Ok(Self(material))
    }

    /// Derives a key from an arbitrary-length passphrase.
    #[must_use]
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self(digest.to_vec())
    }

    /// Generates a random key from the OS entropy source.
    #[must_use]
    pub fn generate() -> Self {
        let mut material = vec![0u8; MASTER_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut material);
        Self(material)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED, {} bytes])", self.0.len())
    }
}

/// One generation of key material.
///
/// Rotation adds a new epoch; older epochs stay resident so mappings
/// recorded under them remain decryptable until explicitly expired.
pub struct KeyEpoch {
    id: u32,
    master: SecretKey,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl KeyEpoch {
    fn new(id: u32, master: SecretKey) -> Self {
        Self {
            id,
            master,
            created_at: chrono::Utc::now(),
        }
    }

    /// Epoch identifier.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// When this epoch was created.
    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    /// Derives the 32-byte subkey for a cipher domain.
    #[must_use]
    pub fn subkey(&self, domain: &str) -> [u8; 32] {
        // HMAC key setup accepts any key length, so this cannot fail.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.master.as_slice())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(SUBKEY_LABEL);
        mac.update(&[0x00]);
        mac.update(domain.as_bytes());
        mac.finalize().into_bytes().into()
    }
}

impl fmt::Debug for KeyEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEpoch")
            .field("id", &self.id)
            .field("master", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Epoch registry. The newest epoch is active; older epochs are kept for
/// decryption only.
#[derive(Debug)]
pub struct KeyStore {
    epochs: Vec<KeyEpoch>,
    active: u32,
}

impl KeyStore {
    /// Creates a store with a single epoch holding `master`.
    #[must_use]
    pub fn new(master: SecretKey) -> Self {
        Self {
            epochs: vec![KeyEpoch::new(0, master)],
            active: 0,
        }
    }

    /// Id of the active epoch.
    #[must_use]
    pub fn active_epoch_id(&self) -> u32 {
        self.active
    }

    /// Returns the active epoch.
    #[must_use]
    pub fn active_epoch(&self) -> &KeyEpoch {
        // The active id always refers to a resident epoch.
        self.epochs
            .iter()
            .find(|e| e.id == self.active)
            .unwrap_or_else(|| unreachable!("active epoch is always resident"))
    }

    /// Looks up an epoch by id.
    ///
    /// # Errors
    /// Returns [`CipherError::UnknownEpoch`] if the epoch was never created
    /// or has been expired.
    pub fn epoch(&self, id: u32) -> CipherResult<&KeyEpoch> {
        self.epochs
            .iter()
            .find(|e| e.id == id)
            .ok_or(CipherError::UnknownEpoch(id))
    }

    /// Rotates to a new epoch with fresh random key material.
    ///
    /// Returns the new epoch id. Existing epochs remain available for
    /// decryption.
    pub fn rotate(&mut self) -> u32 {
        self.rotate_with(SecretKey::generate())
    }

    /// Rotates to a new epoch with caller-supplied key material.
    pub fn rotate_with(&mut self, master: SecretKey) -> u32 {
        let id = self.active + 1;
        self.epochs.push(KeyEpoch::new(id, master));
        self.active = id;
        tracing::info!(epoch = id, "rotated to new key epoch");
        id
    }

    /// Expires an old epoch, dropping its key material.
    ///
    /// # Errors
    /// Returns an error if the epoch is unknown or still active.
    pub fn expire(&mut self, id: u32) -> CipherResult<()> {
        if id == self.active {
            return Err(CipherError::InvalidKey(format!(
                "cannot expire active epoch {id}"
            )));
        }
        let before = self.epochs.len();
        self.epochs.retain(|e| e.id != id);
        if self.epochs.len() == before {
            return Err(CipherError::UnknownEpoch(id));
        }
        tracing::info!(epoch = id, "expired key epoch");
        Ok(())
    }
}
