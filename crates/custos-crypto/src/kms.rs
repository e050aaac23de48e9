use std::sync::Arc;

use custos_core::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::encryption::EncryptionKeyPair;
use crate::error::CryptoError;
use crate::keys::KeyPair;

const SIGNING_PREFIX: &str = "sign:";
const ENCRYPTION_PREFIX: &str = "enc:";

/// Public halves of a freshly created key set, base58 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySet {
    pub signing_public_key: String,
    pub encryption_public_key: String,
}

/// Key manager. Secret material is held in a `KeyValueStore` and looked up
/// by the base58 encoding of the matching public key.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyValueStore>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Create a signing key and an encryption key and persist both.
    pub fn create_key_set(&self) -> Result<KeySet, CryptoError> {
        let signing = KeyPair::generate();
        let encryption = EncryptionKeyPair::generate();
        let set = KeySet {
            signing_public_key: self.import_signing_key(&signing)?,
            encryption_public_key: self.import_encryption_key(&encryption)?,
        };
        tracing::debug!(signing_key = %set.signing_public_key, "key set created");
        Ok(set)
    }

    /// Persist a signing key; returns its base58 public key.
    pub fn import_signing_key(&self, keypair: &KeyPair) -> Result<String, CryptoError> {
        let public = keypair.public_key().to_base58();
        self.store
            .put(&format!("{}{}", SIGNING_PREFIX, public), &keypair.seed()[..])?;
        Ok(public)
    }

    /// Persist an encryption key; returns its base58 public key.
    pub fn import_encryption_key(&self, keypair: &EncryptionKeyPair) -> Result<String, CryptoError> {
        let public = keypair.public_key_base58();
        self.store
            .put(&format!("{}{}", ENCRYPTION_PREFIX, public), &keypair.secret_bytes()[..])?;
        Ok(public)
    }

    /// Look up the signing keypair for a base58 public key.
    pub fn signing_key(&self, public_base58: &str) -> Result<KeyPair, CryptoError> {
        let seed = self
            .store
            .get(&format!("{}{}", SIGNING_PREFIX, public_base58))?
            .ok_or_else(|| CryptoError::KeyNotFound(public_base58.to_string()))?;
        KeyPair::from_seed_slice(&seed)
    }

    /// Look up the encryption keypair for a base58 public key.
    pub fn encryption_key(&self, public_base58: &str) -> Result<EncryptionKeyPair, CryptoError> {
        let secret = self
            .store
            .get(&format!("{}{}", ENCRYPTION_PREFIX, public_base58))?
            .ok_or_else(|| CryptoError::KeyNotFound(public_base58.to_string()))?;
        EncryptionKeyPair::from_bytes(&secret)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager").finish_non_exhaustive()
    }
}
