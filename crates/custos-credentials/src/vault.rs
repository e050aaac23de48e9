use std::sync::Arc;

use async_trait::async_trait;
use custos_core::KeyValueStore;
use custos_crypto::{pack, unpack, EncryptionKeyPair, PackedEnvelope};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::CredentialError;

/// Ciphertext record held by a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedDocument {
    pub id: String,
    pub sequence: u64,
    pub jwe: PackedEnvelope,
}

/// Plaintext envelope around a stored credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub id: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub content: StructuredContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredContent {
    /// The credential exactly as it was submitted.
    pub message: Box<RawValue>,
}

/// Per-tenant confidential document containers.
#[async_trait]
pub trait ConfidentialStore: Send + Sync {
    async fn create_vault(&self, name: &str) -> Result<(), CredentialError>;

    /// Write (or replace) a document. The vault must exist.
    async fn write_document(&self, vault: &str, doc: &EncryptedDocument) -> Result<(), CredentialError>;

    /// Read a document; `NotFound` when the vault or document is missing.
    async fn read_document(&self, vault: &str, doc_id: &str) -> Result<EncryptedDocument, CredentialError>;
}

/// `ConfidentialStore` over a `KeyValueStore`.
pub struct StoreBackedVault {
    store: Arc<dyn KeyValueStore>,
}

impl StoreBackedVault {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn marker_key(name: &str) -> String {
        format!("vault/{}", name)
    }

    fn document_key(vault: &str, doc_id: &str) -> String {
        format!("doc/{}/{}", vault, doc_id)
    }

    pub fn vault_exists(&self, name: &str) -> Result<bool, CredentialError> {
        Ok(self.store.get(&Self::marker_key(name))?.is_some())
    }
}

#[async_trait]
impl ConfidentialStore for StoreBackedVault {
    async fn create_vault(&self, name: &str) -> Result<(), CredentialError> {
        if self.store.put_if_absent(&Self::marker_key(name), b"{}")?.is_some() {
            return Err(CredentialError::InvalidRequest(format!("vault {} already exists", name)));
        }
        tracing::debug!(vault = name, "vault created");
        Ok(())
    }

    async fn write_document(&self, vault: &str, doc: &EncryptedDocument) -> Result<(), CredentialError> {
        if !self.vault_exists(vault)? {
            return Err(CredentialError::NotFound(format!("vault {}", vault)));
        }
        let bytes = serde_json::to_vec(doc).map_err(|e| CredentialError::Serialization(e.to_string()))?;
        self.store.put(&Self::document_key(vault, &doc.id), &bytes)?;
        Ok(())
    }

    async fn read_document(&self, vault: &str, doc_id: &str) -> Result<EncryptedDocument, CredentialError> {
        if !self.vault_exists(vault)? {
            return Err(CredentialError::NotFound(format!("vault {}", vault)));
        }
        let bytes = self
            .store
            .get(&Self::document_key(vault, doc_id))?
            .ok_or_else(|| CredentialError::NotFound(format!("document {} in vault {}", doc_id, vault)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CredentialError::StorageCorruption(format!("document {}: {}", doc_id, e)))
    }
}

/// Vault-compatible document id: 16 random bytes, base58.
pub fn generate_document_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bs58::encode(bytes).into_string()
}

/// Maps credential ids to vault document ids and keeps credentials
/// encrypted at rest under the service storage key.
#[derive(Clone)]
pub struct CredentialVault {
    mapping: Arc<dyn KeyValueStore>,
    vaults: Arc<dyn ConfidentialStore>,
    storage_key: EncryptionKeyPair,
}

impl CredentialVault {
    pub fn new(
        mapping: Arc<dyn KeyValueStore>,
        vaults: Arc<dyn ConfidentialStore>,
        storage_key: EncryptionKeyPair,
    ) -> Self {
        Self {
            mapping,
            vaults,
            storage_key,
        }
    }

    /// Encrypt and persist `credential` (raw JSON text) in `profile`'s vault.
    /// Returns the vault document id, which is stable per credential id.
    pub async fn store(&self, profile: &str, credential_id: &str, credential: &str) -> Result<String, CredentialError> {
        if profile.is_empty() {
            return Err(CredentialError::InvalidRequest("missing profile name".into()));
        }
        if credential_id.is_empty() {
            return Err(CredentialError::InvalidRequest("missing verifiable credential ID".into()));
        }

        // A mapping left behind by a failed write is reused by the next store.
        let fresh = generate_document_id();
        let doc_id = match self.mapping.put_if_absent(credential_id, fresh.as_bytes())? {
            None => fresh,
            Some(existing) => String::from_utf8(existing)
                .map_err(|e| CredentialError::StorageCorruption(format!("id mapping: {}", e)))?,
        };

        self.write(profile, &doc_id, credential).await?;

        tracing::info!(profile, credential_id, document_id = %doc_id, "credential stored");
        Ok(doc_id)
    }

    async fn write(&self, profile: &str, doc_id: &str, credential: &str) -> Result<(), CredentialError> {
        let message = RawValue::from_string(credential.to_string())
            .map_err(|e| CredentialError::MalformedField(format!("credential: {}", e)))?;
        let structured = StructuredDocument {
            id: doc_id.to_string(),
            meta: Map::new(),
            content: StructuredContent { message },
        };
        let plaintext = serde_json::to_vec(&structured)
            .map_err(|e| CredentialError::Serialization(e.to_string()))?;
        // No other recipients: the storage key packs for itself.
        let jwe = pack(&plaintext, &self.storage_key, &[self.storage_key.public_key()])?;
        let doc = EncryptedDocument {
            id: doc_id.to_string(),
            sequence: 0,
            jwe,
        };
        self.vaults.write_document(profile, &doc).await
    }

    /// Fetch and decrypt a stored credential, returning its text verbatim.
    pub async fn retrieve(&self, profile: &str, credential_id: &str) -> Result<String, CredentialError> {
        if profile.is_empty() {
            return Err(CredentialError::InvalidRequest("missing profile name".into()));
        }
        if credential_id.is_empty() {
            return Err(CredentialError::InvalidRequest("missing verifiable credential ID".into()));
        }

        let doc_id = self
            .mapping
            .get(credential_id)?
            .ok_or_else(|| CredentialError::NotFound(format!("credential {}", credential_id)))?;
        let doc_id = String::from_utf8(doc_id)
            .map_err(|e| CredentialError::StorageCorruption(format!("id mapping: {}", e)))?;

        let doc = self.vaults.read_document(profile, &doc_id).await?;
        let plaintext = unpack(&doc.jwe, &self.storage_key)
            .map_err(|e| CredentialError::StorageCorruption(format!("decrypted envelope unpacking failed: {}", e)))?;
        let structured: StructuredDocument = serde_json::from_slice(&plaintext).map_err(|e| {
            CredentialError::StorageCorruption(format!("structured document unmarshalling failed: {}", e))
        })?;
        Ok(structured.content.message.get().to_string())
    }
}
