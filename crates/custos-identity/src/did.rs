use std::sync::Arc;

use async_trait::async_trait;
use custos_core::{Did, KeyValueStore, SignatureType};
use custos_crypto::KeyManager;

use crate::document::{DidDocument, ED25519_KEY_TYPE};
use crate::error::IdentityError;

/// DID method served by the local registrar.
pub const DID_METHOD: &str = "custos";

/// Options for DID creation.
#[derive(Debug, Clone, Copy)]
pub struct CreateDidOptions {
    pub signature_type: SignatureType,
}

impl Default for CreateDidOptions {
    fn default() -> Self {
        Self {
            signature_type: SignatureType::Ed25519Signature2018,
        }
    }
}

/// Creates new DIDs.
#[async_trait]
pub trait DidRegistrar: Send + Sync {
    /// Create and publish a new DID under `domain`.
    async fn create_did(
        &self,
        domain: &str,
        opts: CreateDidOptions,
    ) -> Result<DidDocument, IdentityError>;
}

/// Local DID registry. Documents live in a `KeyValueStore` keyed by DID;
/// private keys are generated and held by the `KeyManager`.
#[derive(Clone)]
pub struct DidManager {
    store: Arc<dyn KeyValueStore>,
    kms: KeyManager,
}

impl DidManager {
    pub fn new(store: Arc<dyn KeyValueStore>, kms: KeyManager) -> Self {
        Self { store, kms }
    }

    /// Key manager holding this registry's private keys.
    pub fn key_manager(&self) -> &KeyManager {
        &self.kms
    }

    /// Generate a key set and a DID document for it.
    ///
    /// The DID format is `did:custos:<domain>:<bs58 signing key>`. Colons in
    /// the domain (ports) are percent-encoded.
    pub fn create(&self, domain: &str, opts: CreateDidOptions) -> Result<DidDocument, IdentityError> {
        if domain.is_empty() {
            return Err(IdentityError::DidResolution("DID domain must not be empty".into()));
        }
        let keys = self.kms.create_key_set()?;
        let did = Did::from_parts(
            DID_METHOD,
            &format!("{}:{}", domain.replace(':', "%3A"), keys.signing_public_key),
        );
        let mut doc = DidDocument::new(did.uri().to_string(), keys.signing_public_key);
        if let Some(key) = doc.public_key.first_mut() {
            key.key_type = match opts.signature_type {
                SignatureType::Ed25519Signature2018 => ED25519_KEY_TYPE.to_string(),
            };
        }
        self.register(&doc)?;
        tracing::info!(did = %did, "DID created");
        Ok(doc)
    }

    /// Publish an externally created document. Fails if the DID exists.
    pub fn register(&self, doc: &DidDocument) -> Result<(), IdentityError> {
        Did::new(doc.id.clone()).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        let bytes =
            serde_json::to_vec(doc).map_err(|e| IdentityError::Serialization(e.to_string()))?;
        if self.store.put_if_absent(&doc.id, &bytes)?.is_some() {
            return Err(IdentityError::DuplicateDid(doc.id.clone()));
        }
        Ok(())
    }

    /// Look a DID up in the local registry.
    pub fn resolve_did(&self, did: &str) -> Result<Option<DidDocument>, IdentityError> {
        match self.store.get(Did::strip_fragment(did))? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| IdentityError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DidRegistrar for DidManager {
    async fn create_did(
        &self,
        domain: &str,
        opts: CreateDidOptions,
    ) -> Result<DidDocument, IdentityError> {
        self.create(domain, opts)
    }
}
