use std::sync::Arc;

use async_trait::async_trait;
use custos_core::Did;
use custos_crypto::PublicKey;

use crate::did::{DidManager, DID_METHOD};
use crate::document::DidDocument;
use crate::error::IdentityError;

/// Resolves DIDs (or DID URLs) to their documents.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError>;
}

/// Resolves DIDs from the local registry.
pub struct LocalDidResolver {
    manager: Arc<DidManager>,
}

impl LocalDidResolver {
    pub fn new(manager: Arc<DidManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl DidResolver for LocalDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        self.manager
            .resolve_did(did)?
            .ok_or_else(|| IdentityError::DidNotFound(Did::strip_fragment(did).to_string()))
    }
}

/// Expands a `did:custos:<domain>:<base58 key>` identifier into its
/// document without a registry lookup. The signing key is part of the DID,
/// so any node can resolve DIDs created elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyDidResolver;

impl KeyDidResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn expand(did: &str) -> Result<DidDocument, IdentityError> {
        let did = Did::strip_fragment(did);
        let parsed = Did::new(did.to_string()).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        if parsed.method() != Some(DID_METHOD) {
            return Err(IdentityError::DidNotFound(did.to_string()));
        }
        let (domain, key) = parsed
            .identifier()
            .and_then(|id| id.rsplit_once(':'))
            .ok_or_else(|| IdentityError::InvalidDid(format!("{} has no key segment", did)))?;
        if domain.is_empty() {
            return Err(IdentityError::InvalidDid(format!("{} has no domain", did)));
        }
        let key = PublicKey::from_base58(key)
            .map_err(|e| IdentityError::InvalidDid(format!("{}: {}", did, e)))?;

        let mut doc = DidDocument::new(did.to_string(), key.to_base58());
        doc.created = None;
        Ok(doc)
    }
}

#[async_trait]
impl DidResolver for KeyDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        Self::expand(did)
    }
}

/// Tries multiple resolvers in order.
///
/// Returns the first successful resolution, or the last error.
#[derive(Default)]
pub struct CompositeDidResolver {
    resolvers: Vec<Arc<dyn DidResolver>>,
}

impl CompositeDidResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver to the chain.
    pub fn add_resolver(&mut self, resolver: Arc<dyn DidResolver>) {
        self.resolvers.push(resolver);
    }

    /// Builder form of `add_resolver`.
    pub fn with(mut self, resolver: Arc<dyn DidResolver>) -> Self {
        self.add_resolver(resolver);
        self
    }

    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }
}

#[async_trait]
impl DidResolver for CompositeDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let mut last_error = IdentityError::DidResolution("no resolvers configured".into());

        for resolver in &self.resolvers {
            match resolver.resolve(did).await {
                Ok(doc) => return Ok(doc),
                Err(e) => {
                    tracing::debug!(did = did, error = %e, "resolver failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::CreateDidOptions;
    use custos_core::MemoryStore;
    use custos_crypto::KeyManager;

    fn manager() -> Arc<DidManager> {
        Arc::new(DidManager::new(
            Arc::new(MemoryStore::new()),
            KeyManager::new(Arc::new(MemoryStore::new())),
        ))
    }

    #[tokio::test]
    async fn test_local_resolver_found() {
        let mgr = manager();
        let doc = mgr.create("example.com", CreateDidOptions::default()).unwrap();
        let resolver = LocalDidResolver::new(mgr);
        assert_eq!(resolver.resolve(&doc.id).await.unwrap().id, doc.id);
    }

    #[tokio::test]
    async fn test_local_resolver_did_url() {
        let mgr = manager();
        let doc = mgr.create("example.com", CreateDidOptions::default()).unwrap();
        let resolver = LocalDidResolver::new(mgr);
        let resolved = resolver.resolve(&format!("{}#key-1", doc.id)).await.unwrap();
        assert_eq!(resolved.id, doc.id);
    }

    #[tokio::test]
    async fn test_local_resolver_not_found() {
        let resolver = LocalDidResolver::new(manager());
        let result = resolver.resolve("did:custos:example.com:missing").await;
        assert!(matches!(result, Err(IdentityError::DidNotFound(_))));
    }

    #[tokio::test]
    async fn test_composite_resolver_fallback() {
        let empty = manager();
        let full = manager();
        let doc = full.create("example.com", CreateDidOptions::default()).unwrap();

        let composite = CompositeDidResolver::new()
            .with(Arc::new(LocalDidResolver::new(empty)))
            .with(Arc::new(LocalDidResolver::new(full)));
        assert_eq!(composite.resolver_count(), 2);
        assert_eq!(composite.resolve(&doc.id).await.unwrap().id, doc.id);
    }

    #[tokio::test]
    async fn test_composite_resolver_all_fail() {
        let composite = CompositeDidResolver::new()
            .with(Arc::new(LocalDidResolver::new(manager())))
            .with(Arc::new(LocalDidResolver::new(manager())));
        let result = composite.resolve("did:custos:example.com:unknown").await;
        assert!(matches!(result, Err(IdentityError::DidNotFound(_))));
    }

    #[tokio::test]
    async fn test_key_resolver_matches_registered_document() {
        let mgr = manager();
        let created = mgr.create("issuer.example.com%3A8070", CreateDidOptions::default()).unwrap();

        let expanded = KeyDidResolver::new().resolve(&format!("{}#key-1", created.id)).await.unwrap();
        assert_eq!(expanded.id, created.id);
        assert_eq!(expanded.public_key, created.public_key);
        assert_eq!(
            expanded.signing_key_id(custos_core::SignatureType::Ed25519Signature2018).unwrap(),
            format!("{}#key-1", created.id)
        );
    }

    #[tokio::test]
    async fn test_key_resolver_rejects_foreign_and_malformed() {
        let resolver = KeyDidResolver::new();
        assert!(matches!(
            resolver.resolve("did:example:abc").await,
            Err(IdentityError::DidNotFound(_))
        ));
        assert!(matches!(
            resolver.resolve("did:custos:example.com:not-base58-0OIl").await,
            Err(IdentityError::InvalidDid(_))
        ));
        assert!(matches!(
            resolver.resolve("did:custos:nodomain").await,
            Err(IdentityError::InvalidDid(_))
        ));
    }

    #[tokio::test]
    async fn test_composite_falls_back_to_key_resolver() {
        let issuer = manager();
        let doc = issuer.create("issuer.example.com", CreateDidOptions::default()).unwrap();

        let composite = CompositeDidResolver::new()
            .with(Arc::new(LocalDidResolver::new(manager())))
            .with(Arc::new(KeyDidResolver::new()));
        assert_eq!(composite.resolve(&doc.id).await.unwrap().public_key, doc.public_key);
    }

    #[tokio::test]
    async fn test_composite_resolver_empty() {
        let composite = CompositeDidResolver::default();
        assert!(matches!(
            composite.resolve("did:custos:example.com:abc").await,
            Err(IdentityError::DidResolution(_))
        ));
    }
}
