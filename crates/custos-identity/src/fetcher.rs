use std::sync::Arc;

use async_trait::async_trait;
use custos_crypto::PublicKey;

use crate::error::IdentityError;
use crate::resolver::DidResolver;

/// Supplies the trusted public key for a proof's verification method.
#[async_trait]
pub trait PublicKeyFetcher: Send + Sync {
    /// Fetch the key identified by a DID URL such as `did:example:a#key-1`.
    async fn fetch(&self, verification_method: &str) -> Result<PublicKey, IdentityError>;
}

/// Fetches keys by resolving the controlling DID.
#[derive(Clone)]
pub struct ResolverKeyFetcher {
    resolver: Arc<dyn DidResolver>,
}

impl ResolverKeyFetcher {
    pub fn new(resolver: Arc<dyn DidResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl PublicKeyFetcher for ResolverKeyFetcher {
    async fn fetch(&self, verification_method: &str) -> Result<PublicKey, IdentityError> {
        let doc = self.resolver.resolve(verification_method).await?;
        let entry = doc
            .find_public_key(verification_method)
            .ok_or_else(|| IdentityError::KeyNotFound(verification_method.to_string()))?;
        Ok(PublicKey::from_base58(&entry.public_key_base58)?)
    }
}
