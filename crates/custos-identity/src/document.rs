use chrono::{DateTime, Utc};
use custos_core::{Did, SignatureType};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

pub const DID_CONTEXT: &str = "https://w3id.org/did/v1";
pub const ED25519_KEY_TYPE: &str = "Ed25519VerificationKey2018";

/// A public key listed in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyEntry {
    /// Key id, normally a DID URL such as `did:custos:example.com:abc#key-1`.
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub controller: String,
    pub public_key_base58: String,
}

/// Authentication method: a reference to a listed key, or an embedded key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Authentication {
    Reference(String),
    Embedded(PublicKeyEntry),
}

impl Authentication {
    pub fn key_id(&self) -> &str {
        match self {
            Self::Reference(id) => id,
            Self::Embedded(entry) => &entry.id,
        }
    }
}

/// DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,
    pub id: String,
    #[serde(default)]
    pub public_key: Vec<PublicKeyEntry>,
    #[serde(default)]
    pub authentication: Vec<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl DidDocument {
    /// Create a document with a single Ed25519 key that is also the
    /// authentication method.
    pub fn new(id: String, public_key_base58: String) -> Self {
        let key = PublicKeyEntry {
            id: format!("{}#key-1", id),
            key_type: ED25519_KEY_TYPE.to_string(),
            controller: id.clone(),
            public_key_base58,
        };
        Self {
            context: vec![DID_CONTEXT.to_string()],
            authentication: vec![Authentication::Reference(key.id.clone())],
            public_key: vec![key],
            id,
            created: Some(Utc::now()),
        }
    }

    /// Append a public key; returns its id.
    pub fn add_public_key(&mut self, key_type: &str, public_key_base58: &str) -> String {
        let id = format!("{}#key-{}", self.id, self.public_key.len() + 1);
        self.public_key.push(PublicKeyEntry {
            id: id.clone(),
            key_type: key_type.to_string(),
            controller: self.id.clone(),
            public_key_base58: public_key_base58.to_string(),
        });
        id
    }

    /// Pick the key a profile signs with.
    ///
    /// The first public key whose type belongs to the signature suite's
    /// verification-key family wins; otherwise the first authentication
    /// method; otherwise `NoUsableKey`.
    pub fn signing_key_id(&self, signature_type: SignatureType) -> Result<String, IdentityError> {
        let family = signature_type.verification_key_family();
        if let Some(key) = self.public_key.iter().find(|k| k.key_type.starts_with(family)) {
            return Ok(self.qualify_legacy_key_id(&key.id));
        }
        self.authentication
            .first()
            .map(|auth| auth.key_id().to_string())
            .ok_or_else(|| IdentityError::NoUsableKey(self.id.clone()))
    }

    /// Compatibility branch: some registries still publish bare key ids
    /// (`#key-1`) that are not DID URLs. Those get the document id prefixed.
    fn qualify_legacy_key_id(&self, key_id: &str) -> String {
        if Did::is_did(key_id) {
            key_id.to_string()
        } else {
            tracing::debug!(did = %self.id, key_id, "qualifying non-DID key id");
            format!("{}{}", self.id, key_id)
        }
    }

    /// Find a listed or embedded key by full id, or by `#fragment` match.
    pub fn find_public_key(&self, key_id: &str) -> Option<&PublicKeyEntry> {
        let fragment = key_id.find('#').map(|i| &key_id[i..]);
        let matches = |entry: &&PublicKeyEntry| {
            entry.id == key_id
                || fragment.is_some_and(|f| entry.id == f || (entry.id.ends_with(f) && !Did::is_did(&entry.id)))
        };
        self.public_key
            .iter()
            .find(matches)
            .or_else(|| {
                self.authentication.iter().find_map(|auth| match auth {
                    Authentication::Embedded(entry) => Some(entry).filter(matches),
                    Authentication::Reference(_) => None,
                })
            })
    }
}
