use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use custos_core::{Did, KeyValueStore, SignatureRepresentation, SignatureType};
use custos_crypto::{KeyManager, KeyPair};
use custos_identity::{CreateDidOptions, DidDocument, DidRegistrar, DidResolver};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;
use crate::vault::ConfidentialStore;

/// Issuing identity of one tenant. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub uri: String,
    pub did: String,
    pub signature_type: SignatureType,
    #[serde(default)]
    pub signature_representation: SignatureRepresentation,
    /// DID URL of the key credentials are signed with.
    pub creator: String,
    pub created: DateTime<Utc>,
}

/// Body of a profile-creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub signature_type: String,
    #[serde(default)]
    pub signature_representation: Option<SignatureRepresentation>,
    /// Existing DID to issue under. A new one is created when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    /// Base58 Ed25519 seed for an existing DID whose key this node does not
    /// hold yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_private_key: Option<String>,
}

impl CreateProfileRequest {
    fn validate(&self) -> Result<SignatureType, CredentialError> {
        if self.name.is_empty() {
            return Err(CredentialError::InvalidProfileRequest("missing profile name".into()));
        }
        if self.uri.is_empty() {
            return Err(CredentialError::InvalidProfileRequest("missing URI information".into()));
        }
        if self.signature_type.is_empty() {
            return Err(CredentialError::InvalidProfileRequest("missing signature type".into()));
        }
        url::Url::parse(&self.uri)
            .map_err(|e| CredentialError::InvalidProfileRequest(format!("invalid uri: {}", e)))?;
        self.signature_type
            .parse()
            .map_err(|e: custos_core::CoreError| CredentialError::InvalidProfileRequest(e.to_string()))
    }
}

/// Profile repository over a `KeyValueStore`, keyed by profile name.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save a new profile. Names are unique; an existing profile is never
    /// overwritten.
    pub fn save(&self, profile: &Profile) -> Result<(), CredentialError> {
        let bytes = serde_json::to_vec(profile)
            .map_err(|e| CredentialError::Serialization(e.to_string()))?;
        if self.store.put_if_absent(&profile.name, &bytes)?.is_some() {
            return Err(CredentialError::InvalidProfileRequest(format!(
                "profile {} already exists",
                profile.name
            )));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<Profile>, CredentialError> {
        match self.store.get(name)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CredentialError::Serialization(format!("stored profile {}: {}", name, e))),
            None => Ok(None),
        }
    }
}

/// Creates and loads profiles.
#[derive(Clone)]
pub struct ProfileManager {
    store: ProfileStore,
    registrar: Arc<dyn DidRegistrar>,
    resolver: Arc<dyn DidResolver>,
    vaults: Arc<dyn ConfidentialStore>,
    kms: KeyManager,
    domain: String,
}

impl ProfileManager {
    pub fn new(
        store: ProfileStore,
        registrar: Arc<dyn DidRegistrar>,
        resolver: Arc<dyn DidResolver>,
        vaults: Arc<dyn ConfidentialStore>,
        kms: KeyManager,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registrar,
            resolver,
            vaults,
            kms,
            domain: domain.into(),
        }
    }

    pub async fn create_profile(&self, req: CreateProfileRequest) -> Result<Profile, CredentialError> {
        let signature_type = req.validate()?;
        if self.store.get(&req.name)?.is_some() {
            return Err(CredentialError::InvalidProfileRequest(format!(
                "profile {} already exists",
                req.name
            )));
        }

        let doc = self.identity_for(&req, signature_type).await?;
        let creator = doc.signing_key_id(signature_type)?;

        let profile = Profile {
            name: req.name,
            uri: req.uri,
            did: doc.id,
            signature_type,
            signature_representation: req.signature_representation.unwrap_or_default(),
            creator,
            created: Utc::now().trunc_subsecs(0),
        };
        self.store.save(&profile)?;
        self.vaults.create_vault(&profile.name).await?;

        tracing::info!(profile = %profile.name, did = %profile.did, "profile created");
        Ok(profile)
    }

    async fn identity_for(
        &self,
        req: &CreateProfileRequest,
        signature_type: SignatureType,
    ) -> Result<DidDocument, CredentialError> {
        let did = match req.did.as_deref().filter(|d| !d.is_empty()) {
            Some(did) => did,
            None => {
                return self
                    .registrar
                    .create_did(&self.domain, CreateDidOptions { signature_type })
                    .await
                    .map_err(|e| CredentialError::IdentityResolution(format!("failed to create did doc: {}", e)));
            }
        };
        Did::new(did.to_string()).map_err(|e| CredentialError::InvalidProfileRequest(e.to_string()))?;

        if let Some(seed) = &req.did_private_key {
            let bytes = bs58::decode(seed)
                .into_vec()
                .map_err(|e| CredentialError::InvalidProfileRequest(format!("invalid didPrivateKey: {}", e)))?;
            let keypair = KeyPair::from_seed_slice(&bytes)
                .map_err(|e| CredentialError::InvalidProfileRequest(format!("invalid didPrivateKey: {}", e)))?;
            self.kms.import_signing_key(&keypair)?;
        }

        self.resolver
            .resolve(did)
            .await
            .map_err(|e| CredentialError::IdentityResolution(format!("failed to resolve did: {}", e)))
    }

    pub fn get_profile(&self, name: &str) -> Result<Profile, CredentialError> {
        self.store
            .get(name)?
            .ok_or_else(|| CredentialError::ProfileNotFound(name.to_string()))
    }
}
