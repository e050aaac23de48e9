//! Credential service: wires the lifecycle components over shared ports and
//! exposes one method per operation.

use std::sync::Arc;
use std::time::Duration;

use custos_core::{KeyValueStore, MemoryStore};
use custos_crypto::{EncryptionKeyPair, KeyManager};
use custos_identity::{
    CompositeDidResolver, DidManager, DidResolver, KeyDidResolver, LocalDidResolver, ResolverKeyFetcher,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::engine::{Ed25519SignatureEngine, SignatureEngine};
use crate::error::CredentialError;
use crate::issuer::{ComposeCredentialRequest, CreateCredentialRequest, CredentialIssuer, IssueCredentialRequest};
use crate::model::Credential;
use crate::profile::{CreateProfileRequest, Profile, ProfileManager, ProfileStore};
use crate::status::{
    CompositeStatusProvider, CredentialStatusList, HttpStatusListClient, StatusListProvider, StatusPage,
    StatusRegistry, DEFAULT_LIST_SIZE,
};
use crate::vault::{CredentialVault, StoreBackedVault};
use crate::verifier::{ChecksOutcome, CredentialVerifier, VerificationResult, VerifyChecksRequest};

/// Key-value stores backing each concern.
#[derive(Clone)]
pub struct ServicePorts {
    pub profiles: Arc<dyn KeyValueStore>,
    pub id_mapping: Arc<dyn KeyValueStore>,
    pub status: Arc<dyn KeyValueStore>,
    pub vaults: Arc<dyn KeyValueStore>,
    pub keys: Arc<dyn KeyValueStore>,
    pub dids: Arc<dyn KeyValueStore>,
}

impl ServicePorts {
    pub fn in_memory() -> Self {
        Self {
            profiles: Arc::new(MemoryStore::new()),
            id_mapping: Arc::new(MemoryStore::new()),
            status: Arc::new(MemoryStore::new()),
            vaults: Arc::new(MemoryStore::new()),
            keys: Arc::new(MemoryStore::new()),
            dids: Arc::new(MemoryStore::new()),
        }
    }
}

/// Startup settings. Immutable for the life of the service.
#[derive(Clone)]
pub struct ServiceSettings {
    /// Domain new profile DIDs are created under.
    pub domain: String,
    /// Public base URL; status list locators are `<host_url>/status/<n>`.
    pub host_url: String,
    pub list_size: usize,
    pub status_fetch_timeout: Duration,
    /// Packs and unpacks stored credentials.
    pub storage_key: EncryptionKeyPair,
}

impl ServiceSettings {
    pub fn new(domain: impl Into<String>, host_url: impl Into<String>, storage_key: EncryptionKeyPair) -> Self {
        Self {
            domain: domain.into(),
            host_url: host_url.into(),
            list_size: DEFAULT_LIST_SIZE,
            status_fetch_timeout: Duration::from_secs(10),
            storage_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreCredentialRequest {
    #[serde(default)]
    pub profile: String,
    /// The credential, as a JSON object or as a string holding one.
    pub credential: Box<RawValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub credential: Box<RawValue>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeypairResponse {
    pub public_key: String,
}

/// Raw credential text carried in a request field. A JSON string is
/// unwrapped, anything else is taken verbatim.
fn credential_text(raw: &RawValue) -> Result<String, CredentialError> {
    let text = raw.get().trim_start();
    if text.starts_with('"') {
        serde_json::from_str(text).map_err(|e| CredentialError::MalformedField(format!("credential: {}", e)))
    } else {
        Ok(raw.get().to_string())
    }
}

pub struct CredentialService {
    profiles: ProfileManager,
    issuer: CredentialIssuer,
    verifier: CredentialVerifier,
    status: Arc<CredentialStatusList>,
    vault: CredentialVault,
    dids: Arc<DidManager>,
    kms: KeyManager,
}

impl CredentialService {
    pub fn new(ports: ServicePorts, settings: ServiceSettings) -> Result<Self, CredentialError> {
        let kms = KeyManager::new(ports.keys);
        let dids = Arc::new(DidManager::new(ports.dids, kms.clone()));
        let resolver: Arc<dyn DidResolver> = Arc::new(
            CompositeDidResolver::new()
                .with(Arc::new(LocalDidResolver::new(dids.clone())))
                .with(Arc::new(KeyDidResolver::new())),
        );

        let engine: Arc<dyn SignatureEngine> = Arc::new(Ed25519SignatureEngine::new(resolver.clone(), kms.clone()));
        let status = Arc::new(CredentialStatusList::new(
            ports.status,
            engine.clone(),
            settings.host_url,
            settings.list_size,
        ));
        let status_sources = CompositeStatusProvider::new()
            .with(status.clone())
            .with(Arc::new(HttpStatusListClient::new(settings.status_fetch_timeout)?));

        let vaults = Arc::new(StoreBackedVault::new(ports.vaults));
        let profiles = ProfileManager::new(
            ProfileStore::new(ports.profiles),
            dids.clone(),
            resolver.clone(),
            vaults.clone(),
            kms.clone(),
            settings.domain,
        );

        Ok(Self {
            issuer: CredentialIssuer::new(status.clone(), engine.clone(), resolver.clone()),
            verifier: CredentialVerifier::new(
                engine,
                Arc::new(ResolverKeyFetcher::new(resolver)),
                Arc::new(status_sources),
            ),
            vault: CredentialVault::new(ports.id_mapping, vaults, settings.storage_key),
            profiles,
            status,
            dids,
            kms,
        })
    }

    pub fn did_manager(&self) -> &Arc<DidManager> {
        &self.dids
    }

    pub fn key_manager(&self) -> &KeyManager {
        &self.kms
    }

    pub async fn create_profile(&self, req: CreateProfileRequest) -> Result<Profile, CredentialError> {
        self.profiles.create_profile(req).await
    }

    pub fn get_profile(&self, name: &str) -> Result<Profile, CredentialError> {
        self.profiles.get_profile(name)
    }

    pub async fn issue(&self, req: CreateCredentialRequest) -> Result<Credential, CredentialError> {
        let profile = self.profiles.get_profile(&req.profile)?;
        self.issuer.issue(&profile, req).await
    }

    pub async fn compose_and_issue(&self, req: ComposeCredentialRequest) -> Result<Credential, CredentialError> {
        self.issuer.compose_and_issue(req).await
    }

    pub async fn issue_credential(&self, req: IssueCredentialRequest) -> Result<Credential, CredentialError> {
        self.issuer.issue_credential(req).await
    }

    pub async fn verify_credential(&self, raw: &[u8]) -> Result<VerificationResult, CredentialError> {
        self.verifier.verify_credential(raw).await
    }

    pub async fn verify_presentation(&self, raw: &[u8]) -> VerificationResult {
        self.verifier.verify_presentation(raw).await
    }

    pub async fn verify_checks(&self, req: VerifyChecksRequest) -> ChecksOutcome {
        self.verifier.verify_checks(req).await
    }

    /// Verify and store a credential in the profile's vault. Returns the
    /// vault document id.
    pub async fn store(&self, req: StoreCredentialRequest) -> Result<String, CredentialError> {
        let text = credential_text(&req.credential)?;
        let credential = self.verifier.check_proof(text.as_bytes()).await?;
        let credential_id = credential.id.unwrap_or_default();
        self.vault.store(&req.profile, &credential_id, &text).await
    }

    pub async fn retrieve(&self, profile: &str, credential_id: &str) -> Result<String, CredentialError> {
        self.vault.retrieve(profile, credential_id).await
    }

    /// Record a status change for a credential issued by this node. The
    /// issuing profile is found through the credential's issuer name.
    pub async fn update_status(&self, req: UpdateStatusRequest) -> Result<(), CredentialError> {
        let text = credential_text(&req.credential)?;
        let credential = self.verifier.check_proof(text.as_bytes()).await?;
        let name = credential
            .issuer
            .name()
            .ok_or_else(|| CredentialError::InvalidRequest("credential issuer has no profile name".into()))?;
        let profile = self.profiles.get_profile(name)?;
        self.status
            .update_status(&credential, &profile, &req.status, &req.status_reason)
            .await
    }

    /// Status list page `index` as published under `/status/<index>`.
    pub async fn status_page(&self, index: &str) -> Result<StatusPage, CredentialError> {
        self.status.fetch_page(&self.status.locator(index)).await
    }

    pub fn generate_keypair(&self) -> Result<GenerateKeypairResponse, CredentialError> {
        let keys = self.kms.create_key_set()?;
        Ok(GenerateKeypairResponse {
            public_key: keys.signing_public_key,
        })
    }
}
