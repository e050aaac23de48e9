use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use custos_core::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::json;
use tokio::sync::Mutex;

use crate::engine::{SignatureEngine, SigningOptions};
use crate::error::CredentialError;
use crate::model::{Credential, Issuer, OneOrMany, StatusReference, STATUS_CREDENTIAL_TYPE, VC_TYPE};
use crate::profile::Profile;

/// Default number of credentials per status list page.
pub const DEFAULT_LIST_SIZE: usize = 50;

const CURSOR_KEY: &str = "cursor";
const PAGE_PREFIX: &str = "page/";

/// One page of a status list: signed status credentials, kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPage {
    pub id: String,
    #[serde(default)]
    pub vc: Vec<Box<RawValue>>,
}

impl StatusPage {
    fn new(id: String) -> Self {
        Self { id, vc: Vec::new() }
    }

    /// Find the status credential whose subject is `credential_id`.
    pub fn entry_for(&self, credential_id: &str) -> Option<&RawValue> {
        self.vc
            .iter()
            .find(|raw| status_subject_id(raw).as_deref() == Some(credential_id))
            .map(|raw| &**raw)
    }
}

fn status_subject_id(raw: &RawValue) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    value
        .get("credentialSubject")?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Allocates status references and records status changes.
#[async_trait]
pub trait StatusRegistry: Send + Sync {
    async fn allocate_status_reference(&self) -> Result<StatusReference, CredentialError>;

    async fn update_status(
        &self,
        credential: &Credential,
        profile: &Profile,
        status: &str,
        reason: &str,
    ) -> Result<(), CredentialError>;
}

/// Reads status list pages by locator.
#[async_trait]
pub trait StatusListProvider: Send + Sync {
    async fn fetch_page(&self, locator: &str) -> Result<StatusPage, CredentialError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Cursor {
    index: u64,
    allocated: usize,
}

/// Status list kept in a `KeyValueStore`, in fixed-size pages served at
/// `<host_url>/status/<n>`.
pub struct CredentialStatusList {
    store: Arc<dyn KeyValueStore>,
    engine: Arc<dyn SignatureEngine>,
    host_url: String,
    list_size: usize,
    lock: Mutex<()>,
}

impl CredentialStatusList {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn SignatureEngine>,
        host_url: impl Into<String>,
        list_size: usize,
    ) -> Self {
        Self {
            store,
            engine,
            host_url: host_url.into().trim_end_matches('/').to_string(),
            list_size: list_size.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Locator of page `index`.
    pub fn locator(&self, index: &str) -> String {
        format!("{}/status/{}", self.host_url, index)
    }

    fn page_key(locator: &str) -> String {
        format!("{}{}", PAGE_PREFIX, locator)
    }

    fn load_page(&self, locator: &str) -> Result<Option<StatusPage>, CredentialError> {
        match self.store.get(&Self::page_key(locator))? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CredentialError::StorageCorruption(format!("status list {}: {}", locator, e))),
            None => Ok(None),
        }
    }

    fn save_page(&self, page: &StatusPage) -> Result<(), CredentialError> {
        let bytes = serde_json::to_vec(page).map_err(|e| CredentialError::Serialization(e.to_string()))?;
        self.store.put(&Self::page_key(&page.id), &bytes)?;
        Ok(())
    }

    fn next_reference(&self) -> Result<StatusReference, CredentialError> {
        let mut cursor: Cursor = match self.store.get(CURSOR_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CredentialError::StorageCorruption(format!("status cursor: {}", e)))?,
            None => Cursor::default(),
        };
        if cursor.index == 0 || cursor.allocated >= self.list_size {
            cursor.index += 1;
            cursor.allocated = 0;
            let page = StatusPage::new(self.locator(&cursor.index.to_string()));
            self.save_page(&page)?;
            tracing::debug!(locator = %page.id, "status list page opened");
        }
        cursor.allocated += 1;
        let bytes = serde_json::to_vec(&cursor).map_err(|e| CredentialError::Serialization(e.to_string()))?;
        self.store.put(CURSOR_KEY, &bytes)?;
        Ok(StatusReference::new(self.locator(&cursor.index.to_string())))
    }
}

#[async_trait]
impl StatusRegistry for CredentialStatusList {
    async fn allocate_status_reference(&self) -> Result<StatusReference, CredentialError> {
        let _guard = self.lock.lock().await;
        self.next_reference()
            .map_err(|e| CredentialError::StatusAllocation(e.to_string()))
    }

    async fn update_status(
        &self,
        credential: &Credential,
        profile: &Profile,
        status: &str,
        reason: &str,
    ) -> Result<(), CredentialError> {
        let reference = credential
            .credential_status
            .as_ref()
            .ok_or_else(|| CredentialError::InvalidRequest("credential has no status reference".into()))?;
        let credential_id = credential
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CredentialError::InvalidRequest("missing verifiable credential ID".into()))?;

        let status_vc = Credential {
            context: credential.context.clone(),
            id: None,
            types: OneOrMany::Many(vec![VC_TYPE.into(), STATUS_CREDENTIAL_TYPE.into()]),
            issuer: Issuer::Id(profile.did.clone()),
            issuance_date: Utc::now().trunc_subsecs(0),
            expiration_date: None,
            credential_subject: json!({
                "id": credential_id,
                "currentStatus": status,
                "statusReason": reason,
            }),
            credential_status: None,
            evidence: None,
            terms_of_use: None,
            proof: None,
            extra: Default::default(),
        };
        let opts = SigningOptions::assertion(
            profile.signature_type,
            profile.signature_representation,
            profile.creator.clone(),
        );
        let signed = self.engine.sign_credential(status_vc, &opts).await?;
        let raw = serde_json::value::to_raw_value(&signed)
            .map_err(|e| CredentialError::Serialization(e.to_string()))?;

        let _guard = self.lock.lock().await;
        let mut page = self
            .load_page(&reference.id)?
            .ok_or_else(|| CredentialError::NotFound(format!("status list {}", reference.id)))?;
        page.vc.retain(|entry| status_subject_id(entry).as_deref() != Some(credential_id));
        page.vc.push(raw);
        self.save_page(&page)?;

        tracing::info!(credential_id, status, profile = %profile.name, "credential status updated");
        Ok(())
    }
}

#[async_trait]
impl StatusListProvider for CredentialStatusList {
    async fn fetch_page(&self, locator: &str) -> Result<StatusPage, CredentialError> {
        self.load_page(locator)?
            .ok_or_else(|| CredentialError::NotFound(format!("status list {}", locator)))
    }
}

/// Fetches status list pages over HTTP.
#[derive(Clone)]
pub struct HttpStatusListClient {
    client: reqwest::Client,
}

impl HttpStatusListClient {
    pub fn new(timeout: Duration) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::StatusCheck(format!("http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusListProvider for HttpStatusListClient {
    async fn fetch_page(&self, locator: &str) -> Result<StatusPage, CredentialError> {
        let resp = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| CredentialError::StatusCheck(format!("GET {}: {}", locator, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CredentialError::StatusCheck(format!(
                "GET {} returned {}: {}",
                locator, status, body
            )));
        }
        resp.json::<StatusPage>()
            .await
            .map_err(|e| CredentialError::StatusCheck(format!("failed to unmarshal status list: {}", e)))
    }
}

/// Tries multiple providers in order; returns the first page found, or the
/// last error.
#[derive(Default)]
pub struct CompositeStatusProvider {
    providers: Vec<Arc<dyn StatusListProvider>>,
}

impl CompositeStatusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn StatusListProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait]
impl StatusListProvider for CompositeStatusProvider {
    async fn fetch_page(&self, locator: &str) -> Result<StatusPage, CredentialError> {
        let mut last_error = CredentialError::StatusCheck("no status providers configured".into());
        for provider in &self.providers {
            match provider.fetch_page(locator).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::debug!(locator, error = %e, "status provider failed, trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
