//! The Custos node: opens storage, builds the credential service and serves
//! the mode's HTTP API.

use anyhow::Result;
use custos_credentials::{CredentialService, ServicePorts, ServiceSettings};
use custos_crypto::EncryptionKeyPair;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::api;
use crate::config::{CustosConfig, StorageBackend};
use crate::storage::Storage;

pub struct CustosNode {
    config: CustosConfig,
    service: Arc<CredentialService>,
    /// Kept open for the life of the node.
    _storage: Option<Storage>,
}

impl CustosNode {
    pub fn new(config: CustosConfig) -> Result<Self> {
        let (ports, storage, storage_key) = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                (ServicePorts::in_memory(), None, EncryptionKeyPair::generate())
            }
            StorageBackend::Rocksdb => {
                let storage = Storage::open(&config.storage.data_dir)?;
                tracing::info!(path = %config.storage.data_dir.display(), "storage initialized");
                let key = Self::load_or_generate_storage_key(&config.storage.key_path)?;
                (storage.ports(), Some(storage), key)
            }
        };

        let mut settings = ServiceSettings::new(
            config.server.domain.clone(),
            config.server.host_url.clone(),
            storage_key,
        );
        settings.list_size = config.status.list_size;
        settings.status_fetch_timeout = Duration::from_secs(config.status.fetch_timeout_secs);

        let service = Arc::new(CredentialService::new(ports, settings)?);
        tracing::info!(mode = %config.server.mode, "Custos node created");

        Ok(Self {
            config,
            service,
            _storage: storage,
        })
    }

    pub fn service(&self) -> &Arc<CredentialService> {
        &self.service
    }

    /// Serve the API until `shutdown` resolves.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = self.config.listen_socket()?;
        let app = api::build_router(self.config.server.mode, self.service.clone(), self.config.request_timeout());
        api::start_api_server(addr, app, shutdown).await
    }

    /// Load the base58 X25519 storage secret, or create and persist one.
    fn load_or_generate_storage_key(path: &Path) -> Result<EncryptionKeyPair> {
        if path.exists() {
            let encoded = std::fs::read_to_string(path)?;
            let bytes = bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| anyhow::anyhow!("failed to decode storage key: {}", e))?;
            let key = EncryptionKeyPair::from_bytes(&bytes)?;
            tracing::info!(path = %path.display(), "loaded storage key from disk");
            Ok(key)
        } else {
            let key = EncryptionKeyPair::generate();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, bs58::encode(&key.secret_bytes()[..]).into_string())?;
            tracing::info!(path = %path.display(), "generated and saved new storage key");
            Ok(key)
        }
    }
}
