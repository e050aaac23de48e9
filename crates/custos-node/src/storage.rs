//! RocksDB storage backend for the Custos node.

use anyhow::Result;
use custos_core::{CoreError, KeyValueStore};
use custos_credentials::ServicePorts;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column family names, one per store.
pub const CF_PROFILES: &str = "profiles";
pub const CF_ID_MAPPING: &str = "id_mapping";
pub const CF_STATUS: &str = "status";
pub const CF_VAULTS: &str = "vaults";
pub const CF_KEYS: &str = "keys";
pub const CF_DIDS: &str = "dids";

const COLUMN_FAMILIES: [&str; 6] = [CF_PROFILES, CF_ID_MAPPING, CF_STATUS, CF_VAULTS, CF_KEYS, CF_DIDS];

/// RocksDB-backed storage for the Custos node.
#[derive(Clone)]
pub struct Storage {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// A `KeyValueStore` view of one column family.
    pub fn column(&self, cf: &'static str) -> Arc<dyn KeyValueStore> {
        Arc::new(ColumnStore {
            db: self.db.clone(),
            cf,
            write_lock: self.write_lock.clone(),
        })
    }

    pub fn ports(&self) -> ServicePorts {
        ServicePorts {
            profiles: self.column(CF_PROFILES),
            id_mapping: self.column(CF_ID_MAPPING),
            status: self.column(CF_STATUS),
            vaults: self.column(CF_VAULTS),
            keys: self.column(CF_KEYS),
            dids: self.column(CF_DIDS),
        }
    }
}

/// One column family. `put_if_absent` serializes on a lock shared by every
/// column of the same database.
struct ColumnStore {
    db: Arc<DB>,
    cf: &'static str,
    write_lock: Arc<Mutex<()>>,
}

fn storage_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::Storage(e.to_string())
}

impl ColumnStore {
    fn handle(&self) -> Result<&rocksdb::ColumnFamily, CoreError> {
        self.db
            .cf_handle(self.cf)
            .ok_or_else(|| CoreError::Storage(format!("column family '{}' not found", self.cf)))
    }
}

impl KeyValueStore for ColumnStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.db.get_cf(self.handle()?, key.as_bytes()).map_err(storage_err)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), CoreError> {
        self.db.put_cf(self.handle()?, key.as_bytes(), value).map_err(storage_err)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<Option<Vec<u8>>, CoreError> {
        let _guard = self.write_lock.lock().map_err(storage_err)?;
        let cf = self.handle()?;
        if let Some(existing) = self.db.get_cf(cf, key.as_bytes()).map_err(storage_err)? {
            return Ok(Some(existing));
        }
        self.db.put_cf(cf, key.as_bytes(), value).map_err(storage_err)?;
        Ok(None)
    }

    fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.db.delete_cf(self.handle()?, key.as_bytes()).map_err(storage_err)
    }
}
