//! Custos node: configuration, RocksDB storage, and the mode-dependent HTTP
//! API over the credential service.

pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod storage;

pub use api::build_router;
pub use config::{CustosConfig, StorageBackend};
pub use error::ApiError;
pub use node::CustosNode;
pub use storage::Storage;
