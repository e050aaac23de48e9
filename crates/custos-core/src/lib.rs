//! Custos Core: shared types, errors and the key-value store port used by
//! every other Custos crate.

pub mod error;
pub mod store;
pub mod types;

pub use error::CoreError;
pub use store::{KeyValueStore, MemoryStore};
pub use types::{Did, Mode, SignatureRepresentation, SignatureType};
