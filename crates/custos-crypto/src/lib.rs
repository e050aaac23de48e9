//! Custos Crypto: Ed25519 signing keys, X25519/ChaCha20-Poly1305 envelope
//! encryption, BLAKE3 hashing and the key manager.

pub mod encryption;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod kms;
pub mod signing;

pub use encryption::{pack, unpack, EncryptionKeyPair, PackedEnvelope};
pub use error::CryptoError;
pub use hashing::{derive_key, hash};
pub use keys::{KeyPair, PublicKey};
pub use kms::{KeyManager, KeySet};
pub use signing::{sign, verify, Signature};
