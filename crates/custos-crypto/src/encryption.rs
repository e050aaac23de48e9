//! Authenticated envelope encryption ("pack"/"unpack").
//!
//! A random content key encrypts the payload with ChaCha20-Poly1305. For
//! every recipient the content key is wrapped under a key derived (BLAKE3)
//! from the X25519 agreement between the sender's static key and the
//! recipient's. The sender's public key travels in the envelope so a
//! recipient can redo the agreement.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hashing::derive_key;

const KEY_WRAP_CONTEXT: &str = "custos 2024 envelope key wrap v1";
const ENVELOPE_TYPE: &str = "custos-pack/v1";
const ENVELOPE_ALG: &str = "X25519+BLAKE3";
const ENVELOPE_ENC: &str = "C20P";

/// Static X25519 keypair used for packing and unpacking envelopes.
#[derive(Clone)]
pub struct EncryptionKeyPair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl EncryptionKeyPair {
    /// Generate from the OS RNG.
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    /// Restore from 32 secret bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self::from_secret(StaticSecret::from(arr)))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Secret bytes, for persistence.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Base58 of the public key; used as the recipient key id.
    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.public.as_bytes()).into_string()
    }

    fn wrapping_key(&self, other: &X25519PublicKey) -> Zeroizing<[u8; 32]> {
        let shared = self.secret.diffie_hellman(other);
        Zeroizing::new(derive_key(KEY_WRAP_CONTEXT, shared.as_bytes()))
    }
}

impl std::fmt::Debug for EncryptionKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyPair")
            .field("public_key", &self.public_key_base58())
            .finish_non_exhaustive()
    }
}

/// Envelope header; bound to the ciphertext as associated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    pub typ: String,
    pub alg: String,
    pub enc: String,
}

/// Per-recipient wrapped content key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientKey {
    /// Base58 X25519 public key of the recipient.
    pub kid: String,
    pub iv: String,
    pub encrypted_key: String,
}

/// Serialized form of a packed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedEnvelope {
    pub protected: ProtectedHeader,
    /// Base58 X25519 public key of the sender.
    pub sender: String,
    pub recipients: Vec<RecipientKey>,
    pub iv: String,
    pub ciphertext: String,
}

impl PackedEnvelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self).map_err(|e| CryptoError::EncryptionError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::DecryptionError(format!("malformed envelope: {}", e)))
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::DecryptionError(format!("invalid {}: {}", name, e)))
}

fn decode_public(value: &str) -> Result<X25519PublicKey, CryptoError> {
    let bytes = bs58::decode(value)
        .into_vec()
        .map_err(|e| CryptoError::InvalidKey(format!("invalid base58: {}", e)))?;
    let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: 32,
        actual: bytes.len(),
    })?;
    Ok(X25519PublicKey::from(arr))
}

/// Encrypt `plaintext` from `sender` to each of `recipients`.
pub fn pack(
    plaintext: &[u8],
    sender: &EncryptionKeyPair,
    recipients: &[X25519PublicKey],
) -> Result<PackedEnvelope, CryptoError> {
    if recipients.is_empty() {
        return Err(CryptoError::InvalidInput("at least one recipient required".into()));
    }

    let protected = ProtectedHeader {
        typ: ENVELOPE_TYPE.into(),
        alg: ENVELOPE_ALG.into(),
        enc: ENVELOPE_ENC.into(),
    };
    let aad = serde_json::to_vec(&protected)
        .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

    let content_key = Zeroizing::new(random_bytes::<32>());
    let iv = random_bytes::<12>();
    let cipher = ChaCha20Poly1305::new_from_slice(&content_key[..])
        .map_err(|e| CryptoError::EncryptionError(format!("cipher init failed: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad: &aad })
        .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;

    let mut wrapped = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let kek = sender.wrapping_key(recipient);
        let key_iv = random_bytes::<12>();
        let wrap = ChaCha20Poly1305::new_from_slice(&kek[..])
            .map_err(|e| CryptoError::EncryptionError(format!("cipher init failed: {}", e)))?;
        let encrypted_key = wrap
            .encrypt(Nonce::from_slice(&key_iv), &content_key[..])
            .map_err(|e| CryptoError::EncryptionError(e.to_string()))?;
        wrapped.push(RecipientKey {
            kid: bs58::encode(recipient.as_bytes()).into_string(),
            iv: URL_SAFE_NO_PAD.encode(key_iv),
            encrypted_key: URL_SAFE_NO_PAD.encode(encrypted_key),
        });
    }

    Ok(PackedEnvelope {
        protected,
        sender: sender.public_key_base58(),
        recipients: wrapped,
        iv: URL_SAFE_NO_PAD.encode(iv),
        ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
    })
}

/// Decrypt an envelope addressed to `recipient`.
pub fn unpack(envelope: &PackedEnvelope, recipient: &EncryptionKeyPair) -> Result<Vec<u8>, CryptoError> {
    let own_kid = recipient.public_key_base58();
    let entry = envelope
        .recipients
        .iter()
        .find(|r| r.kid == own_kid)
        .ok_or_else(|| CryptoError::KeyNotFound(format!("no recipient entry for {}", own_kid)))?;

    let sender = decode_public(&envelope.sender)?;
    let kek = recipient.wrapping_key(&sender);
    let unwrap = ChaCha20Poly1305::new_from_slice(&kek[..])
        .map_err(|e| CryptoError::DecryptionError(format!("cipher init failed: {}", e)))?;
    let key_iv = decode_field("key iv", &entry.iv)?;
    if key_iv.len() != 12 {
        return Err(CryptoError::DecryptionError("key iv must be 12 bytes".into()));
    }
    let encrypted_key = decode_field("encrypted key", &entry.encrypted_key)?;
    let content_key = Zeroizing::new(
        unwrap
            .decrypt(Nonce::from_slice(&key_iv), encrypted_key.as_slice())
            .map_err(|_| CryptoError::DecryptionError("content key unwrap failed".into()))?,
    );

    let aad = serde_json::to_vec(&envelope.protected)
        .map_err(|e| CryptoError::DecryptionError(e.to_string()))?;
    let iv = decode_field("iv", &envelope.iv)?;
    if iv.len() != 12 {
        return Err(CryptoError::DecryptionError("iv must be 12 bytes".into()));
    }
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;
    let cipher = ChaCha20Poly1305::new_from_slice(content_key.as_slice())
        .map_err(|e| CryptoError::DecryptionError(format!("cipher init failed: {}", e)))?;
    cipher
        .decrypt(Nonce::from_slice(&iv), Payload { msg: ciphertext.as_slice(), aad: aad.as_slice() })
        .map_err(|_| CryptoError::DecryptionError("authentication failed".into()))
}
