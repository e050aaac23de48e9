/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("encryption failed: {0}")]
    EncryptionError(String),

    #[error("decryption failed: {0}")]
    DecryptionError(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("key store error: {0}")]
    KeyStore(#[from] custos_core::CoreError),
}
