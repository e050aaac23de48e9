/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("DID not found: {0}")]
    DidNotFound(String),

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("duplicate DID: {0}")]
    DuplicateDid(String),

    #[error("DID resolution failed: {0}")]
    DidResolution(String),

    #[error("no usable public key in DID document: {0}")]
    NoUsableKey(String),

    #[error("public key not found: {0}")]
    KeyNotFound(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] custos_crypto::CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] custos_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}
