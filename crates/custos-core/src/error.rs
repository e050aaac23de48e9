/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("unsupported signature type: {0}")]
    UnsupportedSignatureType(String),

    #[error("unsupported proof format: {0}")]
    UnsupportedProofFormat(String),

    #[error("invalid operation mode: {0}")]
    UnknownMode(String),

    #[error("storage error: {0}")]
    Storage(String),
}
