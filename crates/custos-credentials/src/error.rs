use std::fmt;

use custos_core::CoreError;
use custos_crypto::CryptoError;
use custos_identity::IdentityError;

/// Coarse classification of a failure, used to pick the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Resolution,
    Signature,
    Verify,
    StatusAllocation,
    StatusCheck,
    StorageCorruption,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::Resolution => "ResolutionError",
            Self::Signature => "SignatureError",
            Self::Verify => "VerifyError",
            Self::StatusAllocation => "StatusAllocationError",
            Self::StatusCheck => "StatusCheckError",
            Self::StorageCorruption => "StorageCorruption",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Credential lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid profile request: {0}")]
    InvalidProfileRequest(String),

    #[error("malformed field: {0}")]
    MalformedField(String),

    #[error("unsupported proof format: {0}")]
    UnsupportedProofFormat(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),

    #[error("failed to sign credential: {0}")]
    Signature(String),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("failed to allocate status reference: {0}")]
    StatusAllocation(String),

    #[error("status check failed: {0}")]
    StatusCheck(String),

    #[error("stored document is corrupt: {0}")]
    StorageCorruption(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidProfileRequest(_)
            | Self::MalformedField(_)
            | Self::UnsupportedProofFormat(_) => ErrorKind::Validation,
            Self::ProfileNotFound(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::IdentityResolution(_) | Self::Identity(_) => ErrorKind::Resolution,
            Self::Signature(_) => ErrorKind::Signature,
            Self::Verification(_) => ErrorKind::Verify,
            Self::StatusAllocation(_) => ErrorKind::StatusAllocation,
            Self::StatusCheck(_) => ErrorKind::StatusCheck,
            Self::StorageCorruption(_) => ErrorKind::StorageCorruption,
            Self::Core(CoreError::Storage(_)) => ErrorKind::Internal,
            Self::Core(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::Serialization(_) | Self::Crypto(_) => ErrorKind::Internal,
        }
    }
}
