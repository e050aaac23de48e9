//! Custos Credentials: profiles, issuance, verification, revocation status
//! lists and confidential credential storage.

pub mod engine;
pub mod error;
pub mod issuer;
pub mod model;
pub mod profile;
pub mod service;
pub mod status;
pub mod vault;
pub mod verifier;

pub use engine::{Ed25519SignatureEngine, SignatureEngine, SigningOptions};
pub use error::{CredentialError, ErrorKind};
pub use issuer::{
    ComposeCredentialRequest, CreateCredentialRequest, CredentialIssuer, IssueCredentialOptions,
    IssueCredentialRequest,
};
pub use model::{Credential, Issuer, OneOrMany, Presentation, Proof, StatusReference, TypedId};
pub use profile::{CreateProfileRequest, Profile, ProfileManager, ProfileStore};
pub use service::{
    CredentialService, GenerateKeypairResponse, ServicePorts, ServiceSettings, StoreCredentialRequest,
    UpdateStatusRequest,
};
pub use status::{
    CompositeStatusProvider, CredentialStatusList, HttpStatusListClient, StatusListProvider, StatusPage,
    StatusRegistry, DEFAULT_LIST_SIZE,
};
pub use vault::{ConfidentialStore, CredentialVault, EncryptedDocument, StoreBackedVault, StructuredDocument};
pub use verifier::{
    Check, CheckFailure, ChecksOutcome, CredentialVerifier, VerificationResult, VerifyChecksOptions,
    VerifyChecksRequest,
};
