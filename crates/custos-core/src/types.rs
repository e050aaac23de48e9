use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Decentralized Identifier.
/// Format: `did:<method>:<method-specific-id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Did(pub String);

impl Did {
    /// Create a new DID from a full URI string.
    pub fn new(uri: String) -> Result<Self, CoreError> {
        if !Self::is_did(&uri) {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        let parts: Vec<&str> = uri.splitn(3, ':').collect();
        if parts.len() < 3 || parts[1].is_empty() || parts[2].is_empty() {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Create a DID from method and identifier components.
    pub fn from_parts(method: &str, identifier: &str) -> Self {
        Self(format!("did:{}:{}", method, identifier))
    }

    /// Whether a string looks like a DID (or DID URL).
    pub fn is_did(s: &str) -> bool {
        s.starts_with("did:")
    }

    /// Strip any `#fragment` from a DID URL, leaving the bare DID.
    pub fn strip_fragment(did_url: &str) -> &str {
        did_url.split('#').next().unwrap_or(did_url)
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// Extract the method name.
    pub fn method(&self) -> Option<&str> {
        self.0.split(':').nth(1)
    }

    /// Extract the method-specific identifier.
    pub fn identifier(&self) -> Option<&str> {
        let parts: Vec<&str> = self.0.splitn(3, ':').collect();
        parts.get(2).copied()
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operating mode of a node. Selects which operation set is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Profile management, issuance, storage and status.
    Issuer,
    /// Credential and presentation verification.
    Verifier,
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issuer" => Ok(Self::Issuer),
            "verifier" => Ok(Self::Verifier),
            other => Err(CoreError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => write!(f, "issuer"),
            Self::Verifier => write!(f, "verifier"),
        }
    }
}

/// Linked-data signature suites supported for credential proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Ed25519 signature suite (2018).
    Ed25519Signature2018,
}

impl SignatureType {
    /// Prefix of the verification-key type this suite signs with.
    pub fn verification_key_family(&self) -> &'static str {
        match self {
            Self::Ed25519Signature2018 => "Ed25519VerificationKey",
        }
    }
}

impl FromStr for SignatureType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ed25519Signature2018" => Ok(Self::Ed25519Signature2018),
            other => Err(CoreError::UnsupportedSignatureType(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519Signature2018 => write!(f, "Ed25519Signature2018"),
        }
    }
}

/// How a signature is embedded in a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureRepresentation {
    /// Detached JWS in the `jws` proof field.
    #[default]
    #[serde(rename = "jws")]
    Jws,
    /// Raw signature in the `proofValue` proof field.
    #[serde(rename = "proofValue")]
    ProofValue,
}

impl FromStr for SignatureRepresentation {
    type Err = CoreError;

    /// Parses a proof-format tag as used by compose-and-issue requests.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jws" => Ok(Self::Jws),
            "proofValue" => Ok(Self::ProofValue),
            other => Err(CoreError::UnsupportedProofFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jws => write!(f, "jws"),
            Self::ProofValue => write!(f, "proofValue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_new_valid() {
        let did = Did::new("did:example:abc123".into()).unwrap();
        assert_eq!(did.uri(), "did:example:abc123");
        assert_eq!(did.method(), Some("example"));
        assert_eq!(did.identifier(), Some("abc123"));
    }

    #[test]
    fn test_did_identifier_keeps_colons() {
        let did = Did::new("did:custos:issuer.example.com:z6Mk".into()).unwrap();
        assert_eq!(did.method(), Some("custos"));
        assert_eq!(did.identifier(), Some("issuer.example.com:z6Mk"));
    }

    #[test]
    fn test_did_new_invalid_prefix() {
        assert!(Did::new("urn:uuid:1234".into()).is_err());
    }

    #[test]
    fn test_did_new_too_few_parts() {
        assert!(Did::new("did:example".into()).is_err());
        assert!(Did::new("did::abc".into()).is_err());
    }

    #[test]
    fn test_did_strip_fragment() {
        assert_eq!(Did::strip_fragment("did:example:a#key-1"), "did:example:a");
        assert_eq!(Did::strip_fragment("did:example:a"), "did:example:a");
    }

    #[test]
    fn test_did_display() {
        let did = Did::from_parts("key", "z6Mk");
        assert_eq!(format!("{}", did), "did:key:z6Mk");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("issuer".parse::<Mode>().unwrap(), Mode::Issuer);
        assert_eq!("verifier".parse::<Mode>().unwrap(), Mode::Verifier);
        assert!("holder".parse::<Mode>().is_err());
        assert_eq!(Mode::Verifier.to_string(), "verifier");
    }

    #[test]
    fn test_signature_type_parse() {
        let st: SignatureType = "Ed25519Signature2018".parse().unwrap();
        assert_eq!(st, SignatureType::Ed25519Signature2018);
        assert_eq!(st.verification_key_family(), "Ed25519VerificationKey");
        assert!("RsaSignature2018".parse::<SignatureType>().is_err());
    }

    #[test]
    fn test_representation_parse() {
        assert_eq!(
            "jws".parse::<SignatureRepresentation>().unwrap(),
            SignatureRepresentation::Jws
        );
        assert_eq!(
            "proofValue".parse::<SignatureRepresentation>().unwrap(),
            SignatureRepresentation::ProofValue
        );
        let err = "ldp".parse::<SignatureRepresentation>().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedProofFormat(_)));
    }

    #[test]
    fn test_representation_serde() {
        let json = serde_json::to_string(&SignatureRepresentation::ProofValue).unwrap();
        assert_eq!(json, "\"proofValue\"");
        let back: SignatureRepresentation = serde_json::from_str("\"jws\"").unwrap();
        assert_eq!(back, SignatureRepresentation::Jws);
    }
}
