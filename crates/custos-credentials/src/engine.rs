//! Linked-data proofs over JSON credentials and presentations.
//!
//! The signing input is `BLAKE3(canonical proof options) || BLAKE3(canonical
//! document)`, where the document excludes `proof`, the proof options exclude
//! `jws`/`proofValue`, and canonical form is compact JSON with object keys
//! sorted. A detached JWS uses the unencoded-payload header
//! (`"b64": false`), so the JWS signing input is `header '.' input`.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{SubsecRound, Utc};
use custos_core::{SignatureRepresentation, SignatureType};
use custos_crypto::{hash, sign, verify, KeyManager, KeyPair, Signature};
use custos_identity::{DidResolver, PublicKeyFetcher};
use serde_json::{Map, Value};

use crate::error::CredentialError;
use crate::model::{Credential, Presentation, Proof};

pub const PURPOSE_ASSERTION: &str = "assertionMethod";
pub const PURPOSE_AUTHENTICATION: &str = "authentication";

const JWS_HEADER: &str = r#"{"alg":"EdDSA","b64":false,"crit":["b64"]}"#;
const JWS_ALG: &str = "EdDSA";

/// Parameters for producing one proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningOptions {
    pub signature_type: SignatureType,
    pub representation: SignatureRepresentation,
    /// DID URL of the signing key; becomes `proof.verificationMethod`.
    pub verification_method: String,
    pub proof_purpose: String,
}

impl SigningOptions {
    pub fn assertion(
        signature_type: SignatureType,
        representation: SignatureRepresentation,
        verification_method: impl Into<String>,
    ) -> Self {
        Self {
            signature_type,
            representation,
            verification_method: verification_method.into(),
            proof_purpose: PURPOSE_ASSERTION.to_string(),
        }
    }
}

/// Signs and verifies credentials and presentations.
#[async_trait]
pub trait SignatureEngine: Send + Sync {
    async fn sign_credential(
        &self,
        credential: Credential,
        opts: &SigningOptions,
    ) -> Result<Credential, CredentialError>;

    async fn sign_presentation(
        &self,
        presentation: Presentation,
        opts: &SigningOptions,
    ) -> Result<Presentation, CredentialError>;

    /// Parse `raw` and verify every proof it carries. A document without
    /// proofs parses successfully; callers decide whether that is acceptable.
    async fn verify_credential(
        &self,
        raw: &[u8],
        fetcher: &dyn PublicKeyFetcher,
    ) -> Result<Credential, CredentialError>;

    async fn verify_presentation(
        &self,
        raw: &[u8],
        fetcher: &dyn PublicKeyFetcher,
    ) -> Result<Presentation, CredentialError>;
}

/// `Ed25519Signature2018` engine. Signing keys are found by resolving the
/// verification method and looking its public key up in the key manager.
#[derive(Clone)]
pub struct Ed25519SignatureEngine {
    resolver: Arc<dyn DidResolver>,
    kms: KeyManager,
}

impl Ed25519SignatureEngine {
    pub fn new(resolver: Arc<dyn DidResolver>, kms: KeyManager) -> Self {
        Self { resolver, kms }
    }

    async fn signing_key(&self, verification_method: &str) -> Result<KeyPair, CredentialError> {
        let doc = self
            .resolver
            .resolve(verification_method)
            .await
            .map_err(|e| CredentialError::Signature(format!("failed to resolve DID: {}", e)))?;
        let entry = doc.find_public_key(verification_method).ok_or_else(|| {
            CredentialError::Signature(format!("key {} not in DID document", verification_method))
        })?;
        self.kms
            .signing_key(&entry.public_key_base58)
            .map_err(|e| CredentialError::Signature(e.to_string()))
    }

    async fn sign_value(&self, mut doc: Value, opts: &SigningOptions) -> Result<Value, CredentialError> {
        let keypair = self.signing_key(&opts.verification_method).await?;
        let mut proof = Proof {
            proof_type: opts.signature_type.to_string(),
            created: Utc::now().trunc_subsecs(0),
            verification_method: opts.verification_method.clone(),
            proof_purpose: opts.proof_purpose.clone(),
            jws: None,
            proof_value: None,
        };
        let proof_options = serde_json::to_value(&proof)
            .map_err(|e| CredentialError::Signature(e.to_string()))?;
        let input = signing_input(&without_proof(&doc), &proof_options);

        match opts.representation {
            SignatureRepresentation::Jws => {
                let header = URL_SAFE_NO_PAD.encode(JWS_HEADER);
                let signature = sign(&jws_signing_input(&header, &input), &keypair);
                proof.jws = Some(format!("{}..{}", header, signature.to_base64url()));
            }
            SignatureRepresentation::ProofValue => {
                proof.proof_value = Some(sign(&input, &keypair).to_base64url());
            }
        }

        let proof = serde_json::to_value(&proof).map_err(|e| CredentialError::Signature(e.to_string()))?;
        let object = doc
            .as_object_mut()
            .ok_or_else(|| CredentialError::Signature("document is not a JSON object".into()))?;
        let proofs = match object.remove("proof") {
            None => proof,
            Some(Value::Array(mut existing)) => {
                existing.push(proof);
                Value::Array(existing)
            }
            Some(existing) => Value::Array(vec![existing, proof]),
        };
        object.insert("proof".into(), proofs);

        tracing::debug!(verification_method = %opts.verification_method, "proof added");
        Ok(doc)
    }

    async fn verify_value(&self, doc: &Value, fetcher: &dyn PublicKeyFetcher) -> Result<usize, CredentialError> {
        let object = doc
            .as_object()
            .ok_or_else(|| CredentialError::Verification("document is not a JSON object".into()))?;
        let proofs: Vec<&Map<String, Value>> = match object.get("proof") {
            None => Vec::new(),
            Some(Value::Object(proof)) => vec![proof],
            Some(Value::Array(items)) => items
                .iter()
                .map(|p| p.as_object().ok_or_else(|| CredentialError::Verification("proof is not an object".into())))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(CredentialError::Verification("malformed proof".into())),
        };

        let unsigned = without_proof(doc);
        for raw in &proofs {
            verify_proof(&unsigned, raw, fetcher).await?;
        }
        Ok(proofs.len())
    }
}

async fn verify_proof(
    unsigned: &Value,
    raw: &Map<String, Value>,
    fetcher: &dyn PublicKeyFetcher,
) -> Result<(), CredentialError> {
    let proof: Proof = serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|e| CredentialError::Verification(format!("malformed proof: {}", e)))?;
    proof
        .proof_type
        .parse::<SignatureType>()
        .map_err(|e| CredentialError::Verification(e.to_string()))?;

    let mut options = raw.clone();
    options.remove("jws");
    options.remove("proofValue");
    let input = signing_input(unsigned, &Value::Object(options));

    let key = fetcher
        .fetch(&proof.verification_method)
        .await
        .map_err(|e| CredentialError::Verification(format!("public key lookup failed: {}", e)))?;

    let (message, encoded) = match (&proof.jws, &proof.proof_value) {
        (Some(jws), _) => {
            let (header, signature) = jws
                .split_once("..")
                .ok_or_else(|| CredentialError::Verification("jws is not detached".into()))?;
            check_jws_header(header)?;
            (jws_signing_input(header, &input), signature)
        }
        (None, Some(value)) => (input, value.as_str()),
        (None, None) => {
            return Err(CredentialError::Verification("proof carries no signature".into()))
        }
    };
    let signature = Signature::from_base64url(encoded)
        .map_err(|e| CredentialError::Verification(e.to_string()))?;
    verify(&message, &signature, &key).map_err(|_| {
        CredentialError::Verification(format!(
            "signature from {} does not match document",
            proof.verification_method
        ))
    })
}

fn check_jws_header(encoded: &str) -> Result<(), CredentialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CredentialError::Verification(format!("invalid jws header: {}", e)))?;
    let header: Value = serde_json::from_slice(&bytes)
        .map_err(|e| CredentialError::Verification(format!("invalid jws header: {}", e)))?;
    match header.get("alg").and_then(Value::as_str) {
        Some(JWS_ALG) => Ok(()),
        other => Err(CredentialError::Verification(format!(
            "unsupported jws alg: {}",
            other.unwrap_or("none")
        ))),
    }
}

fn without_proof(doc: &Value) -> Value {
    let mut doc = doc.clone();
    if let Some(object) = doc.as_object_mut() {
        object.remove("proof");
    }
    doc
}

fn jws_signing_input(header: &str, input: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(header.len() + 1 + input.len());
    message.extend_from_slice(header.as_bytes());
    message.push(b'.');
    message.extend_from_slice(input);
    message
}

fn signing_input(doc: &Value, proof_options: &Value) -> Vec<u8> {
    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&hash(canonicalize(proof_options).to_string().as_bytes()));
    input.extend_from_slice(&hash(canonicalize(doc).to_string().as_bytes()));
    input
}

/// Rebuild `value` with object keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl SignatureEngine for Ed25519SignatureEngine {
    async fn sign_credential(
        &self,
        credential: Credential,
        opts: &SigningOptions,
    ) -> Result<Credential, CredentialError> {
        let signed = self.sign_value(credential.to_value()?, opts).await?;
        Credential::from_value(signed)
    }

    async fn sign_presentation(
        &self,
        presentation: Presentation,
        opts: &SigningOptions,
    ) -> Result<Presentation, CredentialError> {
        let value = serde_json::to_value(&presentation)
            .map_err(|e| CredentialError::Serialization(e.to_string()))?;
        let signed = self.sign_value(value, opts).await?;
        serde_json::from_value(signed).map_err(|e| CredentialError::Serialization(e.to_string()))
    }

    async fn verify_credential(
        &self,
        raw: &[u8],
        fetcher: &dyn PublicKeyFetcher,
    ) -> Result<Credential, CredentialError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CredentialError::MalformedField(format!("credential: {}", e)))?;
        self.verify_value(&value, fetcher).await?;
        Credential::from_value(value)
    }

    async fn verify_presentation(
        &self,
        raw: &[u8],
        fetcher: &dyn PublicKeyFetcher,
    ) -> Result<Presentation, CredentialError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| CredentialError::MalformedField(format!("presentation: {}", e)))?;
        self.verify_value(&value, fetcher).await?;
        serde_json::from_value(value)
            .map_err(|e| CredentialError::MalformedField(format!("presentation: {}", e)))
    }
}
