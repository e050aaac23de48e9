use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use custos_core::{SignatureRepresentation, SignatureType};
use custos_identity::DidResolver;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::{SignatureEngine, SigningOptions};
use crate::error::CredentialError;
use crate::model::{Credential, Issuer, OneOrMany, TypedId, VC_CONTEXT, VC_TYPE};
use crate::profile::Profile;
use crate::status::StatusRegistry;

/// `kid` entry of `proofFormatOptions`.
const KEY_ID_OPTION: &str = "kid";

/// Issue a credential from a stored profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCredentialRequest {
    #[serde(default)]
    pub profile: String,
    #[serde(rename = "@context", alias = "context", default)]
    pub context: Vec<Value>,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(rename = "credentialSubject", alias = "subject", default)]
    pub subject: Value,
}

/// Build and sign a credential without a stored profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeCredentialRequest {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub issuance_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claims: Option<Value>,
    #[serde(default)]
    pub evidence: Option<Value>,
    #[serde(default)]
    pub terms_of_use: Option<Value>,
    #[serde(default)]
    pub proof_format: Option<String>,
    #[serde(default)]
    pub proof_format_options: Option<Value>,
}

/// Sign a caller-supplied credential with an assertion-method key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCredentialRequest {
    pub credential: Value,
    #[serde(default)]
    pub opts: IssueCredentialOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialOptions {
    #[serde(default)]
    pub assertion_method: String,
}

/// Builds unsigned credentials, attaches status references, and signs.
#[derive(Clone)]
pub struct CredentialIssuer {
    registry: Arc<dyn StatusRegistry>,
    engine: Arc<dyn SignatureEngine>,
    resolver: Arc<dyn DidResolver>,
}

impl CredentialIssuer {
    pub fn new(
        registry: Arc<dyn StatusRegistry>,
        engine: Arc<dyn SignatureEngine>,
        resolver: Arc<dyn DidResolver>,
    ) -> Self {
        Self {
            registry,
            engine,
            resolver,
        }
    }

    /// Issue a credential under `profile`. The status reference is allocated
    /// before signing so the proof covers it.
    pub async fn issue(
        &self,
        profile: &Profile,
        req: CreateCredentialRequest,
    ) -> Result<Credential, CredentialError> {
        if req.subject.is_null() {
            return Err(CredentialError::InvalidRequest("missing credential subject".into()));
        }
        let context = if req.context.is_empty() {
            vec![Value::String(VC_CONTEXT.into())]
        } else {
            req.context
        };
        let types = if req.types.is_empty() {
            vec![VC_TYPE.to_string()]
        } else {
            req.types
        };

        let status = self.registry.allocate_status_reference().await?;
        let credential = Credential {
            context: OneOrMany::Many(context),
            id: Some(format!("{}/{}", profile.uri, uuid::Uuid::new_v4())),
            types: OneOrMany::Many(types),
            issuer: Issuer::Object {
                id: profile.did.clone(),
                name: Some(profile.name.clone()),
            },
            issuance_date: Utc::now().trunc_subsecs(0),
            expiration_date: None,
            credential_subject: req.subject,
            credential_status: Some(status),
            evidence: None,
            terms_of_use: None,
            proof: None,
            extra: Map::new(),
        };

        let opts = SigningOptions::assertion(
            profile.signature_type,
            profile.signature_representation,
            profile.creator.clone(),
        );
        let signed = self.engine.sign_credential(credential, &opts).await?;
        tracing::info!(
            profile = %profile.name,
            credential_id = signed.id.as_deref().unwrap_or_default(),
            "credential issued"
        );
        Ok(signed)
    }

    pub async fn compose_and_issue(
        &self,
        req: ComposeCredentialRequest,
    ) -> Result<Credential, CredentialError> {
        let representation = match req.proof_format.as_deref() {
            None | Some("") => SignatureRepresentation::Jws,
            Some(format) => format.parse().map_err(|_| {
                CredentialError::UnsupportedProofFormat(format!("invalid proof format : {}", format))
            })?,
        };
        let signer = signer_did(&req)?;
        let credential = build_credential(req)?;
        self.sign_with_did(credential, &signer, representation).await
    }

    pub async fn issue_credential(
        &self,
        req: IssueCredentialRequest,
    ) -> Result<Credential, CredentialError> {
        if req.opts.assertion_method.is_empty() {
            return Err(CredentialError::InvalidRequest("missing assertion method".into()));
        }
        let credential = Credential::from_value(req.credential)?;
        self.sign_with_did(credential, &req.opts.assertion_method, SignatureRepresentation::Jws)
            .await
    }

    /// Sign with a key of `signer`. A DID URL names the key directly; a bare
    /// DID is resolved and its signing key selected.
    async fn sign_with_did(
        &self,
        credential: Credential,
        signer: &str,
        representation: SignatureRepresentation,
    ) -> Result<Credential, CredentialError> {
        let signature_type = SignatureType::Ed25519Signature2018;
        let doc = self
            .resolver
            .resolve(signer)
            .await
            .map_err(|e| CredentialError::IdentityResolution(format!("failed to resolve DID : {}", e)))?;
        let key_id = if signer.contains('#') {
            signer.to_string()
        } else {
            doc.signing_key_id(signature_type)?
        };
        let opts = SigningOptions::assertion(signature_type, representation, key_id);
        let signed = self.engine.sign_credential(credential, &opts).await?;
        tracing::info!(signer, "credential signed");
        Ok(signed)
    }
}

/// The DID that signs a composed credential: `proofFormatOptions.kid` when
/// present, otherwise the issuer.
fn signer_did(req: &ComposeCredentialRequest) -> Result<String, CredentialError> {
    let kid = match &req.proof_format_options {
        None | Some(Value::Null) => None,
        Some(Value::Object(options)) => options.get(KEY_ID_OPTION),
        Some(_) => {
            return Err(CredentialError::MalformedField("proofFormatOptions must be an object".into()))
        }
    };
    match kid {
        None | Some(Value::Null) => Ok(req.issuer.clone()),
        Some(Value::String(kid)) if kid.is_empty() => Ok(req.issuer.clone()),
        Some(Value::String(kid)) => Ok(kid.clone()),
        Some(_) => Err(CredentialError::MalformedField("invalid kid type".into())),
    }
}

fn build_credential(req: ComposeCredentialRequest) -> Result<Credential, CredentialError> {
    let mut subject = match req.claims {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(claims)) => claims,
        Some(_) => return Err(CredentialError::MalformedField("claims must be a JSON object".into())),
    };
    subject.insert("id".into(), Value::String(req.subject));

    let types = if req.types.is_empty() {
        vec![VC_TYPE.to_string()]
    } else {
        req.types
    };

    let evidence = match req.evidence {
        None | Some(Value::Null) => None,
        Some(Value::Object(e)) => Some(Value::Object(e)),
        Some(Value::Array(items)) if items.iter().all(Value::is_object) => Some(Value::Array(items)),
        Some(_) => return Err(CredentialError::MalformedField("evidence".into())),
    };

    Ok(Credential {
        context: OneOrMany::Many(vec![Value::String(VC_CONTEXT.into())]),
        id: None,
        types: OneOrMany::Many(types),
        issuer: Issuer::Id(req.issuer),
        issuance_date: req.issuance_date.unwrap_or_else(|| Utc::now().trunc_subsecs(0)),
        expiration_date: req.expiration_date,
        credential_subject: Value::Object(subject),
        credential_status: None,
        evidence,
        terms_of_use: decode_typed_ids(req.terms_of_use)?,
        proof: None,
        extra: Map::new(),
    })
}

/// Accept a single typed id or a list of them.
fn decode_typed_ids(value: Option<Value>) -> Result<Option<OneOrMany<TypedId>>, CredentialError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    if let Ok(single) = serde_json::from_value::<TypedId>(value.clone()) {
        return Ok(Some(OneOrMany::Many(vec![single])));
    }
    serde_json::from_value::<Vec<TypedId>>(value)
        .map(|many| Some(OneOrMany::Many(many)))
        .map_err(|e| CredentialError::MalformedField(format!("termsOfUse: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{fixture, Fixture};
    use crate::error::ErrorKind;
    use crate::status::{CredentialStatusList, StatusListProvider};
    use custos_core::MemoryStore;
    use custos_identity::{CreateDidOptions, DidDocument, LocalDidResolver};
    use custos_crypto::KeyPair;
    use serde_json::json;

    struct Setup {
        f: Fixture,
        issuer: CredentialIssuer,
        status: Arc<CredentialStatusList>,
    }

    fn setup() -> Setup {
        let f = fixture();
        let status = Arc::new(CredentialStatusList::new(
            Arc::new(MemoryStore::new()),
            Arc::new(f.engine.clone()),
            "https://issuer.example.com",
            50,
        ));
        let issuer = CredentialIssuer::new(
            status.clone(),
            Arc::new(f.engine.clone()),
            Arc::new(LocalDidResolver::new(f.manager.clone())),
        );
        Setup { f, issuer, status }
    }

    fn profile(f: &Fixture, representation: SignatureRepresentation) -> Profile {
        let doc = f.manager.create("issuer.example.com", CreateDidOptions::default()).unwrap();
        Profile {
            name: "university".into(),
            uri: "https://example.com/credentials".into(),
            creator: doc.public_key[0].id.clone(),
            did: doc.id,
            signature_type: SignatureType::Ed25519Signature2018,
            signature_representation: representation,
            created: Utc::now(),
        }
    }

    /// Register `did:example:A` with a key held by the node's key manager.
    fn register_external(f: &Fixture) -> DidDocument {
        let keypair = KeyPair::generate();
        let public = f.manager.key_manager().import_signing_key(&keypair).unwrap();
        let doc = DidDocument::new("did:example:A".into(), public);
        f.manager.register(&doc).unwrap();
        doc
    }

    async fn verifies(f: &Fixture, credential: &Credential) -> bool {
        let raw = serde_json::to_vec(credential).unwrap();
        f.engine.verify_credential(&raw, &f.fetcher).await.is_ok()
    }

    #[tokio::test]
    async fn test_issue_from_profile() {
        let s = setup();
        let profile = profile(&s.f, SignatureRepresentation::Jws);
        let req = CreateCredentialRequest {
            profile: profile.name.clone(),
            context: vec![json!(VC_CONTEXT)],
            types: vec![VC_TYPE.into(), "UniversityDegreeCredential".into()],
            subject: json!({"id": "did:example:B", "degree": "BSc"}),
        };
        let vc = s.issuer.issue(&profile, req).await.unwrap();

        assert!(vc.id.as_deref().unwrap().starts_with("https://example.com/credentials/"));
        assert_eq!(vc.issuer.id(), profile.did);
        assert_eq!(vc.issuer.name(), Some("university"));
        assert_eq!(vc.proofs().len(), 1);
        assert_eq!(vc.proofs()[0].verification_method, profile.creator);
        assert!(verifies(&s.f, &vc).await);

        let status = vc.credential_status.as_ref().unwrap();
        assert!(s.status.fetch_page(&status.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_issue_unique_ids() {
        let s = setup();
        let profile = profile(&s.f, SignatureRepresentation::ProofValue);
        let req = CreateCredentialRequest {
            subject: json!({"id": "did:example:B"}),
            ..Default::default()
        };
        let a = s.issuer.issue(&profile, req.clone()).await.unwrap();
        let b = s.issuer.issue(&profile, req).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.proofs()[0].proof_value.is_some());
    }

    #[tokio::test]
    async fn test_issue_requires_subject() {
        let s = setup();
        let profile = profile(&s.f, SignatureRepresentation::Jws);
        let err = s.issuer.issue(&profile, CreateCredentialRequest::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_issue_with_unusable_key_is_signature_error() {
        let s = setup();
        let mut profile = profile(&s.f, SignatureRepresentation::Jws);
        profile.creator = format!("{}#key-9", profile.did);
        let req = CreateCredentialRequest {
            subject: json!({"id": "did:example:B"}),
            ..Default::default()
        };
        assert_eq!(s.issuer.issue(&profile, req).await.unwrap_err().kind(), ErrorKind::Signature);
    }

    #[tokio::test]
    async fn test_compose_and_issue_example() {
        let s = setup();
        register_external(&s.f);
        let req = ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            subject: "did:example:B".into(),
            types: vec!["UniversityDegree".into()],
            claims: Some(json!({"name": "John Doe"})),
            proof_format: Some("jws".into()),
            ..Default::default()
        };
        let vc = s.issuer.compose_and_issue(req).await.unwrap();
        assert_eq!(vc.proofs()[0].proof_type, "Ed25519Signature2018");
        assert!(!vc.proofs()[0].jws.as_deref().unwrap_or_default().is_empty());
        assert_eq!(vc.credential_subject, json!({"id": "did:example:B", "name": "John Doe"}));
        assert_eq!(vc.types.as_slice(), ["UniversityDegree".to_string()]);
        assert_eq!(vc.context.as_slice(), [json!(VC_CONTEXT)]);
        assert!(verifies(&s.f, &vc).await);
    }

    #[tokio::test]
    async fn test_compose_defaults() {
        let s = setup();
        register_external(&s.f);
        let req = ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            subject: "did:example:B".into(),
            ..Default::default()
        };
        let vc = s.issuer.compose_and_issue(req).await.unwrap();
        assert_eq!(vc.types.as_slice(), [VC_TYPE.to_string()]);
        assert_eq!(vc.credential_subject, json!({"id": "did:example:B"}));
        assert!(vc.proofs()[0].jws.is_some());
    }

    #[tokio::test]
    async fn test_compose_proof_value_and_terms() {
        let s = setup();
        register_external(&s.f);
        let req = ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            subject: "did:example:B".into(),
            proof_format: Some("proofValue".into()),
            terms_of_use: Some(json!({"type": "IssuerPolicy", "id": "http://example.com/policies/1"})),
            evidence: Some(json!([{"id": "https://example.com/evidence/1", "type": ["DocumentVerification"]}])),
            ..Default::default()
        };
        let vc = s.issuer.compose_and_issue(req).await.unwrap();
        assert!(vc.proofs()[0].proof_value.is_some());
        assert_eq!(vc.terms_of_use.as_ref().unwrap().as_slice().len(), 1);
        assert!(vc.evidence.as_ref().unwrap().is_array());
        assert!(verifies(&s.f, &vc).await);
    }

    #[tokio::test]
    async fn test_compose_unsupported_format() {
        let s = setup();
        let req = ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            proof_format: Some("ldp".into()),
            ..Default::default()
        };
        assert!(matches!(
            s.issuer.compose_and_issue(req).await,
            Err(CredentialError::UnsupportedProofFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_compose_kid_override() {
        let s = setup();
        let signer = s.f.manager.create("signer.example.com", CreateDidOptions::default()).unwrap();
        let req = ComposeCredentialRequest {
            issuer: "did:example:unregistered".into(),
            subject: "did:example:B".into(),
            proof_format_options: Some(json!({"kid": signer.id})),
            ..Default::default()
        };
        let vc = s.issuer.compose_and_issue(req).await.unwrap();
        assert_eq!(vc.proofs()[0].verification_method, signer.public_key[0].id);
        assert_eq!(vc.issuer.id(), "did:example:unregistered");
    }

    #[tokio::test]
    async fn test_compose_kid_non_string() {
        let s = setup();
        let req = ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            proof_format_options: Some(json!({"kid": 7})),
            ..Default::default()
        };
        assert!(matches!(
            s.issuer.compose_and_issue(req).await,
            Err(CredentialError::MalformedField(_))
        ));
    }

    #[tokio::test]
    async fn test_compose_unresolvable_issuer() {
        let s = setup();
        let req = ComposeCredentialRequest {
            issuer: "did:example:nobody".into(),
            subject: "did:example:B".into(),
            ..Default::default()
        };
        assert_eq!(
            s.issuer.compose_and_issue(req).await.unwrap_err().kind(),
            ErrorKind::Resolution
        );
    }

    #[tokio::test]
    async fn test_issue_credential_with_assertion_method() {
        let s = setup();
        let doc = register_external(&s.f);
        let req = IssueCredentialRequest {
            credential: json!({
                "@context": [VC_CONTEXT],
                "id": "http://example.edu/credentials/1872",
                "type": "VerifiableCredential",
                "issuer": "did:example:A",
                "issuanceDate": "2010-01-01T19:23:24Z",
                "credentialSubject": {"id": "did:example:B"}
            }),
            opts: IssueCredentialOptions {
                assertion_method: doc.public_key[0].id.clone(),
            },
        };
        let vc = s.issuer.issue_credential(req).await.unwrap();
        assert!(vc.proofs()[0].jws.is_some());
        assert!(verifies(&s.f, &vc).await);
    }

    #[tokio::test]
    async fn test_issue_credential_invalid() {
        let s = setup();
        let req = IssueCredentialRequest {
            credential: json!({"id": "x"}),
            opts: IssueCredentialOptions {
                assertion_method: "did:example:A".into(),
            },
        };
        assert_eq!(s.issuer.issue_credential(req).await.unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_decode_typed_ids() {
        assert!(decode_typed_ids(None).unwrap().is_none());
        let single = decode_typed_ids(Some(json!({"type": "A"}))).unwrap().unwrap();
        assert_eq!(single.as_slice().len(), 1);
        let many = decode_typed_ids(Some(json!([{"type": "A"}, {"type": "B"}]))).unwrap().unwrap();
        assert_eq!(many.as_slice().len(), 2);
        assert!(matches!(
            decode_typed_ids(Some(json!("nope"))),
            Err(CredentialError::MalformedField(_))
        ));
    }

    #[test]
    fn test_build_credential_rejects_bad_claims() {
        let req = ComposeCredentialRequest {
            claims: Some(json!(["not", "an", "object"])),
            ..Default::default()
        };
        assert!(matches!(build_credential(req), Err(CredentialError::MalformedField(_))));
        let req = ComposeCredentialRequest {
            evidence: Some(json!("text")),
            ..Default::default()
        };
        assert!(matches!(build_credential(req), Err(CredentialError::MalformedField(_))));
    }
}
