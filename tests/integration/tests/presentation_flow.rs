//! Integration test: holder presentations and selectable verification checks.

use std::sync::Arc;

use custos_credentials::engine::PURPOSE_AUTHENTICATION;
use custos_credentials::{
    ChecksOutcome, CreateCredentialRequest, CreateProfileRequest, Credential, CredentialService,
    Ed25519SignatureEngine, Presentation, ServicePorts, ServiceSettings, SignatureEngine, SigningOptions,
    UpdateStatusRequest, VerifyChecksOptions, VerifyChecksRequest,
};
use custos_crypto::EncryptionKeyPair;
use custos_identity::LocalDidResolver;
use serde_json::value::RawValue;
use serde_json::{json, Value};

struct Fixture {
    svc: CredentialService,
    engine: Ed25519SignatureEngine,
    opts: SigningOptions,
}

async fn fixture() -> Fixture {
    let settings = ServiceSettings::new("issuer.example.com", "https://issuer.example.com", EncryptionKeyPair::generate());
    let svc = CredentialService::new(ServicePorts::in_memory(), settings).unwrap();
    let profile = svc
        .create_profile(CreateProfileRequest {
            name: "holder".into(),
            uri: "https://example.com/credentials".into(),
            signature_type: "Ed25519Signature2018".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let engine = Ed25519SignatureEngine::new(
        Arc::new(LocalDidResolver::new(svc.did_manager().clone())),
        svc.key_manager().clone(),
    );
    let mut opts = SigningOptions::assertion(profile.signature_type, profile.signature_representation, profile.creator);
    opts.proof_purpose = PURPOSE_AUTHENTICATION.into();
    Fixture { svc, engine, opts }
}

async fn issue(svc: &CredentialService) -> Credential {
    svc.issue(CreateCredentialRequest {
        profile: "holder".into(),
        subject: json!({"id": "did:example:B", "name": "John Doe"}),
        ..Default::default()
    })
    .await
    .unwrap()
}

async fn signed_presentation(f: &Fixture, credentials: Vec<Value>) -> Vec<u8> {
    let vp = Presentation::from_slice(
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifiableCredential": credentials,
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap();
    let signed = f.engine.sign_presentation(vp, &f.opts).await.unwrap();
    serde_json::to_vec(&signed).unwrap()
}

#[tokio::test]
async fn test_presentation_with_valid_credentials() {
    let f = fixture().await;
    let first = issue(&f.svc).await.to_value().unwrap();
    // Embedded credentials may also arrive as JSON strings.
    let second = Value::String(serde_json::to_string(&issue(&f.svc).await).unwrap());

    let raw = signed_presentation(&f, vec![first, second]).await;
    let result = f.svc.verify_presentation(&raw).await;
    assert!(result.verified, "{}", result.message);
}

#[tokio::test]
async fn test_presentation_rejects_tampered_embedded_credential() {
    let f = fixture().await;
    let good = issue(&f.svc).await.to_value().unwrap();
    let mut bad = issue(&f.svc).await.to_value().unwrap();
    bad["credentialSubject"]["name"] = json!("Jane Doe");

    // The presentation proof itself is valid; the second credential is not.
    let raw = signed_presentation(&f, vec![good, bad]).await;
    let result = f.svc.verify_presentation(&raw).await;
    assert!(!result.verified);
    assert!(result.message.starts_with("credential 1:"), "{}", result.message);
}

#[tokio::test]
async fn test_presentation_does_not_recheck_embedded_status() {
    let f = fixture().await;
    let vc = issue(&f.svc).await;
    let text = serde_json::to_string(&vc).unwrap();
    f.svc
        .update_status(UpdateStatusRequest {
            credential: RawValue::from_string(text.clone()).unwrap(),
            status: "Revoked".into(),
            status_reason: "Disciplinary action".into(),
        })
        .await
        .unwrap();

    let direct = f.svc.verify_credential(text.as_bytes()).await.unwrap();
    assert!(!direct.verified);
    assert!(direct.message.contains("Revoked"));

    // Embedded credentials get the proof check only.
    let raw = signed_presentation(&f, vec![vc.to_value().unwrap()]).await;
    let result = f.svc.verify_presentation(&raw).await;
    assert!(result.verified, "{}", result.message);
}

#[tokio::test]
async fn test_presentation_rejects_unsigned_embedded_credential() {
    let f = fixture().await;
    let mut unsigned = issue(&f.svc).await.to_value().unwrap();
    unsigned.as_object_mut().unwrap().remove("proof");

    let raw = signed_presentation(&f, vec![unsigned]).await;
    let result = f.svc.verify_presentation(&raw).await;
    assert!(!result.verified);
    assert!(result.message.starts_with("credential 0:"));
}

#[tokio::test]
async fn test_unsigned_presentation_rejected() {
    let f = fixture().await;
    let vc = issue(&f.svc).await.to_value().unwrap();
    let raw = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "type": ["VerifiablePresentation"],
        "verifiableCredential": [vc],
    })
    .to_string();

    let result = f.svc.verify_presentation(raw.as_bytes()).await;
    assert!(!result.verified);
}

#[tokio::test]
async fn test_tampered_presentation_rejected() {
    let f = fixture().await;
    let vc = issue(&f.svc).await.to_value().unwrap();
    let raw = signed_presentation(&f, vec![vc]).await;
    let mut value: Value = serde_json::from_slice(&raw).unwrap();
    value["holder"] = json!("did:example:mallory");

    let result = f.svc.verify_presentation(value.to_string().as_bytes()).await;
    assert!(!result.verified);
}

// =========================================================================
// Selectable checks
// =========================================================================

#[tokio::test]
async fn test_checks_default_to_proof() {
    let f = fixture().await;
    let vc = issue(&f.svc).await.to_value().unwrap();

    let outcome = f
        .svc
        .verify_checks(VerifyChecksRequest {
            credential: vc,
            opts: None,
        })
        .await;
    match outcome {
        ChecksOutcome::Passed { checks } => assert_eq!(checks, vec!["proof".to_string()]),
        ChecksOutcome::Failed { checks } => panic!("unexpected failures: {:?}", checks),
    }
}

#[tokio::test]
async fn test_checks_report_every_failure() {
    let f = fixture().await;
    let mut vc = issue(&f.svc).await.to_value().unwrap();
    vc["credentialSubject"]["name"] = json!("Jane Doe");

    let outcome = f
        .svc
        .verify_checks(VerifyChecksRequest {
            credential: vc,
            opts: Some(VerifyChecksOptions {
                checks: vec!["proof".into(), "revocation".into()],
            }),
        })
        .await;
    assert!(!outcome.is_passed());
    let ChecksOutcome::Failed { checks } = outcome else {
        unreachable!()
    };
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0].check, "proof");
    assert_eq!(checks[1].check, "revocation");
    assert_eq!(checks[1].error, "check not supported");
}
