//! Integration test: an issuer node and a verifier node with separate
//! storage. The verifier resolves issuer DIDs from the DID itself.

use custos_credentials::{
    ComposeCredentialRequest, CreateCredentialRequest, CreateProfileRequest, Credential, CredentialService, ErrorKind,
    Profile, ServicePorts, ServiceSettings, VerifyChecksRequest,
};
use custos_crypto::EncryptionKeyPair;
use serde_json::json;

fn node(host_url: &str) -> CredentialService {
    let settings = ServiceSettings::new("issuer.example.com", host_url, EncryptionKeyPair::generate());
    CredentialService::new(ServicePorts::in_memory(), settings).unwrap()
}

async fn issuer_profile(svc: &CredentialService) -> Profile {
    svc.create_profile(CreateProfileRequest {
        name: "university".into(),
        uri: "https://example.com/credentials".into(),
        signature_type: "Ed25519Signature2018".into(),
        ..Default::default()
    })
    .await
    .unwrap()
}

async fn compose(svc: &CredentialService, issuer: &str) -> Credential {
    svc.compose_and_issue(ComposeCredentialRequest {
        issuer: issuer.into(),
        subject: "did:example:B".into(),
        types: vec!["UniversityDegree".into()],
        claims: Some(json!({"name": "John Doe"})),
        ..Default::default()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_verifier_node_verifies_issuer_credential() {
    let issuer = node("http://127.0.0.1:1");
    let verifier = node("http://127.0.0.1:1");
    let profile = issuer_profile(&issuer).await;
    let vc = compose(&issuer, &profile.did).await;
    let raw = serde_json::to_vec(&vc).unwrap();

    assert!(verifier.did_manager().resolve_did(&profile.did).unwrap().is_none());
    let result = verifier.verify_credential(&raw).await.unwrap();
    assert!(result.verified, "{}", result.message);

    let outcome = verifier
        .verify_checks(VerifyChecksRequest {
            credential: vc.to_value().unwrap(),
            opts: None,
        })
        .await;
    assert!(outcome.is_passed());
}

#[tokio::test]
async fn test_verifier_node_detects_tampering() {
    let issuer = node("http://127.0.0.1:1");
    let verifier = node("http://127.0.0.1:1");
    let profile = issuer_profile(&issuer).await;
    let mut value = compose(&issuer, &profile.did).await.to_value().unwrap();
    value["credentialSubject"]["name"] = json!("Jane Doe");

    let result = verifier.verify_credential(value.to_string().as_bytes()).await.unwrap();
    assert!(!result.verified);
}

#[tokio::test]
async fn test_verifier_node_status_source_unreachable() {
    let issuer = node("http://127.0.0.1:1");
    let verifier = node("http://127.0.0.1:1");
    issuer_profile(&issuer).await;
    let vc = issuer
        .issue(CreateCredentialRequest {
            profile: "university".into(),
            subject: json!({"id": "did:example:B"}),
            ..Default::default()
        })
        .await
        .unwrap();

    // The proof verifies; the issuer's status list cannot be reached.
    let err = verifier
        .verify_credential(&serde_json::to_vec(&vc).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StatusCheck);
}

#[tokio::test]
async fn test_profile_for_did_created_elsewhere() {
    let origin = node("http://127.0.0.1:1");
    let other = node("http://127.0.0.1:1");
    let created = issuer_profile(&origin).await;

    let profile = other
        .create_profile(CreateProfileRequest {
            name: "mirror".into(),
            uri: "https://example.com/credentials".into(),
            signature_type: "Ed25519Signature2018".into(),
            did: Some(created.did.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.did, created.did);
    assert_eq!(profile.creator, created.creator);
}
