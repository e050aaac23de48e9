//! Integration test: profile → issue → verify → store → revoke, across the
//! core, crypto, identity and credentials crates.

use std::collections::HashMap;
use std::sync::Arc;

use custos_credentials::{
    ComposeCredentialRequest, CreateCredentialRequest, CreateProfileRequest, Credential, CredentialService, ErrorKind,
    ServicePorts, ServiceSettings, StoreCredentialRequest, UpdateStatusRequest,
};
use custos_crypto::{EncryptionKeyPair, KeyPair};
use custos_identity::DidDocument;
use serde_json::value::RawValue;
use serde_json::json;

fn service_with(ports: ServicePorts, list_size: usize) -> CredentialService {
    let mut settings = ServiceSettings::new("issuer.example.com", "https://issuer.example.com", EncryptionKeyPair::generate());
    settings.list_size = list_size;
    CredentialService::new(ports, settings).expect("service should build")
}

fn service() -> CredentialService {
    service_with(ServicePorts::in_memory(), 50)
}

async fn create_profile(svc: &CredentialService, name: &str) {
    svc.create_profile(CreateProfileRequest {
        name: name.into(),
        uri: "https://example.com/credentials".into(),
        signature_type: "Ed25519Signature2018".into(),
        ..Default::default()
    })
    .await
    .expect("profile creation should succeed");
}

async fn issue(svc: &CredentialService, profile: &str, subject: &str) -> Credential {
    svc.issue(CreateCredentialRequest {
        profile: profile.into(),
        types: vec!["VerifiableCredential".into(), "UniversityDegreeCredential".into()],
        subject: json!({"id": subject, "degree": {"type": "BachelorDegree", "name": "Bachelor of Science"}}),
        ..Default::default()
    })
    .await
    .expect("issuance should succeed")
}

fn raw(text: &str) -> Box<RawValue> {
    RawValue::from_string(text.to_string()).unwrap()
}

// =========================================================================
// Issue, verify, revoke
// =========================================================================

#[tokio::test]
async fn test_issue_verify_revoke() {
    let svc = service();
    create_profile(&svc, "university").await;
    let vc = issue(&svc, "university", "did:example:B").await;
    let text = serde_json::to_string(&vc).unwrap();

    let result = svc.verify_credential(text.as_bytes()).await.unwrap();
    assert!(result.verified, "{}", result.message);
    assert_eq!(result.message, "success");

    svc.update_status(UpdateStatusRequest {
        credential: raw(&text),
        status: "Revoked".into(),
        status_reason: "Degree withdrawn".into(),
    })
    .await
    .expect("status update should succeed");

    let result = svc.verify_credential(text.as_bytes()).await.unwrap();
    assert!(!result.verified);
    let subject: serde_json::Value = serde_json::from_str(&result.message).unwrap();
    assert_eq!(subject["id"], json!(vc.id));
    assert_eq!(subject["currentStatus"], "Revoked");
    assert_eq!(subject["statusReason"], "Degree withdrawn");

    // Other credentials on the same page are unaffected.
    let other = issue(&svc, "university", "did:example:C").await;
    let result = svc
        .verify_credential(serde_json::to_string(&other).unwrap().as_bytes())
        .await
        .unwrap();
    assert!(result.verified);
}

#[tokio::test]
async fn test_latest_status_wins() {
    let svc = service();
    create_profile(&svc, "university").await;
    let vc = issue(&svc, "university", "did:example:B").await;
    let text = serde_json::to_string(&vc).unwrap();

    for (status, reason) in [("Suspended", "Pending review"), ("Revoked", "Fraud")] {
        svc.update_status(UpdateStatusRequest {
            credential: raw(&text),
            status: status.into(),
            status_reason: reason.into(),
        })
        .await
        .unwrap();
    }

    let result = svc.verify_credential(text.as_bytes()).await.unwrap();
    assert!(result.message.contains("Fraud"));
    let locator = vc.credential_status.as_ref().unwrap().id.clone();
    let index = locator.rsplit('/').next().unwrap();
    assert_eq!(svc.status_page(index).await.unwrap().vc.len(), 1);
}

#[tokio::test]
async fn test_tampered_credential_not_verified() {
    let svc = service();
    create_profile(&svc, "university").await;
    let mut value = issue(&svc, "university", "did:example:B").await.to_value().unwrap();
    value["credentialSubject"]["degree"]["name"] = json!("Doctor of Medicine");

    let result = svc.verify_credential(value.to_string().as_bytes()).await.unwrap();
    assert!(!result.verified);
}

#[tokio::test]
async fn test_update_status_for_foreign_issuer_rejected() {
    let svc = service();
    create_profile(&svc, "university").await;
    let mut vc = issue(&svc, "university", "did:example:B").await;
    vc.issuer = custos_credentials::Issuer::Object {
        id: vc.issuer.id().to_string(),
        name: Some("unknown".into()),
    };
    // Changing the issuer breaks the proof before the profile is looked up.
    let err = svc
        .update_status(UpdateStatusRequest {
            credential: raw(&serde_json::to_string(&vc).unwrap()),
            status: "Revoked".into(),
            status_reason: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Verify);
}

// =========================================================================
// Status reference allocation
// =========================================================================

#[tokio::test]
async fn test_concurrent_issuance_respects_page_size() {
    let svc = Arc::new(service_with(ServicePorts::in_memory(), 3));
    create_profile(&svc, "university").await;

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let svc = svc.clone();
            tokio::spawn(async move { issue(&svc, "university", &format!("did:example:{}", i)).await })
        })
        .collect();

    let mut per_page: HashMap<String, usize> = HashMap::new();
    let mut ids = Vec::new();
    for handle in handles {
        let vc = handle.await.unwrap();
        *per_page.entry(vc.credential_status.unwrap().id).or_default() += 1;
        ids.push(vc.id.unwrap());
    }

    assert_eq!(per_page.len(), 4);
    assert!(per_page.values().all(|n| *n <= 3));
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

// =========================================================================
// Confidential storage
// =========================================================================

#[tokio::test]
async fn test_store_is_idempotent() {
    let svc = service();
    create_profile(&svc, "university").await;
    let vc = issue(&svc, "university", "did:example:B").await;
    let text = serde_json::to_string_pretty(&vc).unwrap();

    let first = svc
        .store(StoreCredentialRequest {
            profile: "university".into(),
            credential: raw(&text),
        })
        .await
        .unwrap();
    let second = svc
        .store(StoreCredentialRequest {
            profile: "university".into(),
            credential: raw(&serde_json::to_string(&text).unwrap()),
        })
        .await
        .unwrap();
    assert_eq!(first, second);

    // Retrieval returns the credential exactly as submitted, whitespace included.
    let retrieved = svc.retrieve("university", vc.id.as_deref().unwrap()).await.unwrap();
    assert_eq!(retrieved, text);
}

#[tokio::test]
async fn test_retrieve_unknown() {
    let svc = service();
    create_profile(&svc, "university").await;
    let err = svc.retrieve("university", "https://example.com/credentials/nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_store_retry_after_failed_write() {
    let svc = service();
    create_profile(&svc, "university").await;
    let vc = issue(&svc, "university", "did:example:B").await;
    let text = serde_json::to_string(&vc).unwrap();

    let err = svc
        .store(StoreCredentialRequest {
            profile: "no-such-vault".into(),
            credential: raw(&text),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    svc.store(StoreCredentialRequest {
        profile: "university".into(),
        credential: raw(&text),
    })
    .await
    .expect("store after a failed attempt should succeed");
    assert_eq!(svc.retrieve("university", vc.id.as_deref().unwrap()).await.unwrap(), text);
}

#[tokio::test]
async fn test_retrieve_with_wrong_storage_key_is_corruption() {
    let ports = ServicePorts::in_memory();
    let svc = service_with(ports.clone(), 50);
    create_profile(&svc, "university").await;
    let vc = issue(&svc, "university", "did:example:B").await;
    svc.store(StoreCredentialRequest {
        profile: "university".into(),
        credential: raw(&serde_json::to_string(&vc).unwrap()),
    })
    .await
    .unwrap();

    let rekeyed = service_with(ports, 50);
    let err = rekeyed.retrieve("university", vc.id.as_deref().unwrap()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageCorruption);
}

// =========================================================================
// Compose and issue
// =========================================================================

#[tokio::test]
async fn test_compose_and_issue_with_registered_did() {
    let svc = service();
    let keypair = KeyPair::generate();
    let public = svc.key_manager().import_signing_key(&keypair).unwrap();
    svc.did_manager()
        .register(&DidDocument::new("did:example:A".into(), public))
        .unwrap();

    let vc = svc
        .compose_and_issue(ComposeCredentialRequest {
            issuer: "did:example:A".into(),
            subject: "did:example:B".into(),
            types: vec!["UniversityDegree".into()],
            claims: Some(json!({"name": "John Doe"})),
            proof_format: Some("jws".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let proof = &vc.proofs()[0];
    assert_eq!(proof.proof_type, "Ed25519Signature2018");
    assert!(!proof.jws.as_deref().unwrap_or_default().is_empty());
    assert!(vc.credential_status.is_none());

    let result = svc
        .verify_credential(serde_json::to_string(&vc).unwrap().as_bytes())
        .await
        .unwrap();
    assert!(result.verified, "{}", result.message);
}
