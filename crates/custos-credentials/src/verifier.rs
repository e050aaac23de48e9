use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use custos_identity::PublicKeyFetcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::SignatureEngine;
use crate::error::CredentialError;
use crate::model::Credential;
use crate::status::StatusListProvider;

const SUCCESS: &str = "success";
const CHECK_NOT_SUPPORTED: &str = "check not supported";

/// `{verified, message}` answer of credential and presentation verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub message: String,
}

impl VerificationResult {
    fn success() -> Self {
        Self {
            verified: true,
            message: SUCCESS.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
        }
    }
}

/// Named verification checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Proof,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proof => f.write_str("proof"),
        }
    }
}

impl FromStr for Check {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proof" => Ok(Self::Proof),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyChecksRequest {
    pub credential: Value,
    #[serde(default)]
    pub opts: Option<VerifyChecksOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyChecksOptions {
    #[serde(default)]
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check: String,
    pub error: String,
}

/// Result of a named-check run. Serializes as `{"checks": [...]}` in both
/// cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecksOutcome {
    Passed { checks: Vec<String> },
    Failed { checks: Vec<CheckFailure> },
}

impl ChecksOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Stateless verification pipeline.
#[derive(Clone)]
pub struct CredentialVerifier {
    engine: Arc<dyn SignatureEngine>,
    fetcher: Arc<dyn PublicKeyFetcher>,
    status: Arc<dyn StatusListProvider>,
}

impl CredentialVerifier {
    pub fn new(
        engine: Arc<dyn SignatureEngine>,
        fetcher: Arc<dyn PublicKeyFetcher>,
        status: Arc<dyn StatusListProvider>,
    ) -> Self {
        Self {
            engine,
            fetcher,
            status,
        }
    }

    /// Parse `raw` and verify its proofs. At least one proof is required.
    pub async fn check_proof(&self, raw: &[u8]) -> Result<Credential, CredentialError> {
        let credential = self.engine.verify_credential(raw, self.fetcher.as_ref()).await?;
        if credential.proofs().is_empty() {
            return Err(CredentialError::Verification("credential has no proof".into()));
        }
        Ok(credential)
    }

    /// Proof check, then revocation lookup. Only failures to consult the
    /// status list are returned as errors.
    pub async fn verify_credential(&self, raw: &[u8]) -> Result<VerificationResult, CredentialError> {
        let credential = match self.check_proof(raw).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::debug!(error = %e, "credential failed proof check");
                return Ok(VerificationResult::failed(e.to_string()));
            }
        };
        self.check_status(&credential).await
    }

    async fn check_status(&self, credential: &Credential) -> Result<VerificationResult, CredentialError> {
        let (Some(status), Some(credential_id)) = (&credential.credential_status, &credential.id) else {
            return Ok(VerificationResult::success());
        };
        let page = self
            .status
            .fetch_page(&status.id)
            .await
            .map_err(|e| CredentialError::StatusCheck(format!("failed to fetch status list {}: {}", status.id, e)))?;

        let Some(entry) = page.entry_for(credential_id) else {
            return Ok(VerificationResult::success());
        };
        let status_vc = self
            .check_proof(entry.get().as_bytes())
            .await
            .map_err(|e| CredentialError::StatusCheck(format!("invalid status credential: {}", e)))?;
        let subject = serde_json::to_string(&status_vc.credential_subject)
            .map_err(|e| CredentialError::StatusCheck(e.to_string()))?;
        tracing::info!(credential_id = %credential_id, "credential has a status entry");
        Ok(VerificationResult::failed(subject))
    }

    /// Verify the presentation proof, then the proof of every embedded
    /// credential. Any failure fails the presentation.
    pub async fn verify_presentation(&self, raw: &[u8]) -> VerificationResult {
        let presentation = match self.engine.verify_presentation(raw, self.fetcher.as_ref()).await {
            Ok(p) => p,
            Err(e) => return VerificationResult::failed(e.to_string()),
        };
        if presentation.proofs().is_empty() {
            return VerificationResult::failed("presentation has no proof");
        }

        for (index, embedded) in presentation.credentials().iter().enumerate() {
            let bytes = match embedded {
                Value::String(text) => text.as_bytes().to_vec(),
                other => other.to_string().into_bytes(),
            };
            if let Err(e) = self.check_proof(&bytes).await {
                return VerificationResult::failed(format!("credential {}: {}", index, e));
            }
        }
        VerificationResult::success()
    }

    /// Run the requested checks, `proof` when none are named. Unknown names
    /// are recorded as failures and the run continues.
    pub async fn verify_checks(&self, req: VerifyChecksRequest) -> ChecksOutcome {
        let names = match req.opts {
            Some(opts) if !opts.checks.is_empty() => opts.checks,
            _ => vec![Check::Proof.to_string()],
        };
        let raw = match &req.credential {
            Value::String(text) => text.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        };

        let mut failures = Vec::new();
        for name in &names {
            match name.parse::<Check>() {
                Ok(Check::Proof) => {
                    if let Err(e) = self.check_proof(&raw).await {
                        failures.push(CheckFailure {
                            check: name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
                Err(_) => failures.push(CheckFailure {
                    check: name.clone(),
                    error: CHECK_NOT_SUPPORTED.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            ChecksOutcome::Passed { checks: names }
        } else {
            ChecksOutcome::Failed { checks: failures }
        }
    }
}
