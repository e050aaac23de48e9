use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CredentialError;

pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const VC_TYPE: &str = "VerifiableCredential";
pub const VP_TYPE: &str = "VerifiablePresentation";
pub const STATUS_CREDENTIAL_TYPE: &str = "StatusCredential";
pub const STATUS_LIST_TYPE: &str = "CredentialStatusList2017";

/// A field that may hold a single value or a list of values.
///
/// The list form is tried first so that `OneOrMany<Value>` keeps arrays as
/// lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Many(items) => items,
            Self::One(item) => std::slice::from_ref(item),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }

    pub fn push(self, item: T) -> Self {
        let mut items = self.into_vec();
        items.push(item);
        Self::Many(items)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

/// Credential issuer: a bare identifier or an `{id, name}` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Issuer {
    Id(String),
    Object {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Issuer {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id, .. } => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Object { name, .. } => name.as_deref(),
        }
    }
}

/// `{id, type}` pair used by terms of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pointer to a credential's revocation-status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReference {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl StatusReference {
    pub fn new(locator: String) -> Self {
        Self {
            id: locator,
            type_name: STATUS_LIST_TYPE.to_string(),
        }
    }
}

/// Linked-data proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    pub verification_method: String,
    pub proof_purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

/// Verifiable credential. Fields this service does not interpret are kept in
/// `extra` and survive re-serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: OneOrMany<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub types: OneOrMany<String>,
    pub issuer: Issuer,
    pub issuance_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_subject: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<StatusReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_use: Option<OneOrMany<TypedId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<OneOrMany<Proof>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// Parse JSON bytes into a credential.
    pub fn from_slice(raw: &[u8]) -> Result<Self, CredentialError> {
        serde_json::from_slice(raw)
            .map_err(|e| CredentialError::MalformedField(format!("credential: {}", e)))
    }

    pub fn from_value(value: Value) -> Result<Self, CredentialError> {
        serde_json::from_value(value)
            .map_err(|e| CredentialError::MalformedField(format!("credential: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value, CredentialError> {
        serde_json::to_value(self).map_err(|e| CredentialError::Serialization(e.to_string()))
    }

    pub fn proofs(&self) -> &[Proof] {
        self.proof.as_ref().map(OneOrMany::as_slice).unwrap_or_default()
    }

    /// The `id` of the (first) credential subject, if any.
    pub fn subject_id(&self) -> Option<&str> {
        let subject = match &self.credential_subject {
            Value::Array(items) => items.first()?,
            other => other,
        };
        subject.get("id").and_then(Value::as_str)
    }
}

/// Verifiable presentation. Embedded credentials are kept as JSON so each
/// can be re-verified exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(rename = "@context")]
    pub context: OneOrMany<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub types: OneOrMany<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifiable_credential: Option<OneOrMany<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<OneOrMany<Proof>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Presentation {
    pub fn from_slice(raw: &[u8]) -> Result<Self, CredentialError> {
        serde_json::from_slice(raw)
            .map_err(|e| CredentialError::MalformedField(format!("presentation: {}", e)))
    }

    pub fn credentials(&self) -> &[Value] {
        self.verifiable_credential
            .as_ref()
            .map(OneOrMany::as_slice)
            .unwrap_or_default()
    }

    pub fn proofs(&self) -> &[Proof] {
        self.proof.as_ref().map(OneOrMany::as_slice).unwrap_or_default()
    }
}
