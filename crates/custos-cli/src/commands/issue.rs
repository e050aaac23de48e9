//! `custos issue` and `custos compose`: credential issuance.

use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use super::{expect_success, print_json, read_json, NodeClient};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Issuing profile.
    #[arg(short, long)]
    pub profile: String,

    /// Credential subject as JSON (inline or file path).
    #[arg(short, long)]
    pub subject: String,

    /// Credential type(s), comma-separated.
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub types: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Issuer DID.
    #[arg(short, long)]
    pub issuer: String,

    /// Subject id.
    #[arg(short, long)]
    pub subject: String,

    /// Credential type(s), comma-separated.
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Subject claims as a JSON object (inline or file path).
    #[arg(short, long)]
    pub claims: Option<String>,

    /// `jws` or `proofValue`.
    #[arg(long, default_value = "jws")]
    pub proof_format: String,

    /// Sign with this DID instead of the issuer's.
    #[arg(long)]
    pub kid: Option<String>,
}

#[derive(Serialize)]
struct CreateCredentialRequest<'a> {
    profile: &'a str,
    #[serde(rename = "type", skip_serializing_if = "<[String]>::is_empty")]
    types: &'a [String],
    #[serde(rename = "credentialSubject")]
    subject: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComposeRequest<'a> {
    issuer: &'a str,
    subject: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    types: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<Value>,
    proof_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof_format_options: Option<Value>,
}

pub async fn run_issue(client: &NodeClient, args: &IssueArgs) -> anyhow::Result<()> {
    let req = CreateCredentialRequest {
        profile: &args.profile,
        types: &args.types,
        subject: read_json(&args.subject)?,
    };
    let body = expect_success(client.post("/credential", &req).await?, "issuance").await?;
    print_json(&body);
    Ok(())
}

pub async fn run_compose(client: &NodeClient, args: &ComposeArgs) -> anyhow::Result<()> {
    let req = ComposeRequest {
        issuer: &args.issuer,
        subject: &args.subject,
        types: &args.types,
        claims: args.claims.as_deref().map(read_json).transpose()?,
        proof_format: &args.proof_format,
        proof_format_options: args.kid.as_ref().map(|kid| json!({ "kid": kid })),
    };
    let body = expect_success(
        client.post("/credentials/composeAndIssueCredential", &req).await?,
        "compose and issue",
    )
    .await?;
    print_json(&body);
    Ok(())
}
