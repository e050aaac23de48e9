//! `custos profile`: create or fetch an issuing profile.

use clap::{Args, Subcommand};
use serde::Serialize;

use super::{expect_success, print_json, NodeClient};

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create a profile.
    Create(CreateArgs),
    /// Show a profile.
    Get {
        /// Profile name.
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Profile name.
    #[arg(short, long)]
    pub name: String,

    /// Base URI for credential ids.
    #[arg(short, long)]
    pub uri: String,

    #[arg(long, default_value = "Ed25519Signature2018")]
    pub signature_type: String,

    /// `jws` or `proofValue`.
    #[arg(long)]
    pub signature_representation: Option<String>,

    /// Issue under an existing DID instead of creating one.
    #[arg(long)]
    pub did: Option<String>,

    /// Base58 Ed25519 seed for `--did`.
    #[arg(long, requires = "did")]
    pub did_private_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProfileRequest<'a> {
    name: &'a str,
    uri: &'a str,
    signature_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_representation: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    did: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    did_private_key: Option<&'a str>,
}

pub async fn run(client: &NodeClient, cmd: &ProfileCommand) -> anyhow::Result<()> {
    let body = match cmd {
        ProfileCommand::Create(args) => {
            let req = CreateProfileRequest {
                name: &args.name,
                uri: &args.uri,
                signature_type: &args.signature_type,
                signature_representation: args.signature_representation.as_deref(),
                did: args.did.as_deref(),
                did_private_key: args.did_private_key.as_deref(),
            };
            expect_success(client.post("/profile", &req).await?, "profile creation").await?
        }
        ProfileCommand::Get { name } => {
            expect_success(client.get(&format!("/profile/{}", name), &[]).await?, "profile lookup").await?
        }
    };
    print_json(&body);
    Ok(())
}
