//! `custos store` and `custos retrieve`: confidential credential storage.

use clap::Args;
use serde::Serialize;

use super::{expect_success, print_json, read_json, NodeClient};

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Vault (profile) to store into.
    #[arg(short, long)]
    pub profile: String,

    /// Credential JSON (inline or file path).
    #[arg(short, long)]
    pub credential: String,
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    #[arg(short, long)]
    pub profile: String,

    /// Credential id.
    #[arg(short, long)]
    pub id: String,
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    profile: &'a str,
    credential: String,
}

pub async fn run_store(client: &NodeClient, args: &StoreArgs) -> anyhow::Result<()> {
    let credential = read_json(&args.credential)?;
    let req = StoreRequest {
        profile: &args.profile,
        credential: credential.to_string(),
    };
    expect_success(client.post("/store", &req).await?, "store").await?;
    println!("Credential stored in vault {}", args.profile);
    Ok(())
}

pub async fn run_retrieve(client: &NodeClient, args: &RetrieveArgs) -> anyhow::Result<()> {
    let resp = client
        .get("/retrieve", &[("profile", args.profile.as_str()), ("id", args.id.as_str())])
        .await?;
    print_json(&expect_success(resp, "retrieve").await?);
    Ok(())
}
