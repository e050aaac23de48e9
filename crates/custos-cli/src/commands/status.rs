//! `custos update-status`: revoke or suspend an issued credential.

use clap::Args;
use serde::Serialize;

use super::{expect_success, read_json, NodeClient};

#[derive(Args, Debug)]
pub struct UpdateStatusArgs {
    /// Credential JSON (inline or file path).
    #[arg(short, long)]
    pub credential: String,

    /// New status, e.g. `Revoked`.
    #[arg(short, long)]
    pub status: String,

    #[arg(short, long, default_value = "")]
    pub reason: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest<'a> {
    credential: String,
    status: &'a str,
    status_reason: &'a str,
}

pub async fn run(client: &NodeClient, args: &UpdateStatusArgs) -> anyhow::Result<()> {
    let req = UpdateStatusRequest {
        credential: read_json(&args.credential)?.to_string(),
        status: &args.status,
        status_reason: &args.reason,
    };
    expect_success(client.post("/updateStatus", &req).await?, "status update").await?;
    println!("Status set to {}", args.status);
    Ok(())
}
