//! `custos keygen`: create a key pair in the node's key manager.

use serde::Deserialize;

use super::{expect_success, NodeClient};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateKeypairResponse {
    public_key: String,
}

pub async fn run(client: &NodeClient) -> anyhow::Result<()> {
    let body = expect_success(client.get("/kms/generatekeypair", &[]).await?, "key generation").await?;
    let resp: GenerateKeypairResponse = serde_json::from_str(&body)?;
    println!("Public key: {}", resp.public_key);
    Ok(())
}
