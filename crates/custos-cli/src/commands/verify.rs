//! `custos verify`, `custos verify-presentation` and `custos check`.

use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{expect_success, read_json, NodeClient};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON (inline or file path).
    #[arg(short, long)]
    pub credential: String,
}

#[derive(Args, Debug)]
pub struct VerifyPresentationArgs {
    /// Presentation JSON (inline or file path).
    #[arg(short, long)]
    pub presentation: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Credential JSON (inline or file path).
    #[arg(short, long)]
    pub credential: String,

    /// Checks to run, comma-separated. Defaults to `proof`.
    #[arg(long, value_delimiter = ',')]
    pub checks: Vec<String>,
}

#[derive(Deserialize)]
struct VerificationResult {
    verified: bool,
    message: String,
}

#[derive(Serialize)]
struct ChecksRequest {
    credential: Value,
    opts: ChecksOptions,
}

#[derive(Serialize)]
struct ChecksOptions {
    checks: Vec<String>,
}

fn report(kind: &str, result: &VerificationResult) {
    if result.verified {
        println!("{} is VALID", kind);
    } else {
        println!("{} is INVALID", kind);
        println!("  {}", result.message);
    }
}

pub async fn run_verify(client: &NodeClient, args: &VerifyArgs) -> anyhow::Result<()> {
    let credential = read_json(&args.credential)?;
    let body = expect_success(client.post("/verify", &credential).await?, "verification").await?;
    report("Credential", &serde_json::from_str(&body)?);
    Ok(())
}

pub async fn run_verify_presentation(client: &NodeClient, args: &VerifyPresentationArgs) -> anyhow::Result<()> {
    let presentation = read_json(&args.presentation)?;
    let body = expect_success(
        client.post("/verifyPresentation", &presentation).await?,
        "presentation verification",
    )
    .await?;
    report("Presentation", &serde_json::from_str(&body)?);
    Ok(())
}

pub async fn run_check(client: &NodeClient, args: &CheckArgs) -> anyhow::Result<()> {
    let req = ChecksRequest {
        credential: read_json(&args.credential)?,
        opts: ChecksOptions {
            checks: args.checks.clone(),
        },
    };
    let resp = client.post("/verifications", &req).await?;
    let passed = resp.status().is_success();
    let body: Value = resp.json().await?;
    let checks = body["checks"].as_array().cloned().unwrap_or_default();
    for check in &checks {
        match check {
            Value::String(name) => println!("  [PASS] {}", name),
            other => println!(
                "  [FAIL] {}: {}",
                other["check"].as_str().unwrap_or_default(),
                other["error"].as_str().unwrap_or_default()
            ),
        }
    }
    if !passed {
        anyhow::bail!("{} check(s) failed", checks.len());
    }
    Ok(())
}
