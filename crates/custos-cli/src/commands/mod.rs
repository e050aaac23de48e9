//! Subcommand implementations and the shared HTTP client.

pub mod issue;
pub mod keygen;
pub mod profile;
pub mod status;
pub mod vault;
pub mod verify;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Thin client for a node's HTTP API.
pub struct NodeClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

impl NodeClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub async fn post(&self, path: &str, body: &impl Serialize) -> anyhow::Result<reqwest::Response> {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("could not reach node at {}: {}", self.endpoint, e))
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<reqwest::Response> {
        self.http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("could not reach node at {}: {}", self.endpoint, e))
    }
}

/// Body of a successful response, or the node's error as an `anyhow` error.
pub async fn expect_success(resp: reqwest::Response, action: &str) -> anyhow::Result<String> {
    let status = resp.status();
    let text = resp.text().await?;
    if status.is_success() {
        return Ok(text);
    }
    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(env) => anyhow::bail!("{} failed (HTTP {}): {}: {}", action, status, env.error.kind, env.error.message),
        Err(_) => anyhow::bail!("{} failed (HTTP {})", action, status),
    }
}

/// A JSON argument given inline or as a path to a file.
pub fn read_json(arg: &str) -> anyhow::Result<Value> {
    let text = if std::path::Path::new(arg).exists() {
        std::fs::read_to_string(arg)?
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("invalid JSON: {}", e))
}

pub fn print_json(text: &str) {
    match serde_json::from_str::<Value>(text).and_then(|v| serde_json::to_string_pretty(&v)) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", text),
    }
}
