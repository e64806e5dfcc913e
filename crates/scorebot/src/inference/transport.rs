//! Send-message and dry-run primitives of the remote compute network.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::data_item::sign_data_item;
use super::wallet::Wallet;
use crate::config::ComputeConfig;
use crate::error::{BotError, Result};

/// A name/value tag attached to a message or query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The `Action` tag that selects a handler in the target process.
    pub fn action(value: impl Into<String>) -> Self {
        Self::new("Action", value)
    }
}

/// Result of a dry-run query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DryRunResult {
    #[serde(rename = "Messages", default)]
    pub messages: Vec<OutboxMessage>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

/// A message emitted by the process while evaluating a dry run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutboxMessage {
    #[serde(rename = "Data", default)]
    pub data: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

/// Write and read primitives of the compute network.
#[async_trait]
pub trait ComputeNetwork: Send + Sync {
    /// Send a signed message to the configured process. Returns the message id.
    async fn send_message(&self, tags: &[Tag], data: &str) -> Result<String>;

    /// Evaluate a read-only query against the process.
    async fn dry_run(&self, tags: &[Tag], data: &str) -> Result<DryRunResult>;
}

/// HTTP gateway that uploads signed data items to a message unit and sends
/// dry runs to a compute unit.
#[derive(Debug)]
pub struct AoGateway {
    client: Client,
    process_id: String,
    target: [u8; 32],
    wallet: Wallet,
    mu_url: String,
    cu_url: String,
}

impl AoGateway {
    /// Load the wallet keyfile named in `config` and build a gateway.
    pub fn new(config: &ComputeConfig) -> Result<Self> {
        let wallet = Wallet::load(&config.wallet_path)?;
        tracing::info!(address = %wallet.address(), "Loaded compute network wallet");
        Self::with_wallet(config, wallet)
    }

    /// Build a gateway around an already loaded wallet.
    pub fn with_wallet(config: &ComputeConfig, wallet: Wallet) -> Result<Self> {
        let target = URL_SAFE_NO_PAD
            .decode(&config.process_id)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| {
                BotError::Config(format!(
                    "process id '{}' is not a 43-character base64url id",
                    config.process_id
                ))
            })?;

        Ok(Self {
            client: Client::builder().build()?,
            process_id: config.process_id.clone(),
            target,
            wallet,
            mu_url: config.mu_url.trim_end_matches('/').to_string(),
            cu_url: config.cu_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ComputeNetwork for AoGateway {
    async fn send_message(&self, tags: &[Tag], data: &str) -> Result<String> {
        let mut all_tags = vec![
            Tag::new("Data-Protocol", "ao"),
            Tag::new("Variant", "ao.TN.1"),
            Tag::new("Type", "Message"),
        ];
        all_tags.extend_from_slice(tags);

        let anchor: [u8; 32] = rand::random();
        let item = sign_data_item(
            &self.wallet,
            &self.target,
            &anchor,
            &all_tags,
            data.as_bytes(),
        )?;

        let response = self
            .client
            .post(format!("{}/", self.mu_url))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(ACCEPT, "application/json")
            .body(item.bytes)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BotError::Transport {
                service: "message unit",
                status: status.as_u16(),
                body,
            });
        }

        #[derive(Deserialize)]
        struct Accepted {
            id: Option<String>,
        }
        let accepted = serde_json::from_str::<Accepted>(&body)
            .ok()
            .and_then(|a| a.id);
        Ok(accepted.unwrap_or(item.id))
    }

    async fn dry_run(&self, tags: &[Tag], data: &str) -> Result<DryRunResult> {
        let body = json!({
            "Id": "1234",
            "Owner": "1234",
            "Anchor": "1234",
            "Target": self.process_id,
            "Data": data,
            "Tags": tags,
        });

        let response = self
            .client
            .post(format!("{}/dry-run", self.cu_url))
            .query(&[("process-id", self.process_id.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport {
                service: "compute unit",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<DryRunResult>().await?)
    }
}
