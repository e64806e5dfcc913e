//! Bot configuration.
//!
//! Every component receives the slice of `BotConfig` it needs at construction time;
//! nothing reads credentials from the environment after startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Session;
use crate::error::{BotError, Result};

/// Default base URL for the platform's GraphQL API.
pub const DEFAULT_TWITTER_API_BASE: &str = "https://x.com/i/api";
/// Default message unit (write path) of the compute network.
pub const DEFAULT_AO_MU_URL: &str = "https://mu.ao-testnet.xyz";
/// Default compute unit (dry-run path) of the compute network.
pub const DEFAULT_AO_CU_URL: &str = "https://cu.ao-testnet.xyz";
/// Default chat completions endpoint for the fallback scorer.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default fallback model.
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4o-mini";

/// Mentions fetched per page.
pub const MENTIONS_PAGE_SIZE: u32 = 20;

/// Poll schedule for remote scoring jobs.
///
/// The wait doubles after every attempt; only the starting point and the
/// number of attempts are tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Sleep before the first poll.
    pub initial_wait: Duration,
    /// Number of polls before falling back.
    pub retries: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(60),
            retries: 3,
        }
    }
}

/// Compute network settings.
#[derive(Debug, Clone)]
pub struct ComputeConfig {
    /// Process that receives `Infer` messages and answers `GetTaskByTid` queries.
    pub process_id: String,
    /// Arweave JWK keyfile whose key signs outbound messages.
    pub wallet_path: PathBuf,
    /// Message unit URL.
    pub mu_url: String,
    /// Compute unit URL.
    pub cu_url: String,
}

/// Fallback scorer settings.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// API key for the completion backend.
    pub api_key: String,
    /// Completion endpoint.
    pub url: String,
    /// Model name.
    pub model: String,
}

/// Full configuration for one bot process.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Platform credentials.
    pub session: Session,
    /// GraphQL API base URL.
    pub twitter_api_base: String,
    /// Unconditional delay before every outbound platform call.
    pub request_delay: Duration,
    /// Account id of the bot itself; threads rooted on this account are skipped.
    pub self_user_id: Option<String>,
    pub compute: ComputeConfig,
    pub fallback: FallbackConfig,
    pub backoff: BackoffConfig,
    /// Sqlite database holding processed records.
    pub db_path: PathBuf,
}

impl BotConfig {
    /// Check the configuration for values that would only fail later, mid-pipeline.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("bearer token", self.session.bearer_token.as_str()),
            ("auth token", self.session.auth_token.as_str()),
            ("csrf token", self.session.ct0.as_str()),
            ("process id", self.compute.process_id.as_str()),
            ("fallback api key", self.fallback.api_key.as_str()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BotError::Config(format!("{name} is empty")));
            }
        }

        if self.compute.wallet_path.as_os_str().is_empty() {
            return Err(BotError::Config("wallet path is empty".to_string()));
        }

        if self.backoff.initial_wait.is_zero() {
            return Err(BotError::Config(
                "poll wait must be greater than zero".to_string(),
            ));
        }

        if matches!(&self.self_user_id, Some(id) if id.trim().is_empty()) {
            return Err(BotError::Config("self user id is empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> BotConfig {
    BotConfig {
        session: Session::new("bearer", "auth", "csrf"),
        twitter_api_base: DEFAULT_TWITTER_API_BASE.to_string(),
        request_delay: Duration::from_secs(10),
        self_user_id: Some("42".to_string()),
        compute: ComputeConfig {
            process_id: "proc".to_string(),
            wallet_path: PathBuf::from("wallet.json"),
            mu_url: DEFAULT_AO_MU_URL.to_string(),
            cu_url: DEFAULT_AO_CU_URL.to_string(),
        },
        fallback: FallbackConfig {
            api_key: "sk-test".to_string(),
            url: DEFAULT_OPENAI_URL.to_string(),
            model: DEFAULT_FALLBACK_MODEL.to_string(),
        },
        backoff: BackoffConfig::default(),
        db_path: PathBuf::from("state.sqlite"),
    }
}
