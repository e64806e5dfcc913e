//! Error types for the scoring bot.

use thiserror::Error;

/// Errors raised by the mention pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum BotError {
    /// HTTP request failed before a usable response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Transport {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// An expected field or entry was absent from a response payload.
    #[error("Malformed response: {context}")]
    MalformedResponse { context: String },

    /// The conversation view for a tweet could not be turned into a `Tweet`.
    #[error("Failed to resolve tweet '{tweet_id}': {reason}")]
    Resolution { tweet_id: String, reason: String },

    /// A message could not be signed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The synchronous fallback scorer failed.
    #[error("Fallback scorer failed: {0}")]
    Fallback(String),

    /// Posting the reply failed.
    #[error("Failed to post reply to '{tweet_id}': {reason}")]
    Post { tweet_id: String, reason: String },

    /// Durable store failure.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Prompt template failure.
    #[error("Template error: {0}")]
    Template(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotError {
    /// Shorthand for a [`BotError::MalformedResponse`].
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: context.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BotError>;
