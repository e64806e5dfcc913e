//! Tweet resolver.

use std::sync::Arc;

use super::client::TwitterApi;
use super::parser::parse_tweet_detail;
use super::types::Tweet;
use crate::error::{BotError, Result};

/// Fetches and normalizes a tweet by id.
pub struct TweetResolver {
    api: Arc<dyn TwitterApi>,
}

impl TweetResolver {
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }

    /// Resolve a tweet id to its author and text.
    ///
    /// Network failures are reported as resolution failures too, so callers
    /// see a single error kind for "could not get this tweet".
    pub async fn resolve(&self, tweet_id: &str) -> Result<Tweet> {
        let body = self
            .api
            .fetch_tweet_detail(tweet_id)
            .await
            .map_err(|e| match e {
                BotError::Resolution { .. } => e,
                other => BotError::Resolution {
                    tweet_id: tweet_id.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let tweet = parse_tweet_detail(tweet_id, &body)?;
        if tweet.tweet_id != tweet_id {
            // Positional extraction picked a different tweet than requested.
            tracing::warn!(
                requested = tweet_id,
                resolved = %tweet.tweet_id,
                "Focal tweet id differs from requested id"
            );
        }
        tracing::debug!(tweet_id, author = %tweet.at_handle(), "Resolved tweet");
        Ok(tweet)
    }
}
