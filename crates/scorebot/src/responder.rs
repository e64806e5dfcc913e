//! Posts score replies.

use std::sync::Arc;

use crate::error::{BotError, Result};
use crate::score::ScoreResult;
use crate::twitter::parser::parse_create_reply;
use crate::twitter::{PostResult, TwitterApi};

/// Replies are cut to this many characters.
pub const MAX_REPLY_CHARS: usize = 150;

/// Build the reply text for a score, truncated to [`MAX_REPLY_CHARS`] characters.
#[must_use]
pub fn format_reply(result: &ScoreResult) -> String {
    truncate_chars(&result.reply_text(), MAX_REPLY_CHARS)
}

/// Truncate text, respecting UTF-8 character boundaries.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Posts replies under mentions. Failures are not retried.
pub struct Responder {
    api: Arc<dyn TwitterApi>,
}

impl Responder {
    #[must_use]
    pub fn new(api: Arc<dyn TwitterApi>) -> Self {
        Self { api }
    }

    /// Reply to `mention_tweet_id` with the formatted score.
    pub async fn reply(&self, mention_tweet_id: &str, result: &ScoreResult) -> Result<PostResult> {
        let text = format_reply(result);
        let body = self
            .api
            .create_reply(mention_tweet_id, &text)
            .await
            .map_err(|e| BotError::Post {
                tweet_id: mention_tweet_id.to_string(),
                reason: e.to_string(),
            })?;
        let posted = parse_create_reply(mention_tweet_id, &body)?;
        tracing::info!(
            in_reply_to = mention_tweet_id,
            reply_id = posted.reply_id.as_deref().unwrap_or("unknown"),
            "Posted reply"
        );
        Ok(posted)
    }
}
