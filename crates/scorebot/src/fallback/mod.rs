//! Synchronous fallback scoring, used when the remote task is too slow.

mod openai;
mod prompts;

use async_trait::async_trait;

use crate::error::Result;
use crate::score::ScoreResult;
use crate::twitter::Tweet;

pub use openai::OpenAiScorer;
pub use prompts::PromptManager;

/// Blocking alternate scorer.
#[async_trait]
pub trait FallbackScorer: Send + Sync {
    /// Score a tweet. Results carry [`crate::score::ScoreSource::Fallback`].
    async fn score(&self, tweet: &Tweet) -> Result<ScoreResult>;
}
