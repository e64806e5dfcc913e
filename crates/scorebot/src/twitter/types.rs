//! Platform data types.

use serde::{Deserialize, Serialize};

/// A notification that mentions the bot.
///
/// `root_tweet_id` is absent when the mention is not a reply; such events are
/// dropped by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionEvent {
    /// The tweet the mention replies to.
    pub root_tweet_id: Option<String>,
    /// The mention itself; replies are posted under it.
    pub mention_tweet_id: Option<String>,
}

impl MentionEvent {
    /// Create an event for a mention replying to `root`.
    #[must_use]
    pub fn reply(root: impl Into<String>, mention: impl Into<String>) -> Self {
        Self {
            root_tweet_id: Some(root.into()),
            mention_tweet_id: Some(mention.into()),
        }
    }
}

/// One page of the mentions timeline.
#[derive(Debug, Clone)]
pub struct MentionsPage {
    /// Value of the page's top cursor entry.
    pub cursor: String,
    /// Notifications in page order.
    pub events: Vec<MentionEvent>,
}

/// A resolved tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Unique tweet ID.
    pub tweet_id: String,
    /// Author account id.
    pub user_id: String,
    /// Author handle (without @).
    pub user_name: String,
    /// Full tweet text.
    pub text: String,
}

impl Tweet {
    /// Get the handle with @ prefix.
    #[must_use]
    pub fn at_handle(&self) -> String {
        format!("@{}", self.user_name)
    }
}

/// Confirmation returned after a reply is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResult {
    /// Id of the newly created reply, when the platform reports it.
    pub reply_id: Option<String>,
}
