//! Processed-record types and the dedup store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::score::ScoreResult;
use crate::twitter::Tweet;

/// Status stored with every record. Records are written only once the reply
/// is posted, so there is no other state.
pub const STATUS_REPLIED: &str = "replied";

/// A fully processed tweet: resolved, scored and replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub tweet: Tweet,
    pub score: ScoreResult,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedRecord {
    #[must_use]
    pub fn new(tweet: Tweet, score: ScoreResult) -> Self {
        Self {
            tweet,
            score,
            processed_at: Utc::now(),
        }
    }

    /// Key under which the record is stored.
    pub fn tweet_id(&self) -> &str {
        &self.tweet.tweet_id
    }
}

/// A page of stored records, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub start: u32,
    pub limit: u32,
    pub total: u32,
    pub count: u32,
    pub has_more: bool,
    pub records: Vec<ProcessedRecord>,
}

/// Durable record of processed tweets.
///
/// Each call is atomic on its own; nothing spans several records.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether a tweet has already been fully processed.
    async fn exists(&self, tweet_id: &str) -> Result<bool>;

    /// Insert or replace the record for `record.tweet.tweet_id`.
    async fn upsert(&self, record: &ProcessedRecord) -> Result<()>;

    /// Look up one record.
    async fn get(&self, tweet_id: &str) -> Result<Option<ProcessedRecord>>;

    /// Read a page of records ordered by processing time, newest first.
    async fn page(&self, start: u32, limit: u32) -> Result<RecordPage>;
}
