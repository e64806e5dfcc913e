//! Durable storage of processed tweets.
//!
//! A tweet id present in the store has been resolved, scored and replied to.

mod dedup;
mod sqlite;

pub use dedup::{DedupStore, ProcessedRecord, RecordPage, STATUS_REPLIED};
pub use sqlite::SqliteStore;
