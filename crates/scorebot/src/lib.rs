//! Mention-scoring bot.
//!
//! This crate provides:
//! - A paginated mentions stream and tweet resolution over the platform's web API
//! - Remote scoring on an asynchronous compute network with bounded backoff
//! - A synchronous structured-output fallback scorer
//! - Score replies and a sqlite record of processed tweets

pub mod auth;
pub mod config;
pub mod error;
pub mod fallback;
pub mod inference;
pub mod pipeline;
pub mod responder;
pub mod score;
pub mod storage;
pub mod twitter;

// Re-export main types
pub use config::{BackoffConfig, BotConfig};
pub use error::{BotError, Result};
pub use pipeline::{MentionOutcome, Pipeline, PipelineConfig, RunSummary};
pub use score::{ScoreResult, ScoreSource};
pub use storage::{DedupStore, ProcessedRecord, SqliteStore};
pub use twitter::{MentionEvent, Tweet};
