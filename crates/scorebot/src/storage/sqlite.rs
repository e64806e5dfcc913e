//! Sqlite-backed dedup store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

use super::dedup::{DedupStore, ProcessedRecord, RecordPage, STATUS_REPLIED};
use crate::error::{BotError, Result};
use crate::score::{ScoreResult, ScoreSource};
use crate::twitter::Tweet;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS tweets (
    tweet_id TEXT PRIMARY KEY,
    tweet TEXT,
    status TEXT,
    score INTEGER,
    commentary TEXT,
    source TEXT,
    processed_at TEXT
)";

#[derive(sqlx::FromRow)]
struct TweetRow {
    tweet: String,
    score: Option<i64>,
    commentary: Option<String>,
    source: Option<String>,
    processed_at: Option<DateTime<Utc>>,
}

impl TweetRow {
    fn into_record(self) -> Result<ProcessedRecord> {
        let tweet: Tweet = serde_json::from_str(&self.tweet)?;
        let source = self
            .source
            .as_deref()
            .and_then(ScoreSource::parse)
            .unwrap_or(ScoreSource::Remote);
        Ok(ProcessedRecord {
            tweet,
            score: ScoreResult {
                score: self.score,
                reasoning: self.commentary.unwrap_or_default(),
                source,
            },
            processed_at: self.processed_at.unwrap_or_default(),
        })
    }
}

/// Dedup store on a single sqlite table keyed by tweet id.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| BotError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        tracing::info!(path = %path.display(), "Opened record store");
        Self::init(pool).await
    }

    /// Open an existing database without write access. A missing file is an
    /// error rather than a new empty store.
    pub async fn open_read_only(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BotError::Config(format!("no record store at {}", path.display())));
        }

        let url = format!("sqlite://{}?mode=ro", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DedupStore for SqliteStore {
    async fn exists(&self, tweet_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tweets WHERE tweet_id = ?)")
                .bind(tweet_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn upsert(&self, record: &ProcessedRecord) -> Result<()> {
        let tweet = serde_json::to_string(&record.tweet)?;
        sqlx::query(
            "INSERT OR REPLACE INTO tweets
                (tweet_id, tweet, status, score, commentary, source, processed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.tweet_id())
        .bind(tweet)
        .bind(STATUS_REPLIED)
        .bind(record.score.score)
        .bind(&record.score.reasoning)
        .bind(record.score.source.as_str())
        .bind(record.processed_at)
        .execute(&self.pool)
        .await?;
        tracing::debug!(tweet_id = record.tweet_id(), "Stored processed record");
        Ok(())
    }

    async fn get(&self, tweet_id: &str) -> Result<Option<ProcessedRecord>> {
        let row: Option<TweetRow> = sqlx::query_as(
            "SELECT tweet, score, commentary, source, processed_at FROM tweets WHERE tweet_id = ?",
        )
        .bind(tweet_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TweetRow::into_record).transpose()
    }

    async fn page(&self, start: u32, limit: u32) -> Result<RecordPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<TweetRow> = sqlx::query_as(
            "SELECT tweet, score, commentary, source, processed_at FROM tweets
             ORDER BY processed_at DESC, tweet_id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(i64::from(limit))
        .bind(i64::from(start))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(TweetRow::into_record)
            .collect::<Result<Vec<_>>>()?;
        let total = total as u32;
        let count = records.len() as u32;

        Ok(RecordPage {
            start,
            limit,
            total,
            count,
            has_more: start + count < total,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, score: Option<i64>, reasoning: &str) -> ProcessedRecord {
        ProcessedRecord::new(
            Tweet {
                tweet_id: id.to_string(),
                user_id: "u1".to_string(),
                user_name: "alice".to_string(),
                text: format!("tweet {id}"),
            },
            ScoreResult {
                score,
                reasoning: reasoning.to_string(),
                source: ScoreSource::Remote,
            },
        )
    }

    #[tokio::test]
    async fn test_exists_after_upsert() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(!store.exists("1").await.unwrap());
        store.upsert(&record("1", Some(100), "fine")).await.unwrap();
        assert!(store.exists("1").await.unwrap());
        assert!(!store.exists("2").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_last_write_wins() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert(&record("1", Some(90), "first")).await.unwrap();

        let mut second = record("1", Some(130), "second");
        second.score.source = ScoreSource::Fallback;
        store.upsert(&second).await.unwrap();

        let page = store.page(0, 10).await.unwrap();
        assert_eq!(page.total, 1);
        let stored = store.get("1").await.unwrap().unwrap();
        assert_eq!(stored.score.score, Some(130));
        assert_eq!(stored.score.reasoning, "second");
        assert_eq!(stored.score.source, ScoreSource::Fallback);
    }

    #[tokio::test]
    async fn test_null_score_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert(&record("7", None, "no score")).await.unwrap();
        let stored = store.get("7").await.unwrap().unwrap();
        assert_eq!(stored.score.score, None);
        assert_eq!(stored.tweet.text, "tweet 7");
    }

    #[tokio::test]
    async fn test_page_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        let base = Utc::now();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let mut r = record(id, Some(100), "x");
            r.processed_at = base + Duration::seconds(i as i64);
            store.upsert(&r).await.unwrap();
        }

        let first = store.page(0, 2).await.unwrap();
        let ids: Vec<_> = first.records.iter().map(|r| r.tweet_id().to_string()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(first.total, 3);
        assert_eq!(first.count, 2);
        assert!(first.has_more);

        let second = store.page(2, 2).await.unwrap();
        assert_eq!(second.count, 1);
        assert!(!second.has_more);
        assert_eq!(second.records[0].tweet_id(), "a");
    }

    #[tokio::test]
    async fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("state.sqlite");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.upsert(&record("1", Some(99), "kept")).await.unwrap();
        }
        let reopened = SqliteStore::open(&path).await.unwrap();
        assert!(reopened.exists("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_only_open_reads_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.sqlite");
        SqliteStore::open(&path)
            .await
            .unwrap()
            .upsert(&record("1", Some(99), "kept"))
            .await
            .unwrap();

        let store = SqliteStore::open_read_only(&path).await.unwrap();
        assert_eq!(store.get("1").await.unwrap().unwrap().score.score, Some(99));
        assert_eq!(store.page(0, 10).await.unwrap().total, 1);
        assert!(store.upsert(&record("2", None, "x")).await.is_err());
    }

    #[tokio::test]
    async fn test_read_only_open_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.sqlite");

        let err = SqliteStore::open_read_only(&path).await.unwrap_err();
        assert!(err.to_string().contains("no record store"));
        assert!(!path.exists());
    }
}
