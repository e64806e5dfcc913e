//! Mention pipeline - orchestrates the full dedup-resolve-score-reply-store flow.

use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{BackoffConfig, BotConfig};
use crate::error::Result;
use crate::fallback::{FallbackScorer, OpenAiScorer};
use crate::inference::{await_task, AoGateway, ComputeNetwork, InferenceClient, PollOutcome};
use crate::responder::Responder;
use crate::score::{ScoreResult, ScoreSource};
use crate::storage::{DedupStore, ProcessedRecord};
use crate::twitter::{MentionEvent, MentionSource, Tweet, TweetResolver, TwitterApi, TwitterClient};

/// Configuration for the mention pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Threads rooted on this account are never scored.
    pub self_user_id: Option<String>,
    /// Poll schedule for remote tasks.
    pub backoff: BackoffConfig,
}

/// What happened to one mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MentionOutcome {
    /// Root or mention id missing.
    NotAReply,
    /// Root tweet already processed.
    Duplicate { tweet_id: String },
    /// Root tweet written by the bot's own account.
    OwnThread { tweet_id: String },
    /// Scored, replied to and stored.
    Replied(ProcessedRecord),
}

/// Counters for a pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Mentions pulled from the source.
    pub seen: usize,
    pub skipped_not_reply: usize,
    pub skipped_duplicate: usize,
    pub skipped_self: usize,
    /// Mentions answered.
    pub processed: usize,
    /// Of those, answered by the fallback scorer.
    pub fell_back: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &MentionOutcome) {
        self.seen += 1;
        match outcome {
            MentionOutcome::NotAReply => self.skipped_not_reply += 1,
            MentionOutcome::Duplicate { .. } => self.skipped_duplicate += 1,
            MentionOutcome::OwnThread { .. } => self.skipped_self += 1,
            MentionOutcome::Replied(record) => {
                self.processed += 1;
                if record.score.source == ScoreSource::Fallback {
                    self.fell_back += 1;
                }
            }
        }
    }
}

/// Mention pipeline orchestrator.
///
/// Handles one mention at a time; any error before the final store write
/// aborts the run, leaving that mention unrecorded so a restart retries it.
pub struct Pipeline {
    config: PipelineConfig,
    twitter: Arc<dyn TwitterApi>,
    resolver: TweetResolver,
    inference: InferenceClient,
    fallback: Arc<dyn FallbackScorer>,
    responder: Responder,
    store: Arc<dyn DedupStore>,
}

impl Pipeline {
    /// Create a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        twitter: Arc<dyn TwitterApi>,
        network: Arc<dyn ComputeNetwork>,
        fallback: Arc<dyn FallbackScorer>,
        store: Arc<dyn DedupStore>,
    ) -> Self {
        Self {
            config,
            resolver: TweetResolver::new(twitter.clone()),
            responder: Responder::new(twitter.clone()),
            twitter,
            inference: InferenceClient::new(network),
            fallback,
            store,
        }
    }

    /// Wire the production HTTP collaborators from a [`BotConfig`].
    pub fn from_config(config: &BotConfig, store: Arc<dyn DedupStore>) -> Result<Self> {
        let twitter = Arc::new(TwitterClient::new(
            config.session.clone(),
            config.twitter_api_base.clone(),
            config.request_delay,
        )?);
        let network = Arc::new(AoGateway::new(&config.compute)?);
        let fallback = Arc::new(OpenAiScorer::new(&config.fallback, config.request_delay)?);

        Ok(Self::new(
            PipelineConfig {
                self_user_id: config.self_user_id.clone(),
                backoff: config.backoff,
            },
            twitter,
            network,
            fallback,
            store,
        ))
    }

    /// A fresh mention source sharing this pipeline's platform client.
    #[must_use]
    pub fn mention_source(&self) -> MentionSource {
        MentionSource::new(self.twitter.clone())
    }

    /// Drain the mention source until `stop` is cancelled or a fatal error occurs.
    ///
    /// The stop signal is honoured between mentions, never in the middle of one.
    pub async fn run(&self, source: MentionSource, stop: CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let result = self.drain(source, &stop, &mut summary).await;

        tracing::info!(
            seen = summary.seen,
            processed = summary.processed,
            fell_back = summary.fell_back,
            skipped_duplicate = summary.skipped_duplicate,
            skipped_self = summary.skipped_self,
            skipped_not_reply = summary.skipped_not_reply,
            "Mention loop finished"
        );

        result.map(|()| summary)
    }

    async fn drain(
        &self,
        source: MentionSource,
        stop: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut mentions = Box::pin(source.into_stream(stop.clone()));
        while let Some(event) = mentions.next().await {
            let outcome = self.process_mention(&event?).await?;
            summary.record(&outcome);
            if stop.is_cancelled() {
                tracing::info!("Stop requested");
                break;
            }
        }
        Ok(())
    }

    /// Process one mention, skipping roots that are already stored.
    pub async fn process_mention(&self, event: &MentionEvent) -> Result<MentionOutcome> {
        self.handle(event, false).await
    }

    /// Process one mention even if its root was already stored.
    pub async fn reprocess_mention(&self, event: &MentionEvent) -> Result<MentionOutcome> {
        self.handle(event, true).await
    }

    async fn handle(&self, event: &MentionEvent, force: bool) -> Result<MentionOutcome> {
        let (Some(root_id), Some(mention_id)) = (
            event.root_tweet_id.as_deref(),
            event.mention_tweet_id.as_deref(),
        ) else {
            tracing::debug!(?event, "Mention is not a reply, skipping");
            return Ok(MentionOutcome::NotAReply);
        };

        if !force && self.store.exists(root_id).await? {
            tracing::debug!(tweet_id = root_id, "Already processed, skipping");
            return Ok(MentionOutcome::Duplicate {
                tweet_id: root_id.to_string(),
            });
        }

        tracing::info!(tweet_id = root_id, mention_id, "Processing mention");
        let tweet = self.resolver.resolve(root_id).await?;

        if self
            .config
            .self_user_id
            .as_deref()
            .is_some_and(|id| id == tweet.user_id)
        {
            tracing::info!(tweet_id = root_id, "Tweet is from our own account, skipping");
            return Ok(MentionOutcome::OwnThread {
                tweet_id: root_id.to_string(),
            });
        }

        let score = self.score(&tweet).await?;
        self.responder.reply(mention_id, &score).await?;

        let record = ProcessedRecord::new(tweet, score);
        self.store.upsert(&record).await?;

        tracing::info!(
            tweet_id = root_id,
            score = ?record.score.score,
            source = %record.score.source,
            "Mention processed"
        );
        Ok(MentionOutcome::Replied(record))
    }

    /// Submit to the compute network and wait; fall back if it does not finish.
    async fn score(&self, tweet: &Tweet) -> Result<ScoreResult> {
        let submission = self.inference.submit(tweet).await?;

        match await_task(&self.inference, &submission.task_id, self.config.backoff).await {
            PollOutcome::Succeeded(result) => Ok(result),
            PollOutcome::Exhausted { attempts } => {
                tracing::warn!(
                    tweet_id = %tweet.tweet_id,
                    attempts,
                    "Falling back to synchronous scorer"
                );
                self.fallback.score(tweet).await
            }
        }
    }
}
