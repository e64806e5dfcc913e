//! Inference client: submits tweets for scoring and polls task status.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::transport::{ComputeNetwork, Tag};
use crate::error::Result;
use crate::score::{ScoreResult, ScoreSource};
use crate::twitter::Tweet;

const INFER_ACTION: &str = "Infer";
const GET_TASK_ACTION: &str = "GetTaskByTid";
const TASK_ID_TAG: &str = "Tid";
const SUCCESS_STATUS: &str = "success";

/// A scoring job accepted by the network.
///
/// The process keys tasks by tweet id, so `task_id` is what `poll` takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub message_id: String,
    pub task_id: String,
}

/// The network's record of a scoring job.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

impl Task {
    /// Only an explicit `"success"` status counts as done.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    /// Convert the task response into a remote score.
    #[must_use]
    pub fn score(&self) -> ScoreResult {
        ScoreResult::from_response(&self.response, ScoreSource::Remote)
    }
}

#[derive(Debug, Deserialize)]
struct TaskReply {
    #[serde(default)]
    success: bool,
    task: Option<Task>,
    error: Option<String>,
}

/// Client for the remote scoring process.
pub struct InferenceClient {
    network: Arc<dyn ComputeNetwork>,
}

impl InferenceClient {
    #[must_use]
    pub fn new(network: Arc<dyn ComputeNetwork>) -> Self {
        Self { network }
    }

    /// Submit a tweet for scoring. Returns as soon as the message is accepted;
    /// the job may never complete.
    pub async fn submit(&self, tweet: &Tweet) -> Result<Submission> {
        let data = serde_json::to_string(tweet)?;
        let message_id = self
            .network
            .send_message(&[Tag::action(INFER_ACTION)], &data)
            .await?;
        tracing::info!(tweet_id = %tweet.tweet_id, %message_id, "Submitted tweet for scoring");
        Ok(Submission {
            message_id,
            task_id: tweet.tweet_id.clone(),
        })
    }

    /// Look up a task. Never fails: transport errors, empty replies and
    /// unsuccessful lookups all come back as `None`.
    pub async fn poll(&self, task_id: &str) -> Option<Task> {
        let tags = [Tag::action(GET_TASK_ACTION), Tag::new(TASK_ID_TAG, task_id)];
        let result = match self.network.dry_run(&tags, "").await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Task poll failed");
                return None;
            }
        };

        if let Some(error) = &result.error {
            tracing::warn!(task_id, error = %error, "Task poll evaluation error");
            return None;
        }

        let Some(data) = result.messages.first().and_then(|m| m.data.as_deref()) else {
            tracing::debug!(task_id, "Task poll returned no data");
            return None;
        };

        let reply: TaskReply = match serde_json::from_str(data) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "Task poll returned undecodable data");
                return None;
            }
        };

        if !reply.success {
            tracing::debug!(
                task_id,
                error = reply.error.as_deref().unwrap_or("unknown"),
                "Task lookup unsuccessful"
            );
            return None;
        }

        reply.task
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::error::BotError;
    use crate::inference::transport::{DryRunResult, OutboxMessage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Scripted network: each dry run pops the next reply.
    #[derive(Default)]
    pub struct ScriptedNetwork {
        pub replies: Mutex<VecDeque<Result<DryRunResult>>>,
        pub sent: Mutex<Vec<(Vec<Tag>, String)>>,
        pub polled_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedNetwork {
        pub fn with_replies(replies: Vec<Result<DryRunResult>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            })
        }
    }

    pub fn data(text: &str) -> Result<DryRunResult> {
        Ok(DryRunResult {
            messages: vec![OutboxMessage {
                data: Some(text.to_string()),
                tags: Vec::new(),
            }],
            error: None,
        })
    }

    pub fn task(status: &str, score: i64) -> Result<DryRunResult> {
        data(
            &serde_json::json!({
                "success": true,
                "task": {
                    "status": status,
                    "response": { "score": score, "reasoning": "remote reasoning" }
                }
            })
            .to_string(),
        )
    }

    #[async_trait]
    impl ComputeNetwork for ScriptedNetwork {
        async fn send_message(&self, tags: &[Tag], data: &str) -> Result<String> {
            self.sent
                .lock()
                .unwrap()
                .push((tags.to_vec(), data.to_string()));
            Ok("msg-1".to_string())
        }

        async fn dry_run(&self, _tags: &[Tag], _data: &str) -> Result<DryRunResult> {
            self.polled_at.lock().unwrap().push(Instant::now());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BotError::malformed("script exhausted")))
        }
    }
}
