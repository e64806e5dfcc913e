//! Bounded exponential backoff while waiting on a remote task.

use std::time::Duration;

use super::client::InferenceClient;
use crate::config::BackoffConfig;
use crate::score::ScoreResult;

/// Yields the sleep before each poll: the initial wait, doubling, `retries` times.
#[derive(Debug, Clone)]
pub struct Backoff {
    wait: Duration,
    remaining: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            wait: config.initial_wait,
            remaining: config.retries,
        }
    }

    /// Total time spent sleeping before giving up.
    #[must_use]
    pub fn total(config: BackoffConfig) -> Duration {
        Self::new(config).sum()
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        let wait = self.wait;
        self.wait = self.wait.saturating_mul(2);
        self.remaining -= 1;
        Some(wait)
    }
}

/// How waiting on a remote task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The task reported `"success"`.
    Succeeded(ScoreResult),
    /// Every poll came back empty or unfinished.
    Exhausted { attempts: u32 },
}

/// Poll `task_id` on the backoff schedule until it succeeds or attempts run out.
///
/// Empty polls and non-success statuses are treated alike: keep waiting.
pub async fn await_task(
    client: &InferenceClient,
    task_id: &str,
    config: BackoffConfig,
) -> PollOutcome {
    let mut attempts = 0;
    for wait in Backoff::new(config) {
        tokio::time::sleep(wait).await;
        attempts += 1;

        match client.poll(task_id).await {
            Some(task) if task.is_success() => {
                tracing::info!(task_id, attempts, "Remote task succeeded");
                return PollOutcome::Succeeded(task.score());
            }
            Some(task) => {
                tracing::debug!(task_id, attempts, status = %task.status, "Task not finished");
            }
            None => {
                tracing::debug!(task_id, attempts, "Task not available");
            }
        }
    }

    tracing::warn!(task_id, attempts, "Remote task did not finish in time");
    PollOutcome::Exhausted { attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::client::fakes::{data, task, ScriptedNetwork};
    use crate::score::ScoreSource;
    use tokio::time::Instant;

    #[test]
    fn test_default_schedule() {
        let schedule: Vec<_> = Backoff::new(BackoffConfig::default())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(schedule, vec![60, 120, 240]);
        assert_eq!(
            Backoff::total(BackoffConfig::default()),
            Duration::from_secs(420)
        );
    }

    #[test]
    fn test_zero_retries_schedule_is_empty() {
        let config = BackoffConfig {
            initial_wait: Duration::from_secs(5),
            retries: 0,
        };
        assert_eq!(Backoff::new(config).count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_follows_schedule() {
        let network = ScriptedNetwork::with_replies(vec![
            data(r#"{"success":false,"error":"not found"}"#),
            task("processing", 0),
            Ok(Default::default()),
        ]);
        let client = InferenceClient::new(network.clone());
        let start = Instant::now();

        let outcome = await_task(&client, "1", BackoffConfig::default()).await;
        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 3 });

        let offsets: Vec<_> = network
            .polled_at
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![60, 180, 420]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_short_circuits() {
        let network = ScriptedNetwork::with_replies(vec![
            task("processing", 0),
            task("success", 131),
        ]);
        let client = InferenceClient::new(network.clone());

        let outcome = await_task(&client, "1", BackoffConfig::default()).await;
        match outcome {
            PollOutcome::Succeeded(result) => {
                assert_eq!(result.score, Some(131));
                assert_eq!(result.source, ScoreSource::Remote);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(network.polled_at.lock().unwrap().len(), 2);
    }
}
