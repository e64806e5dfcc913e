//! Fallback scorer backed by an OpenAI-compatible structured-output endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::prompts::{PromptManager, SCORE_TEMPLATE_NAME, SYSTEM_PROMPT};
use super::FallbackScorer;
use crate::config::FallbackConfig;
use crate::error::{BotError, Result};
use crate::score::{ScoreResult, ScoreSource};
use crate::twitter::Tweet;

const SCHEMA_NAME: &str = "tweet_score";

/// Chat completion request message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// The object the schema forces the model to produce.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScore {
    score: i64,
    reasoning: String,
}

/// Scores tweets with a single blocking completion call.
pub struct OpenAiScorer {
    client: Client,
    prompts: PromptManager,
    api_key: String,
    url: String,
    model: String,
    request_delay: Duration,
}

impl OpenAiScorer {
    pub fn new(config: &FallbackConfig, request_delay: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            prompts: PromptManager::new()?,
            api_key: config.api_key.clone(),
            url: config.url.clone(),
            model: config.model.clone(),
            request_delay,
        })
    }

    fn response_format() -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": {
                    "type": "object",
                    "properties": {
                        "score": { "type": "integer" },
                        "reasoning": { "type": "string" }
                    },
                    "required": ["score", "reasoning"],
                    "additionalProperties": false
                }
            }
        })
    }

    fn build_request(&self, tweet: &Tweet) -> Result<ChatRequest> {
        let prompt = self.prompts.render(
            SCORE_TEMPLATE_NAME,
            &json!({ "user_name": tweet.user_name, "text": tweet.text }),
        )?;
        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: Self::response_format(),
        })
    }
}

#[async_trait]
impl FallbackScorer for OpenAiScorer {
    async fn score(&self, tweet: &Tweet) -> Result<ScoreResult> {
        let request = self.build_request(tweet)?;
        tokio::time::sleep(self.request_delay).await;

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Fallback(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::Fallback(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(BotError::Fallback(format!(
                    "API error ({status}): {}",
                    error.error.message
                )));
            }
            return Err(BotError::Fallback(format!("API error ({status}): {body}")));
        }

        let api_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::Fallback(format!("failed to parse response: {e}")))?;

        let message = api_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| BotError::Fallback("response has no choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(BotError::Fallback(format!("model refused: {refusal}")));
        }

        let content = message
            .content
            .ok_or_else(|| BotError::Fallback("response has no content".to_string()))?;
        let raw: RawScore = serde_json::from_str(&content)
            .map_err(|e| BotError::Fallback(format!("response does not match schema: {e}")))?;

        tracing::info!(tweet_id = %tweet.tweet_id, score = raw.score, "Fallback scorer answered");

        Ok(ScoreResult {
            score: Some(raw.score),
            reasoning: raw.reasoning,
            source: ScoreSource::Fallback,
        })
    }
}
