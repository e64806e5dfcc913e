//! Score results shared by the remote and fallback scorers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which scorer produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// The asynchronous compute network.
    Remote,
    /// The synchronous fallback backend.
    Fallback,
}

impl ScoreSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Fallback => "fallback",
        }
    }

    /// Parse a stored source tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remote" => Some(Self::Remote),
            "fallback" => Some(Self::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score with its reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Estimated score; `None` when the scorer declined to give one.
    pub score: Option<i64>,
    pub reasoning: String,
    pub source: ScoreSource,
}

impl ScoreResult {
    /// Build a result from a `{score, reasoning}` JSON value.
    ///
    /// Responses sometimes arrive as JSON text instead of an object. A
    /// non-numeric or missing score becomes `None`; fractional scores are
    /// rounded.
    #[must_use]
    pub fn from_response(response: &Value, source: ScoreSource) -> Self {
        let decoded;
        let response = match response {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) if value.is_object() => {
                    decoded = value;
                    &decoded
                }
                _ => {
                    return Self {
                        score: None,
                        reasoning: text.clone(),
                        source,
                    }
                }
            },
            other => other,
        };

        let score = response.get("score").and_then(|s| {
            s.as_i64()
                .or_else(|| s.as_f64().map(|f| f.round() as i64))
        });
        let reasoning = response
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            score,
            reasoning,
            source,
        }
    }

    /// Reply text: `Score: {score}. {reasoning}`.
    #[must_use]
    pub fn reply_text(&self) -> String {
        match self.score {
            Some(score) => format!("Score: {score}. {}", self.reasoning),
            None => format!("Score: null. {}", self.reasoning),
        }
    }
}
