//! Prompt templates for the fallback scorer.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{BotError, Result};

pub(super) const SCORE_TEMPLATE_NAME: &str = "score";

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

impl PromptManager {
    /// Create a new prompt manager with embedded templates.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(SCORE_TEMPLATE_NAME, SCORE_TEMPLATE)
            .map_err(|e| BotError::Template(e.to_string()))?;
        Ok(Self { handlebars })
    }

    /// Render a template with the given data.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String> {
        self.handlebars
            .render(template, data)
            .map_err(|e| BotError::Template(e.to_string()))
    }
}

pub(super) const SYSTEM_PROMPT: &str = "You estimate the intelligence of a tweet's author from the tweet alone. \
Answer with JSON only, matching the provided schema.";

const SCORE_TEMPLATE: &str = r"Estimate an IQ-style score between 60 and 140 for the author of this tweet,
judging only from the writing below.

Author: @{{user_name}}
Tweet:
{{text}}

Respond with JSON:
- score: integer between 60 and 140
- reasoning: why, in at most 150 characters
";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_score_prompt() {
        let prompts = PromptManager::new().unwrap();
        let prompt = prompts
            .render(
                SCORE_TEMPLATE_NAME,
                &json!({ "user_name": "alice", "text": "Entropy always wins." }),
            )
            .unwrap();
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("Entropy always wins."));
        assert!(prompt.contains("between 60 and 140"));
    }

    #[test]
    fn test_strict_mode_rejects_missing_fields() {
        let prompts = PromptManager::new().unwrap();
        assert!(prompts
            .render(SCORE_TEMPLATE_NAME, &json!({ "text": "x" }))
            .is_err());
    }
}
