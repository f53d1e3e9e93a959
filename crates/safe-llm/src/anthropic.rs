use serde_json::json;

use crate::provider::read_json;
use crate::types::{ProviderSettings, Turn, TurnRole};
use crate::{CompletionProvider, ProviderError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages binding. The system prompt travels in the top-level
/// `system` field rather than in the message list.
pub struct AnthropicProvider {
    settings: ProviderSettings,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request_body(&self, system_prompt: &str, history: &[Turn]) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = history
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .map(|t| json!({ "role": t.role.as_str(), "content": t.content }))
            .collect();
        json!({
            "model": self.settings.model,
            "system": system_prompt,
            "messages": messages,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

impl CompletionProvider for AnthropicProvider {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String> {
        if self.settings.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey(
                self.settings.api_key_env.clone(),
            ));
        }
        tracing::debug!(model = %self.settings.model, turns = history.len(), "anthropic request");

        let response = self
            .client
            .post(format!("{}/messages", self.settings.base_url))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(system_prompt, history))
            .send()?;
        let body = read_json(self.id(), response)?;

        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| ProviderError::malformed(self.id(), "missing content array"))?;
        let text: String = blocks
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect();
        if text.is_empty() {
            return Err(ProviderError::malformed(self.id(), "no text blocks"));
        }
        Ok(text)
    }
}
