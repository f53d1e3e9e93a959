use serde_json::json;

use crate::provider::read_json;
use crate::types::{ProviderSettings, Turn};
use crate::{CompletionProvider, ProviderError, Result};

/// OpenAI chat-completions binding.
pub struct OpenAiProvider {
    settings: ProviderSettings,
    client: reqwest::blocking::Client,
}

impl OpenAiProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request_body(&self, system_prompt: &str, history: &[Turn]) -> serde_json::Value {
        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
        messages.extend(
            history
                .iter()
                .map(|t| json!({ "role": t.role.as_str(), "content": t.content })),
        );
        json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

impl CompletionProvider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
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
        tracing::debug!(model = %self.settings.model, turns = history.len(), "openai request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(system_prompt, history))
            .send()?;
        let body = read_json(self.id(), response)?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::malformed(self.id(), "choices[0].message.content"))
    }
}
