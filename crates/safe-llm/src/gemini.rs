use serde_json::json;

use crate::provider::read_json;
use crate::types::{ProviderSettings, Turn, TurnRole};
use crate::{CompletionProvider, ProviderError, Result};

/// Google Gemini `generateContent` binding.
pub struct GeminiProvider {
    settings: ProviderSettings,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request_body(&self, system_prompt: &str, history: &[Turn]) -> serde_json::Value {
        // Gemini names the assistant side "model".
        let contents: Vec<serde_json::Value> = history
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .map(|t| {
                let role = match t.role {
                    TurnRole::Assistant => "model",
                    _ => "user",
                };
                json!({ "role": role, "parts": [{ "text": t.content }] })
            })
            .collect();
        json!({
            "systemInstruction": { "parts": [{ "text": system_prompt }] },
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.settings.max_tokens,
                "temperature": self.settings.temperature,
            },
        })
    }
}

impl CompletionProvider for GeminiProvider {
    fn id(&self) -> &str {
        "google"
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
        tracing::debug!(model = %self.settings.model, turns = history.len(), "gemini request");

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&self.request_body(system_prompt, history))
            .send()?;
        let body = read_json(self.id(), response)?;

        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| ProviderError::malformed(self.id(), "candidates[0].content.parts"))?;
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.is_empty() {
            return Err(ProviderError::malformed(self.id(), "empty candidate"));
        }
        Ok(text)
    }
}
