use crate::types::{ProviderKind, ProviderSettings, Turn};
use crate::{AnthropicProvider, GeminiProvider, OpenAiProvider, Result};

/// A text-completion backend bound to one model.
///
/// `history` never contains the system prompt; providers place it wherever
/// their wire format expects it.
pub trait CompletionProvider: Send {
    /// Stable provider identifier (`openai`, `anthropic`, `google`, `scripted`).
    fn id(&self) -> &str;

    fn model(&self) -> &str;

    fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String>;
}

/// Build the HTTP binding for `settings.kind`.
pub fn connect(settings: ProviderSettings) -> Box<dyn CompletionProvider> {
    match settings.kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(settings)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(settings)),
        ProviderKind::Google => Box::new(GeminiProvider::new(settings)),
    }
}

/// Shared response-reading step for the HTTP bindings.
pub(crate) fn read_json(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "provider call failed");
        return Err(crate::ProviderError::from_status(
            provider,
            status.as_u16(),
            body,
        ));
    }
    Ok(response.json::<serde_json::Value>()?)
}
