use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing API key: set {0}")]
    MissingApiKey(String),

    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response from {provider}: {detail}")]
    MalformedResponse { provider: String, detail: String },

    #[error("scripted provider '{0}' has no replies left")]
    Exhausted(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status returned by a provider endpoint.
    pub fn from_status(provider: &str, status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Auth {
                status,
                message: body,
            },
            429 => ProviderError::RateLimited {
                provider: provider.to_string(),
            },
            _ => ProviderError::Http {
                status,
                message: body,
            },
        }
    }

    pub(crate) fn malformed(provider: &str, detail: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_401_is_auth() {
        let err = ProviderError::from_status("openai", 401, "bad key".into());
        assert!(matches!(err, ProviderError::Auth { status: 401, .. }));
    }

    #[test]
    fn status_429_is_rate_limited() {
        let err = ProviderError::from_status("anthropic", 429, String::new());
        assert_eq!(err.to_string(), "rate limited by anthropic");
    }

    #[test]
    fn other_status_is_http() {
        let err = ProviderError::from_status("google", 500, "boom".into());
        assert_eq!(err.to_string(), "API error (500): boom");
    }
}
