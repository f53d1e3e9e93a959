use safe_llm::ProviderError;
use thiserror::Error;

use crate::types::Tier;

#[derive(Debug, Error)]
pub enum SafeError {
    #[error("simulation not initialized")]
    NotInitialized,

    #[error("cannot {operation}: {reason}")]
    Precondition {
        operation: &'static str,
        reason: String,
    },

    #[error("{}", refusal_text(.required))]
    ConfigurationMismatch {
        operation: &'static str,
        required: Tier,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("unknown configuration tier: {0}")]
    UnknownTier(String),

    #[error("unknown agent role: {0}")]
    UnknownRole(String),

    #[error("backlog item not found: {0}")]
    ItemNotFound(String),

    #[error("estimate for '{item}' must be one of 1, 2, 3, 5, 8, 13, 20 (got {points})")]
    InvalidEstimate { item: String, points: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Refusal text for an operation gated behind `required`.
pub fn refusal_text(required: &Tier) -> &'static str {
    match required {
        Tier::Full => "This function requires Full SAFe configuration.",
        _ => "This function requires Portfolio or Full SAFe configuration.",
    }
}

impl SafeError {
    pub(crate) fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        SafeError::Precondition {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SafeError>;
