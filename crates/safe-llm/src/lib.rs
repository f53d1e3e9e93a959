//! `safe-llm`: the text-generation boundary used by the simulator's agents.
//!
//! Every provider implements one capability: given a system prompt and the
//! ordered conversation so far, produce the next assistant turn.
//!
//! ```text
//! Agent (safe-core)
//!     │  complete(system_prompt, history)
//!     ▼
//! Box<dyn CompletionProvider>
//!     ├── OpenAiProvider      POST /v1/chat/completions
//!     ├── AnthropicProvider   POST /v1/messages
//!     ├── GeminiProvider      POST /v1beta/models/{model}:generateContent
//!     └── ScriptedProvider    canned replies (tests, offline demo)
//! ```
//!
//! Calls are blocking round trips. There is no retry, caching or timeout
//! layer here; a failure is returned to the caller as a [`ProviderError`].

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod provider;
pub mod scripted;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::{connect, CompletionProvider};
pub use scripted::{Exchange, ScriptedProvider, Transcript};
pub use types::{ProviderKind, ProviderSettings, Turn, TurnRole};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ProviderError>;
