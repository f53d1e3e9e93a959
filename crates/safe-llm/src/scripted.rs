use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::types::Turn;
use crate::{CompletionProvider, ProviderError, Result};

/// One recorded `complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub system_prompt: String,
    pub history: Vec<Turn>,
}

impl Exchange {
    /// Content of the last user turn, which is the prompt that triggered this call.
    pub fn prompt(&self) -> &str {
        self.history
            .last()
            .map(|t| t.content.as_str())
            .unwrap_or_default()
    }
}

/// Shared handle onto everything a [`ScriptedProvider`] was asked.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<Exchange>>>);

impl Transcript {
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, exchange: Exchange) {
        if let Ok(mut v) = self.0.lock() {
            v.push(exchange);
        }
    }
}

type Responder = Arc<dyn Fn(&str, &[Turn]) -> String + Send + Sync>;

enum Behaviour {
    /// Pop queued replies, then fall back (or fail once empty).
    Queue {
        replies: Mutex<VecDeque<String>>,
        fallback: Option<String>,
    },
    Respond(Responder),
    Fail,
}

/// Deterministic in-process provider for tests and offline runs.
pub struct ScriptedProvider {
    name: String,
    behaviour: Behaviour,
    transcript: Transcript,
}

impl ScriptedProvider {
    /// Replies are returned in order; once drained, calls fail with
    /// [`ProviderError::Exhausted`].
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_behaviour(Behaviour::Queue {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
        })
    }

    /// Same reply for every call.
    pub fn always(reply: impl Into<String>) -> Self {
        Self::with_behaviour(Behaviour::Queue {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.into()),
        })
    }

    /// Every call fails with a transport error.
    pub fn failing() -> Self {
        Self::with_behaviour(Behaviour::Fail)
    }

    /// Reply computed from the system prompt and history.
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&str, &[Turn]) -> String + Send + Sync + 'static,
    {
        Self::with_behaviour(Behaviour::Respond(Arc::new(f)))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            name: "scripted".to_string(),
            behaviour,
            transcript: Transcript::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Once drained, return `reply` instead of failing.
    pub fn then_always(mut self, reply: impl Into<String>) -> Self {
        if let Behaviour::Queue { fallback, .. } = &mut self.behaviour {
            *fallback = Some(reply.into());
        }
        self
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.name
    }

    fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String> {
        self.transcript.record(Exchange {
            system_prompt: system_prompt.to_string(),
            history: history.to_vec(),
        });
        match &self.behaviour {
            Behaviour::Queue { replies, fallback } => {
                let next = replies.lock().ok().and_then(|mut q| q.pop_front());
                next.or_else(|| fallback.clone())
                    .ok_or_else(|| ProviderError::Exhausted(self.name.clone()))
            }
            Behaviour::Respond(f) => Ok(f(system_prompt, history)),
            Behaviour::Fail => Err(ProviderError::Transport(format!(
                "scripted provider '{}' is configured to fail",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_in_order_then_exhausted() {
        let p = ScriptedProvider::new(["one", "two"]);
        assert_eq!(p.complete("s", &[Turn::user("a")]).unwrap(), "one");
        assert_eq!(p.complete("s", &[Turn::user("b")]).unwrap(), "two");
        assert!(matches!(
            p.complete("s", &[Turn::user("c")]),
            Err(ProviderError::Exhausted(_))
        ));
    }

    #[test]
    fn fallback_after_queue() {
        let p = ScriptedProvider::new(["first"]).then_always("rest");
        p.complete("s", &[]).unwrap();
        assert_eq!(p.complete("s", &[]).unwrap(), "rest");
        assert_eq!(p.complete("s", &[]).unwrap(), "rest");
    }

    #[test]
    fn transcript_records_failed_calls_too() {
        let p = ScriptedProvider::failing();
        let transcript = p.transcript();
        assert!(p.complete("sys", &[Turn::user("hello")]).is_err());
        let calls = transcript.exchanges();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system_prompt, "sys");
        assert_eq!(calls[0].prompt(), "hello");
    }

    #[test]
    fn responder_sees_prompt() {
        let p = ScriptedProvider::responder(|_, h| format!("echo {}", h.len()));
        assert_eq!(p.complete("s", &[Turn::user("x")]).unwrap(), "echo 1");
    }
}
