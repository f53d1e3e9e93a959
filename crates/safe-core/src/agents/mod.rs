//! The three role-playing agents.
//!
//! Every agent wraps one [`Agent`]: a name, a system prompt, a provider and
//! the running conversation. Role operations build a prompt from current
//! state, call [`Agent::respond`], and read a coarse signal back out of the
//! reply through the simulation's [`ReplyClassifier`](crate::classifier::ReplyClassifier).

pub mod coach;
pub mod developer;
pub mod scrum_master;

pub use coach::Coach;
pub use developer::Developer;
pub use scrum_master::ScrumMaster;

use safe_llm::{CompletionProvider, Turn};
use serde::{Deserialize, Serialize};

use crate::classifier::split_reasoning;
use crate::error::Result;
use crate::types::AgentRole;

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

pub struct Agent {
    name: String,
    role: AgentRole,
    system_prompt: String,
    provider: Box<dyn CompletionProvider>,
    history: Vec<Turn>,
}

/// Reply to a chain-of-thought question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    pub thought_process: Vec<String>,
    pub conclusion: String,
}

impl Agent {
    pub fn new(
        role: AgentRole,
        system_prompt: String,
        provider: Box<dyn CompletionProvider>,
    ) -> Self {
        Self {
            name: role.display_name().to_string(),
            role,
            system_prompt,
            provider,
            history: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Send `prompt` as the next user turn and record the reply.
    ///
    /// On provider failure the user turn is withdrawn, leaving the
    /// conversation as it was.
    pub fn respond(&mut self, prompt: impl Into<String>) -> Result<String> {
        self.history.push(Turn::user(prompt));
        tracing::debug!(
            agent = self.role.as_str(),
            provider = self.provider.id(),
            model = self.provider.model(),
            turns = self.history.len(),
            "agent request"
        );
        match self.provider.complete(&self.system_prompt, &self.history) {
            Ok(reply) => {
                self.history.push(Turn::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                tracing::warn!(agent = self.role.as_str(), error = %e, "agent request failed");
                Err(e.into())
            }
        }
    }

    /// One-off reasoning round trip. Uses its own system prompt and does not
    /// touch the running conversation.
    pub fn chain_of_thought(&self, question: &str) -> Result<Reasoning> {
        let system = reasoning_prompt(&self.name, self.role.title());
        let reply = self.provider.complete(&system, &[Turn::user(question)])?;
        let (thought_process, conclusion) = split_reasoning(&reply);
        Ok(Reasoning {
            thought_process,
            conclusion,
        })
    }
}

/// Conversation plus role state, captured before a ceremony so a failed
/// ceremony can be undone.
pub(crate) struct Checkpoint<S> {
    history: Vec<Turn>,
    state: S,
}

impl<S> Checkpoint<S> {
    pub(crate) fn new(agent: &Agent, state: S) -> Self {
        Self {
            history: agent.history.clone(),
            state,
        }
    }

    pub(crate) fn restore_into(self, agent: &mut Agent) -> S {
        agent.history = self.history;
        self.state
    }
}

fn reasoning_prompt(name: &str, title: &str) -> String {
    format!(
        "You are {name}, a {title} in a SAFe environment.\n\
         \n\
         Think through the question step by step and show your reasoning. \
         Lay out your answer exactly like this:\n\
         \n\
         THOUGHT PROCESS:\n\
         Step 1: [first reasoning step]\n\
         Step 2: [second reasoning step]\n\
         Step 3: [third reasoning step]\n\
         (add steps as needed)\n\
         \n\
         CONCLUSION:\n\
         [your final answer, following from the steps above]"
    )
}

/// `, `-joined list, or `fallback` when empty.
pub(crate) fn list_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}
