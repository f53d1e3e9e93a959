//! Coarse structured signals derived from free-text agent replies.
//!
//! Agent replies are natural language, so every structured decision the
//! simulation takes from them (an estimate, a blocker, an acceptance) goes
//! through a [`ReplyClassifier`]. The default [`KeywordClassifier`] is a
//! rule table of keyword heuristics; tests and callers can swap in their own.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::backlog::STORY_POINT_SCALE;

// ---------------------------------------------------------------------------
// Intent / Signal
// ---------------------------------------------------------------------------

/// What the caller wants to know about a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// A story-point figure on the estimation scale.
    Estimate,
    /// The reply mentions something blocking progress.
    Impediment,
    /// The reply mentions technical debt or refactoring.
    TechnicalDebt,
    /// The scrum master wants the impediment taken up a level.
    Escalation,
    /// The reply accepts a change request.
    Acceptance,
    /// A strategy alignment reply recommends the work.
    Endorsement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Absent,
    Present,
    Points(u32),
}

impl Signal {
    pub fn is_present(self) -> bool {
        !matches!(self, Signal::Absent)
    }

    pub fn points(self) -> Option<u32> {
        match self {
            Signal::Points(p) => Some(p),
            _ => None,
        }
    }

    fn from_bool(hit: bool) -> Signal {
        if hit {
            Signal::Present
        } else {
            Signal::Absent
        }
    }
}

pub trait ReplyClassifier: Send {
    fn classify(&self, intent: Intent, reply: &str) -> Signal;
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

pub struct Rule {
    pub id: &'static str,
    pub intent: Intent,
    pub detect: fn(&str) -> Signal,
}

/// Evaluates rules in order; the first rule for the intent that fires wins.
pub struct KeywordClassifier {
    rules: Vec<Rule>,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ReplyClassifier for KeywordClassifier {
    fn classify(&self, intent: Intent, reply: &str) -> Signal {
        for rule in self.rules.iter().filter(|r| r.intent == intent) {
            let signal = (rule.detect)(reply);
            if signal.is_present() {
                tracing::trace!(rule = rule.id, ?signal, "reply classified");
                return signal;
            }
        }
        Signal::Absent
    }
}

pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "estimate-points-phrase",
            intent: Intent::Estimate,
            detect: estimate_points,
        },
        Rule {
            id: "impediment-keywords",
            intent: Intent::Impediment,
            detect: |r| Signal::from_bool(contains_any(r, &["block", "imped", "stuck"])),
        },
        Rule {
            id: "technical-debt-keywords",
            intent: Intent::TechnicalDebt,
            detect: |r| Signal::from_bool(contains_any(r, &["technical debt", "debt", "refactor"])),
        },
        Rule {
            id: "escalation-keywords",
            intent: Intent::Escalation,
            detect: |r| Signal::from_bool(contains_any(r, &["escalate", "cannot resolve"])),
        },
        Rule {
            id: "accept-not-negated",
            intent: Intent::Acceptance,
            detect: |r| Signal::from_bool(accepts(r)),
        },
        Rule {
            id: "endorsement-keywords",
            intent: Intent::Endorsement,
            detect: |r| Signal::from_bool(contains_any(r, &["recommended", "prioritize"])),
        },
    ]
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

fn contains_any(reply: &str, needles: &[&str]) -> bool {
    let lower = reply.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// "accept" appears, and "not" does not appear anywhere before its first
/// occurrence.
fn accepts(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    match lower.find("accept") {
        Some(at) => !lower[..at].contains("not"),
        None => false,
    }
}

fn points_re() -> &'static Regex {
    static POINTS_RE: OnceLock<Regex> = OnceLock::new();
    POINTS_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+) (?:story )?point").expect("estimate pattern is valid")
    })
}

/// Smallest scale value quoted as "<n> point" or "<n> story point".
fn estimate_points(reply: &str) -> Signal {
    points_re()
        .captures_iter(reply)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .filter(|n| STORY_POINT_SCALE.contains(n))
        .min()
        .map_or(Signal::Absent, Signal::Points)
}

/// Split a reasoning reply into its numbered steps and conclusion.
///
/// Without a `CONCLUSION:` marker the whole reply is the conclusion.
pub fn split_reasoning(reply: &str) -> (Vec<String>, String) {
    static STEP_RE: OnceLock<Regex> = OnceLock::new();
    let step_re = STEP_RE.get_or_init(|| Regex::new(r"Step \d+:").expect("step pattern is valid"));

    let Some((thoughts, conclusion)) = reply.split_once("CONCLUSION:") else {
        return (Vec::new(), reply.to_string());
    };
    let thoughts = thoughts
        .rsplit_once("THOUGHT PROCESS:")
        .map_or(thoughts, |(_, t)| t);
    let steps = step_re
        .split(thoughts)
        .skip(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (steps, conclusion.trim().to_string())
}
