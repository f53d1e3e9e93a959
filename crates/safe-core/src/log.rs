use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// PI / sprint / day position an entry is scoped to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub pi: u32,
    pub sprint: u32,
    pub day: u32,
}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "Project Setup")]
    ProjectSetup,
    #[serde(rename = "PI Planning")]
    PiPlanning,
    #[serde(rename = "Sprint Planning")]
    SprintPlanning,
    #[serde(rename = "Daily Standup")]
    DailyStandup,
    #[serde(rename = "Impediment Resolution")]
    ImpedimentResolution,
    #[serde(rename = "Impediment Escalation")]
    ImpedimentEscalation,
    #[serde(rename = "Sprint Review")]
    SprintReview,
    #[serde(rename = "Inspect & Adapt")]
    InspectAndAdapt,
    #[serde(rename = "Strategic Change")]
    StrategicChange,
    #[serde(rename = "Sprint Change")]
    SprintChange,
    #[serde(rename = "Story Estimation")]
    StoryEstimation,
    #[serde(rename = "Work Started")]
    WorkStarted,
    #[serde(rename = "Technical Guidance")]
    TechnicalGuidance,
    #[serde(rename = "Strategy Alignment")]
    StrategyAlignment,
    #[serde(rename = "Solution Train")]
    SolutionTrain,
    #[serde(rename = "Agent Question")]
    AgentQuestion,
    #[serde(rename = "Chain of Thought")]
    ChainOfThought,
    #[serde(rename = "Configuration Demonstration")]
    ConfigurationDemo,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ProjectSetup => "Project Setup",
            EventKind::PiPlanning => "PI Planning",
            EventKind::SprintPlanning => "Sprint Planning",
            EventKind::DailyStandup => "Daily Standup",
            EventKind::ImpedimentResolution => "Impediment Resolution",
            EventKind::ImpedimentEscalation => "Impediment Escalation",
            EventKind::SprintReview => "Sprint Review",
            EventKind::InspectAndAdapt => "Inspect & Adapt",
            EventKind::StrategicChange => "Strategic Change",
            EventKind::SprintChange => "Sprint Change",
            EventKind::StoryEstimation => "Story Estimation",
            EventKind::WorkStarted => "Work Started",
            EventKind::TechnicalGuidance => "Technical Guidance",
            EventKind::StrategyAlignment => "Strategy Alignment",
            EventKind::SolutionTrain => "Solution Train",
            EventKind::AgentQuestion => "Agent Question",
            EventKind::ChainOfThought => "Chain of Thought",
            EventKind::ConfigurationDemo => "Configuration Demonstration",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub description: String,
    pub pi: u32,
    pub sprint: u32,
    pub day: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub pi: u32,
    pub sprint: u32,
    pub day: u32,
}

// ---------------------------------------------------------------------------
// Journal: entries staged by one ceremony
// ---------------------------------------------------------------------------

/// Entries produced while a ceremony runs. Nothing reaches the
/// [`SimulationLog`] until the ceremony commits its journal, so a ceremony
/// that fails part-way leaves no trace.
#[derive(Debug)]
pub struct Journal {
    at: Coordinates,
    events: Vec<Event>,
    communications: Vec<Communication>,
}

impl Journal {
    pub fn new(at: Coordinates) -> Self {
        Self {
            at,
            events: Vec::new(),
            communications: Vec::new(),
        }
    }

    pub fn event(&mut self, kind: EventKind, description: impl Into<String>) {
        self.events.push(Event {
            timestamp: Utc::now(),
            kind,
            description: description.into(),
            pi: self.at.pi,
            sprint: self.at.sprint,
            day: self.at.day,
        });
    }

    pub fn communication(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.communications.push(Communication {
            timestamp: Utc::now(),
            sender: sender.into(),
            recipient: recipient.into(),
            message: message.into(),
            pi: self.at.pi,
            sprint: self.at.sprint,
            day: self.at.day,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.communications.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SimulationLog
// ---------------------------------------------------------------------------

/// The two append-only logs. Entries are never edited or removed.
#[derive(Debug, Default)]
pub struct SimulationLog {
    events: Vec<Event>,
    communications: Vec<Communication>,
}

impl SimulationLog {
    /// Append a journal's entries in staging order, stamped with the
    /// append time.
    pub fn commit(&mut self, journal: Journal) {
        let now = Utc::now();
        self.events.extend(journal.events.into_iter().map(|mut e| {
            e.timestamp = now;
            e
        }));
        self.communications
            .extend(journal.communications.into_iter().map(|mut c| {
                c.timestamp = now;
                c
            }));
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn communications(&self) -> &[Communication] {
        &self.communications
    }

    /// The most recent `limit` events (all when `None`), oldest first.
    pub fn recent_events(&self, limit: Option<usize>) -> &[Event] {
        tail(&self.events, limit)
    }

    pub fn recent_communications(&self, limit: Option<usize>) -> &[Communication] {
        tail(&self.communications, limit)
    }
}

fn tail<T>(items: &[T], limit: Option<usize>) -> &[T] {
    match limit {
        // A zero limit means "no limit".
        Some(n) if n > 0 && n < items.len() => &items[items.len() - n..],
        _ => items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(pi: u32, sprint: u32, day: u32) -> Coordinates {
        Coordinates { pi, sprint, day }
    }

    #[test]
    fn commit_preserves_staging_order_and_coordinates() {
        let mut log = SimulationLog::default();
        let mut journal = Journal::new(at(1, 2, 3));
        journal.event(EventKind::DailyStandup, "Day 3 of Sprint 2");
        journal.event(EventKind::ImpedimentResolution, "Scrum Master addressing: x");
        journal.communication("Developer", "Team", "update");
        log.commit(journal);

        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].kind, EventKind::DailyStandup);
        assert_eq!(log.events()[1].kind, EventKind::ImpedimentResolution);
        assert_eq!(log.communications()[0].day, 3);
        assert_eq!(log.communications()[0].pi, 1);
    }

    #[test]
    fn dropped_journal_leaves_log_untouched() {
        let log = SimulationLog::default();
        {
            let mut journal = Journal::new(at(1, 0, 0));
            journal.event(EventKind::PiPlanning, "never committed");
        }
        assert!(log.events().is_empty());
    }

    #[test]
    fn recent_returns_tail_in_insertion_order() {
        let mut log = SimulationLog::default();
        let mut journal = Journal::new(at(0, 0, 0));
        for i in 0..5 {
            journal.event(EventKind::AgentQuestion, format!("q{i}"));
        }
        log.commit(journal);

        let recent = log.recent_events(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "q3");
        assert_eq!(recent[1].description, "q4");
        assert_eq!(log.recent_events(None).len(), 5);
        assert_eq!(log.recent_events(Some(50)).len(), 5);
        assert_eq!(log.recent_events(Some(0)).len(), 5);
    }

    #[test]
    fn event_serializes_kind_as_type() {
        let mut log = SimulationLog::default();
        let mut journal = Journal::new(at(1, 0, 0));
        journal.event(EventKind::InspectAndAdapt, "done");
        log.commit(journal);
        let json = serde_json::to_value(&log.events()[0]).unwrap();
        assert_eq!(json["type"], "Inspect & Adapt");
        assert_eq!(json["pi"], 1);
    }
}
