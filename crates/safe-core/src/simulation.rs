//! The PI → Sprint → Day state machine.
//!
//! A [`Simulation`] owns the three agents, the backlog, the counters and the
//! logs. Every ceremony runs in the same shape:
//!
//! 1. check its precondition and reject without touching anything;
//! 2. checkpoint the agents, then make the agent calls, staging log entries
//!    in a [`Journal`];
//! 3. on failure restore the agents and drop the journal; on success update
//!    counters and metrics and commit the journal.
//!
//! Ceremonies are strictly sequential; the type is `Send` but not shared.

use chrono::{DateTime, Duration, Utc};
use safe_llm::{connect, CompletionProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agents::{Agent, Coach, Developer, Reasoning, ScrumMaster};
use crate::agents::scrum_master::TeamUpdate;
use crate::backlog::BacklogItem;
use crate::change::{ChangeLevel, ChangeOutcome, ChangeRequest};
use crate::classifier::{Intent, KeywordClassifier, ReplyClassifier};
use crate::config::SafeConfig;
use crate::error::{Result, SafeError};
use crate::log::{Communication, Coordinates, Event, EventKind, Journal, SimulationLog};
use crate::metrics::{self, PiMetrics, SprintMetrics};
use crate::random::{RandomSource, StdRandom};
use crate::showcase::{ConfigDemonstration, ConfigView};
use crate::types::{AgentRole, Tier};

/// Chance a synthetic team member raises an impediment at stand-up.
pub const STANDUP_IMPEDIMENT_CHANCE: f64 = 0.2;

/// Simulated share of the sprint backlog completed, `[low, high)`.
pub const COMPLETION_RANGE: (f64, f64) = (0.7, 1.0);
pub const BUSINESS_VALUE_RANGE: (f64, f64) = (7.0, 10.0);
pub const TEAM_SATISFACTION_RANGE: (f64, f64) = (6.0, 9.0);

const TEAM: &str = "Team";
const USER: &str = "User";

/// PI → sprint → metrics.
pub type MetricsTable = BTreeMap<u32, BTreeMap<u32, SprintMetrics>>;

// ---------------------------------------------------------------------------
// Ceremony results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiStart {
    pub pi_number: u32,
    pub start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub scope: Vec<BacklogItem>,
    pub planning_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintStart {
    pub sprint_number: u32,
    pub pi_number: u32,
    pub start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub velocity: f64,
    pub backlog: Vec<BacklogItem>,
    pub planning_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpedimentHandling {
    pub impediment: String,
    pub resolution: String,
    /// Coach reply when the scrum master escalated.
    pub escalation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandupReport {
    pub day: u32,
    pub sprint: u32,
    pub pi: u32,
    pub updates: Vec<TeamUpdate>,
    pub progress_report: String,
    pub standup_summary: String,
    pub impediments_addressed: Vec<String>,
    pub resolutions: Vec<ImpedimentHandling>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub item: BacklogItem,
    pub report: String,
    pub technical_debt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintReview {
    pub sprint_number: u32,
    pub pi_number: u32,
    pub metrics: SprintMetrics,
    pub completed_items: Vec<BacklogItem>,
    pub completion_rate: f64,
    pub completion_reports: Vec<CompletionReport>,
    pub retrospective: String,
    pub technical_debt: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiReview {
    pub pi_number: u32,
    pub sprints_completed: u32,
    pub metrics: PiMetrics,
    pub achievements: Vec<String>,
    pub inspect_and_adapt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEstimate {
    pub item: String,
    pub points: u32,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkStart {
    pub item: BacklogItem,
    pub approach: String,
}

/// Read-only snapshot returned with every ceremony and pushed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub id: Uuid,
    pub project_name: String,
    pub configuration: Tier,
    pub current_pi: u32,
    pub current_sprint: u32,
    pub current_day: u32,
    pub sprints_per_pi: u32,
    pub weeks_per_sprint: u32,
    pub backlog_size: usize,
    pub pi_scope_size: usize,
    pub pi_start_date: Option<String>,
    pub sprint_start_date: Option<String>,
    pub velocity: f64,
    pub metrics: MetricsTable,
    pub events: usize,
    pub communications: usize,
    pub impediments: Vec<String>,
    pub developer_tasks: Vec<String>,
    pub technical_debt: Vec<String>,
    pub strategic_themes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct SimulationBuilder {
    config: SafeConfig,
    coach: Option<Box<dyn CompletionProvider>>,
    scrum_master: Option<Box<dyn CompletionProvider>>,
    developer: Option<Box<dyn CompletionProvider>>,
    classifier: Option<Box<dyn ReplyClassifier>>,
    random: Option<Box<dyn RandomSource>>,
}

impl SimulationBuilder {
    /// Back `role` with `provider` instead of the configured HTTP binding.
    pub fn provider(mut self, role: AgentRole, provider: Box<dyn CompletionProvider>) -> Self {
        let slot = match role {
            AgentRole::Coach => &mut self.coach,
            AgentRole::ScrumMaster => &mut self.scrum_master,
            AgentRole::Developer => &mut self.developer,
        };
        *slot = Some(provider);
        self
    }

    pub fn classifier(mut self, classifier: Box<dyn ReplyClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn build(self) -> Simulation {
        let config = self.config;
        let bind = |slot: Option<Box<dyn CompletionProvider>>, role: AgentRole| {
            slot.unwrap_or_else(|| connect(config.provider_settings(role)))
        };
        let coach = Coach::new(bind(self.coach, AgentRole::Coach));
        let scrum_master = ScrumMaster::new(bind(self.scrum_master, AgentRole::ScrumMaster));
        let developer = Developer::new(bind(self.developer, AgentRole::Developer));
        let random = self
            .random
            .unwrap_or_else(|| Box::new(StdRandom::from_seed(config.seed)));
        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(KeywordClassifier::default()));

        let id = Uuid::new_v4();
        tracing::info!(%id, tier = %config.tier, "simulation created");
        Simulation {
            id,
            config,
            project_name: None,
            product_backlog: Vec::new(),
            pi_scope: Vec::new(),
            current_pi: 0,
            current_sprint: 0,
            current_day: 0,
            sprint_open: false,
            pi_start: None,
            sprint_start: None,
            metrics: MetricsTable::new(),
            log: SimulationLog::default(),
            coach,
            scrum_master,
            developer,
            classifier,
            random,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    id: Uuid,
    config: SafeConfig,
    project_name: Option<String>,
    product_backlog: Vec<BacklogItem>,
    pi_scope: Vec<BacklogItem>,
    current_pi: u32,
    current_sprint: u32,
    current_day: u32,
    sprint_open: bool,
    pi_start: Option<DateTime<Utc>>,
    sprint_start: Option<DateTime<Utc>>,
    metrics: MetricsTable,
    log: SimulationLog,
    coach: Coach,
    scrum_master: ScrumMaster,
    developer: Developer,
    classifier: Box<dyn ReplyClassifier>,
    random: Box<dyn RandomSource>,
}

impl Simulation {
    pub fn builder(config: SafeConfig) -> SimulationBuilder {
        SimulationBuilder {
            config,
            coach: None,
            scrum_master: None,
            developer: None,
            classifier: None,
            random: None,
        }
    }

    /// Simulation whose agents use the HTTP providers named in `config`.
    pub fn new(config: SafeConfig) -> Self {
        Self::builder(config).build()
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SafeConfig {
        &self.config
    }

    pub fn tier(&self) -> Tier {
        self.config.tier
    }

    pub fn project_name(&self) -> &str {
        self.project_name.as_deref().unwrap_or("Unnamed Project")
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            pi: self.current_pi,
            sprint: self.current_sprint,
            day: self.current_day,
        }
    }

    pub fn product_backlog(&self) -> &[BacklogItem] {
        &self.product_backlog
    }

    pub fn pi_scope(&self) -> &[BacklogItem] {
        &self.pi_scope
    }

    pub fn metrics(&self) -> &MetricsTable {
        &self.metrics
    }

    pub fn coach(&self) -> &Coach {
        &self.coach
    }

    pub fn scrum_master(&self) -> &ScrumMaster {
        &self.scrum_master
    }

    pub fn developer(&self) -> &Developer {
        &self.developer
    }

    pub fn agent(&self, role: AgentRole) -> &Agent {
        match role {
            AgentRole::Coach => self.coach.agent(),
            AgentRole::ScrumMaster => self.scrum_master.agent(),
            AgentRole::Developer => self.developer.agent(),
        }
    }

    fn agent_mut(&mut self, role: AgentRole) -> &mut Agent {
        match role {
            AgentRole::Coach => self.coach.agent_mut(),
            AgentRole::ScrumMaster => self.scrum_master.agent_mut(),
            AgentRole::Developer => self.developer.agent_mut(),
        }
    }

    /// Most recent `limit` events (all when `None`), oldest first.
    pub fn events(&self, limit: Option<usize>) -> &[Event] {
        self.log.recent_events(limit)
    }

    pub fn communications(&self, limit: Option<usize>) -> &[Communication] {
        self.log.recent_communications(limit)
    }

    pub fn state(&self) -> SimulationState {
        let date = |d: Option<DateTime<Utc>>| d.map(|d| d.format("%Y-%m-%d").to_string());
        SimulationState {
            id: self.id,
            project_name: self.project_name().to_string(),
            configuration: self.tier(),
            current_pi: self.current_pi,
            current_sprint: self.current_sprint,
            current_day: self.current_day,
            sprints_per_pi: self.config.sprints_per_pi,
            weeks_per_sprint: self.config.weeks_per_sprint,
            backlog_size: self.product_backlog.len(),
            pi_scope_size: self.pi_scope.len(),
            pi_start_date: date(self.pi_start.filter(|_| self.current_pi > 0)),
            sprint_start_date: date(self.sprint_start.filter(|_| self.current_sprint > 0)),
            velocity: self.scrum_master.velocity(),
            metrics: self.metrics.clone(),
            events: self.log.events().len(),
            communications: self.log.communications().len(),
            impediments: self.scrum_master.impediments().to_vec(),
            developer_tasks: self
                .developer
                .current_tasks()
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            technical_debt: self.developer.technical_debt().to_vec(),
            strategic_themes: self.coach.strategic_themes().to_vec(),
        }
    }

    // -- plumbing -----------------------------------------------------------

    /// Run `op`; if it fails, put every agent back the way it was.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let coach = self.coach.checkpoint();
        let scrum_master = self.scrum_master.checkpoint();
        let developer = self.developer.checkpoint();
        let result = op(self);
        if result.is_err() {
            self.coach.restore(coach);
            self.scrum_master.restore(scrum_master);
            self.developer.restore(developer);
        }
        result
    }

    fn require_pi(&self, operation: &'static str) -> Result<()> {
        if self.current_pi == 0 {
            return Err(SafeError::precondition(operation, "no PI has been started"));
        }
        Ok(())
    }

    fn require_sprint(&self, operation: &'static str) -> Result<()> {
        if self.current_sprint == 0 {
            return Err(SafeError::precondition(operation, "no sprint is active"));
        }
        Ok(())
    }

    /// `current_sprint` survives the review, so closure is tracked separately.
    fn require_open_sprint(&self, operation: &'static str) -> Result<()> {
        self.require_sprint(operation)?;
        if !self.sprint_open {
            return Err(SafeError::precondition(
                operation,
                format!("sprint {} has already ended", self.current_sprint),
            ));
        }
        Ok(())
    }

    fn weeks(n: u32) -> Duration {
        Duration::weeks(i64::from(n))
    }

    // -- ceremonies ---------------------------------------------------------

    /// Set the project name and backlog. Strategic themes are kept only for
    /// portfolio and full tiers.
    pub fn setup_project(
        &mut self,
        name: impl Into<String>,
        backlog: Vec<BacklogItem>,
        strategic_themes: Option<Vec<String>>,
    ) -> Result<()> {
        if self.project_name.is_some() {
            return Err(SafeError::precondition(
                "set up project",
                "project is already set up",
            ));
        }
        for item in &backlog {
            item.check_estimate()?;
        }
        let name = name.into();
        let mut description = format!(
            "Project '{name}' initialized with {} backlog items using {} SAFe configuration",
            backlog.len(),
            self.tier().label()
        );
        let themes = strategic_themes
            .filter(|t| !t.is_empty() && self.tier().has_portfolio())
            .unwrap_or_default();
        if !themes.is_empty() {
            description.push_str(&format!(", {} strategic themes", themes.len()));
        }

        let mut journal = Journal::new(self.coordinates());
        journal.event(EventKind::ProjectSetup, description);

        tracing::info!(project = %name, items = backlog.len(), "project set up");
        self.project_name = Some(name);
        self.product_backlog = backlog;
        self.coach.set_strategic_themes(themes);
        self.log.commit(journal);
        Ok(())
    }

    pub fn start_pi(&mut self) -> Result<PiStart> {
        let pi = self.current_pi + 1;
        let tier = self.tier();
        let (scope, planning) =
            self.guarded(|sim| sim.coach.start_pi_planning(&sim.product_backlog, tier))?;

        let start = Utc::now();
        let mut journal = Journal::new(Coordinates { pi, sprint: 0, day: 0 });
        journal.event(
            EventKind::PiPlanning,
            format!("PI {pi} planning completed with {} items in scope", scope.len()),
        );
        journal.communication(AgentRole::Coach.display_name(), TEAM, planning.clone());

        self.current_pi = pi;
        self.current_sprint = 0;
        self.current_day = 0;
        self.sprint_open = false;
        self.pi_start = Some(start);
        self.pi_scope = scope.clone();
        self.log.commit(journal);
        tracing::info!(pi, scope = scope.len(), "PI started");

        Ok(PiStart {
            pi_number: pi,
            start_date: start,
            planned_end_date: start
                + Self::weeks(self.config.sprints_per_pi * self.config.weeks_per_sprint),
            scope,
            planning_details: planning,
        })
    }

    pub fn start_sprint(&mut self) -> Result<SprintStart> {
        self.require_pi("start sprint")?;
        let pi = self.current_pi;
        let sprint = self.current_sprint + 1;
        let velocity = self.scrum_master.velocity();
        let (backlog, planning) =
            self.guarded(|sim| sim.scrum_master.start_sprint(pi, sprint, &sim.pi_scope))?;

        let start = Utc::now();
        let mut journal = Journal::new(Coordinates { pi, sprint, day: 0 });
        journal.event(
            EventKind::SprintPlanning,
            format!("Sprint {sprint} planning completed with {} items", backlog.len()),
        );
        journal.communication(AgentRole::ScrumMaster.display_name(), TEAM, planning.clone());

        self.current_sprint = sprint;
        self.current_day = 0;
        self.sprint_open = true;
        self.sprint_start = Some(start);
        self.log.commit(journal);
        tracing::info!(pi, sprint, items = backlog.len(), velocity, "sprint started");

        Ok(SprintStart {
            sprint_number: sprint,
            pi_number: pi,
            start_date: start,
            planned_end_date: start + Self::weeks(self.config.weeks_per_sprint),
            velocity,
            backlog,
            planning_details: planning,
        })
    }

    pub fn run_daily_standup(&mut self) -> Result<StandupReport> {
        self.require_sprint("run daily standup")?;
        let at = Coordinates {
            day: self.current_day + 1,
            ..self.coordinates()
        };
        let day = at.day;
        let tier = self.tier();
        let mut journal = Journal::new(at);

        let report = self.guarded(|sim| {
            let synthetic = sim
                .random
                .chance(STANDUP_IMPEDIMENT_CHANCE)
                .then(|| format!("Technical issue #{day}"));
            let (progress, flagged) = sim.developer.report_progress(sim.classifier.as_ref())?;
            let updates = vec![TeamUpdate {
                member: AgentRole::Developer.display_name().to_string(),
                status: "Working on task implementation".to_string(),
                impediment: flagged.or(synthetic),
            }];
            journal.communication(AgentRole::Developer.display_name(), TEAM, progress.clone());

            let (_, summary) = sim.scrum_master.daily_standup(day, &updates)?;
            journal.event(
                EventKind::DailyStandup,
                format!("Day {day} of Sprint {}", at.sprint),
            );
            journal.communication(AgentRole::ScrumMaster.display_name(), TEAM, summary.clone());

            let mut resolutions = Vec::new();
            for update in &updates {
                let Some(impediment) = &update.impediment else {
                    continue;
                };
                let resolution = sim.scrum_master.resolve_impediment(impediment)?;
                journal.event(
                    EventKind::ImpedimentResolution,
                    format!("Scrum Master addressing: {impediment}"),
                );
                journal.communication(
                    AgentRole::ScrumMaster.display_name(),
                    update.member.clone(),
                    resolution.clone(),
                );

                let escalation = if sim
                    .classifier
                    .classify(Intent::Escalation, &resolution)
                    .is_present()
                {
                    let reply = sim.coach.handle_impediment(impediment, tier)?;
                    journal.event(
                        EventKind::ImpedimentEscalation,
                        format!("Escalated to SAFe Coach: {impediment}"),
                    );
                    journal.communication(
                        AgentRole::Coach.display_name(),
                        AgentRole::ScrumMaster.display_name(),
                        reply.clone(),
                    );
                    Some(reply)
                } else {
                    None
                };
                resolutions.push(ImpedimentHandling {
                    impediment: impediment.clone(),
                    resolution,
                    escalation,
                });
            }

            Ok(StandupReport {
                day,
                sprint: at.sprint,
                pi: at.pi,
                impediments_addressed: updates
                    .iter()
                    .filter_map(|u| u.impediment.clone())
                    .collect(),
                updates,
                progress_report: progress,
                standup_summary: summary,
                resolutions,
            })
        })?;

        self.current_day = day;
        self.log.commit(journal);
        tracing::info!(
            pi = at.pi,
            sprint = at.sprint,
            day,
            impediments = report.impediments_addressed.len(),
            "daily standup completed"
        );
        Ok(report)
    }

    pub fn end_sprint(&mut self) -> Result<SprintReview> {
        self.require_open_sprint("end sprint")?;
        let at = self.coordinates();
        let mut journal = Journal::new(at);

        let review = self.guarded(|sim| {
            let (low, high) = COMPLETION_RANGE;
            let fraction = sim.random.uniform(low, high);
            let planned = sim.scrum_master.sprint_backlog().to_vec();
            let done = (planned.len() as f64 * fraction) as usize;
            let completed = planned[..done.min(planned.len())].to_vec();

            let mut reports = Vec::with_capacity(completed.len());
            for item in &completed {
                let (report, debt) = sim
                    .developer
                    .complete_task(item, sim.classifier.as_ref())?;
                journal.communication(AgentRole::Developer.display_name(), TEAM, report.clone());
                reports.push(CompletionReport {
                    item: item.clone(),
                    report,
                    technical_debt: debt,
                });
            }

            let (m, retrospective) = sim.scrum_master.end_sprint(&completed)?;
            journal.event(
                EventKind::SprintReview,
                format!(
                    "Completed Sprint {} with {}/{} items; retrospective held",
                    at.sprint,
                    completed.len(),
                    planned.len()
                ),
            );
            journal.communication(
                AgentRole::ScrumMaster.display_name(),
                TEAM,
                retrospective.clone(),
            );

            Ok(SprintReview {
                sprint_number: at.sprint,
                pi_number: at.pi,
                completion_rate: m.completion_rate,
                metrics: m,
                completed_items: completed,
                technical_debt: reports
                    .iter()
                    .filter_map(|r| r.technical_debt.clone())
                    .collect(),
                completion_reports: reports,
                retrospective,
            })
        })?;

        self.metrics
            .entry(at.pi)
            .or_default()
            .insert(at.sprint, review.metrics.clone());
        self.sprint_open = false;
        self.log.commit(journal);
        tracing::info!(
            pi = at.pi,
            sprint = at.sprint,
            completion_rate = review.completion_rate,
            "sprint ended"
        );
        Ok(review)
    }

    pub fn end_pi(&mut self) -> Result<PiReview> {
        self.require_pi("end PI")?;
        let at = self.coordinates();
        let tier = self.tier();
        let predictability = metrics::predictability(
            self.metrics.get(&at.pi).into_iter().flat_map(|s| s.values()),
        );
        let mut journal = Journal::new(at);

        let review = self.guarded(|sim| {
            let (bv_low, bv_high) = BUSINESS_VALUE_RANGE;
            let (ts_low, ts_high) = TEAM_SATISFACTION_RANGE;
            let pi_metrics = PiMetrics {
                predictability,
                business_value: sim.random.uniform(bv_low, bv_high),
                team_satisfaction: sim.random.uniform(ts_low, ts_high),
            };
            let achievements = metrics::achievements(predictability);
            let reply = sim.coach.end_pi(&achievements, &pi_metrics, tier)?;
            journal.event(
                EventKind::InspectAndAdapt,
                format!("System Demo and Inspect & Adapt completed for PI {}", at.pi),
            );
            journal.communication(AgentRole::Coach.display_name(), "Organization", reply.clone());
            Ok(PiReview {
                pi_number: at.pi,
                sprints_completed: at.sprint,
                metrics: pi_metrics,
                achievements,
                inspect_and_adapt: reply,
            })
        })?;

        self.log.commit(journal);
        tracing::info!(pi = at.pi, predictability, "PI ended");
        Ok(review)
    }

    /// Route a change to portfolio, program or team level.
    pub fn handle_change_request(&mut self, change: &ChangeRequest) -> Result<ChangeOutcome> {
        let at = self.coordinates();
        let tier = self.tier();
        let progress = match self.config.sprint_days() {
            0 => 0.0,
            days => f64::from(self.current_day) / f64::from(days) * 100.0,
        };
        let mut journal = Journal::new(at);

        let outcome = self.guarded(|sim| {
            let coach_name = AgentRole::Coach.display_name();
            if change.is_strategic() && tier.has_portfolio() {
                let themes = sim.coach.strategic_themes().to_vec();
                if change.align_with_themes && !themes.is_empty() {
                    let reply = sim.coach.align_with_strategy(
                        &themes,
                        std::slice::from_ref(&change.description),
                        tier,
                    )?;
                    journal.event(
                        EventKind::StrategicChange,
                        format!("Evaluating alignment of change: {}", change.description),
                    );
                    journal.communication(coach_name, "Portfolio Management", reply.clone());
                    let accepted = sim
                        .classifier
                        .classify(Intent::Endorsement, &reply)
                        .is_present();
                    return Ok(ChangeOutcome {
                        level: ChangeLevel::Portfolio,
                        handler: coach_name.to_string(),
                        response: reply,
                        developer_response: None,
                        accepted,
                    });
                }

                let reply = sim.coach.handle_impediment(
                    &format!("Strategic change request: {}", change.description),
                    tier,
                )?;
                journal.event(
                    EventKind::StrategicChange,
                    format!("Processing change: {}", change.description),
                );
                journal.communication(coach_name, "Leadership", reply.clone());
                let accepted = sim
                    .classifier
                    .classify(Intent::Acceptance, &reply)
                    .is_present();
                return Ok(ChangeOutcome {
                    level: ChangeLevel::Program,
                    handler: coach_name.to_string(),
                    response: reply,
                    developer_response: None,
                    accepted,
                });
            }

            let sm_name = AgentRole::ScrumMaster.display_name();
            let reply = sim.scrum_master.handle_change_request(change, progress)?;
            journal.event(
                EventKind::SprintChange,
                format!("Evaluating mid-sprint change: {}", change.description),
            );
            journal.communication(sm_name, TEAM, reply.clone());
            let accepted = sim
                .classifier
                .classify(Intent::Acceptance, &reply)
                .is_present();

            let current_task = sim.developer.current_tasks().first().cloned();
            let (handler, developer_response) = match current_task {
                Some(task) => {
                    let dev_reply = sim.developer.handle_change_request(change, &task)?;
                    journal.communication(
                        AgentRole::Developer.display_name(),
                        sm_name,
                        dev_reply.clone(),
                    );
                    ("Scrum Master & Developer".to_string(), Some(dev_reply))
                }
                None => (sm_name.to_string(), None),
            };
            Ok(ChangeOutcome {
                level: ChangeLevel::Team,
                handler,
                response: reply,
                developer_response,
                accepted,
            })
        })?;

        self.log.commit(journal);
        tracing::info!(
            level = ?outcome.level,
            accepted = outcome.accepted,
            "change request processed"
        );
        Ok(outcome)
    }

    /// Developer estimate for a product backlog item. The backlog is not
    /// modified.
    pub fn estimate_story(&mut self, item_name: &str) -> Result<StoryEstimate> {
        let item = self
            .product_backlog
            .iter()
            .find(|i| i.name == item_name)
            .cloned()
            .ok_or_else(|| SafeError::ItemNotFound(item_name.to_string()))?;
        let mut journal = Journal::new(self.coordinates());

        let (points, reply) =
            self.guarded(|sim| sim.developer.estimate(&item, sim.classifier.as_ref()))?;
        journal.event(
            EventKind::StoryEstimation,
            format!("Developer estimated '{}' at {points} points", item.name),
        );
        journal.communication(AgentRole::Developer.display_name(), TEAM, reply.clone());
        self.log.commit(journal);

        Ok(StoryEstimate {
            item: item.name,
            points,
            reply,
        })
    }

    /// Developer picks up an item from the current sprint backlog.
    pub fn start_work(&mut self, item_name: &str) -> Result<WorkStart> {
        self.require_sprint("start work")?;
        let item = self
            .scrum_master
            .sprint_backlog()
            .iter()
            .find(|i| i.name == item_name)
            .cloned()
            .ok_or_else(|| SafeError::ItemNotFound(item_name.to_string()))?;
        let mut journal = Journal::new(self.coordinates());

        let approach = self.guarded(|sim| sim.developer.start_work(&item))?;
        journal.event(
            EventKind::WorkStarted,
            format!("Developer started work on '{}'", item.name),
        );
        journal.communication(AgentRole::Developer.display_name(), TEAM, approach.clone());
        self.log.commit(journal);

        Ok(WorkStart { item, approach })
    }

    pub fn technical_guidance(&mut self, topic: &str) -> Result<String> {
        let mut journal = Journal::new(self.coordinates());
        let reply = self.guarded(|sim| sim.developer.provide_technical_input(topic))?;
        journal.event(
            EventKind::TechnicalGuidance,
            format!("Developer guidance on: {topic}"),
        );
        journal.communication(AgentRole::Developer.display_name(), TEAM, reply.clone());
        self.log.commit(journal);
        Ok(reply)
    }

    /// Portfolio and full tiers only; rejected with
    /// [`SafeError::ConfigurationMismatch`] otherwise.
    pub fn align_with_strategy(&mut self, epics: &[String]) -> Result<String> {
        let tier = self.tier();
        let themes = self.coach.strategic_themes().to_vec();
        let mut journal = Journal::new(self.coordinates());
        let reply = self.guarded(|sim| sim.coach.align_with_strategy(&themes, epics, tier))?;
        journal.event(
            EventKind::StrategyAlignment,
            format!(
                "Aligned {} epics with {} strategic themes",
                epics.len(),
                themes.len()
            ),
        );
        journal.communication(
            AgentRole::Coach.display_name(),
            "Portfolio Management",
            reply.clone(),
        );
        self.log.commit(journal);
        Ok(reply)
    }

    /// Full tier only.
    pub fn coordinate_solution_train(&mut self, solution: &str, arts: &[String]) -> Result<String> {
        let tier = self.tier();
        let mut journal = Journal::new(self.coordinates());
        let reply =
            self.guarded(|sim| sim.coach.coordinate_solution_train(solution, arts, tier))?;
        journal.event(
            EventKind::SolutionTrain,
            format!(
                "Coordinated Solution Train '{solution}' across {} ARTs",
                arts.len()
            ),
        );
        journal.communication(AgentRole::Coach.display_name(), "Solution Train", reply.clone());
        self.log.commit(journal);
        Ok(reply)
    }

    /// Free-form question to one agent, kept in its conversation.
    pub fn ask_agent(&mut self, role: AgentRole, question: &str) -> Result<String> {
        let mut journal = Journal::new(self.coordinates());
        let reply = self.guarded(|sim| sim.agent_mut(role).respond(question))?;
        journal.event(
            EventKind::AgentQuestion,
            format!("Question to {}: {question}", role.display_name()),
        );
        journal.communication(USER, role.display_name(), question);
        journal.communication(role.display_name(), USER, reply.clone());
        self.log.commit(journal);
        Ok(reply)
    }

    /// Step-by-step answer from one agent, outside its conversation.
    pub fn chain_of_thought(&mut self, role: AgentRole, question: &str) -> Result<Reasoning> {
        let reasoning = self.agent(role).chain_of_thought(question)?;
        let mut journal = Journal::new(self.coordinates());
        journal.event(
            EventKind::ChainOfThought,
            format!("{} reasoned about: {question}", role.display_name()),
        );
        journal.communication(role.display_name(), USER, reasoning.conclusion.clone());
        self.log.commit(journal);
        Ok(reasoning)
    }

    /// Every agent explains one view of the framework, step by step.
    pub fn demonstrate_configuration(&mut self, view: ConfigView) -> Result<ConfigDemonstration> {
        let ask = |role: AgentRole| self.agent(role).chain_of_thought(view.question(role));
        let coach = ask(AgentRole::Coach)?;
        let scrum_master = ask(AgentRole::ScrumMaster)?;
        let developer = ask(AgentRole::Developer)?;

        let mut journal = Journal::new(self.coordinates());
        journal.event(
            EventKind::ConfigurationDemo,
            format!("SAFe {} configuration explained by all agents", view.label()),
        );
        for (role, reasoning) in [
            (AgentRole::Coach, &coach),
            (AgentRole::ScrumMaster, &scrum_master),
            (AgentRole::Developer, &developer),
        ] {
            journal.communication(role.display_name(), USER, reasoning.conclusion.clone());
        }
        self.log.commit(journal);
        tracing::info!(view = view.as_str(), "configuration demonstrated");

        Ok(ConfigDemonstration {
            view,
            coach,
            scrum_master,
            developer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::sample_backlog;
    use crate::random::ScriptedRandom;
    use safe_llm::ScriptedProvider;

    fn sim_with(tier: Tier, draws: Vec<f64>) -> Simulation {
        let config = SafeConfig {
            tier,
            ..SafeConfig::default()
        };
        Simulation::builder(config)
            .provider(AgentRole::Coach, Box::new(ScriptedProvider::always("coach reply")))
            .provider(AgentRole::ScrumMaster, Box::new(ScriptedProvider::always("sm reply")))
            .provider(AgentRole::Developer, Box::new(ScriptedProvider::always("dev reply")))
            .random(Box::new(ScriptedRandom::new(draws)))
            .build()
    }

    #[test]
    fn counters_start_at_zero() {
        let sim = sim_with(Tier::Essential, vec![]);
        assert_eq!(sim.coordinates(), Coordinates::default());
        let state = sim.state();
        assert!(state.pi_start_date.is_none());
        assert!(state.sprint_start_date.is_none());
        assert_eq!(state.project_name, "Unnamed Project");
    }

    #[test]
    fn start_sprint_before_pi_is_rejected_without_side_effects() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        let err = sim.start_sprint().unwrap_err();
        assert!(matches!(err, SafeError::Precondition { .. }));
        assert_eq!(sim.coordinates(), Coordinates::default());
        assert!(sim.events(None).is_empty());
    }

    #[test]
    fn standup_and_end_sprint_need_active_sprint() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        sim.start_pi().unwrap();
        assert!(matches!(
            sim.run_daily_standup(),
            Err(SafeError::Precondition { .. })
        ));
        assert!(matches!(sim.end_sprint(), Err(SafeError::Precondition { .. })));
        assert!(matches!(sim.start_work("x"), Err(SafeError::Precondition { .. })));
    }

    #[test]
    fn end_pi_needs_started_pi() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        assert!(matches!(sim.end_pi(), Err(SafeError::Precondition { .. })));
    }

    #[test]
    fn start_pi_resets_sprint_and_logs_one_headline() {
        let mut sim = sim_with(Tier::Essential, vec![0.9]);
        sim.setup_project("Demo", sample_backlog(), None).unwrap();
        sim.start_pi().unwrap();
        sim.start_sprint().unwrap();
        let before = sim.events(None).len();
        let pi = sim.start_pi().unwrap();
        assert_eq!(pi.pi_number, 2);
        assert_eq!(sim.coordinates().sprint, 0);
        assert_eq!(sim.events(None).len(), before + 1);
        assert_eq!(sim.events(Some(1))[0].kind, EventKind::PiPlanning);
    }

    #[test]
    fn planned_end_dates_follow_lengths() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        let pi = sim.start_pi().unwrap();
        assert_eq!(pi.planned_end_date - pi.start_date, Duration::weeks(10));
        let sprint = sim.start_sprint().unwrap();
        assert_eq!(sprint.planned_end_date - sprint.start_date, Duration::weeks(2));
    }

    #[test]
    fn setup_twice_is_rejected() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        sim.setup_project("Demo", vec![], None).unwrap();
        assert!(sim.setup_project("Again", vec![], None).is_err());
        assert_eq!(sim.project_name(), "Demo");
    }

    #[test]
    fn themes_ignored_under_essential() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        sim.setup_project("Demo", vec![], Some(vec!["Growth".into()])).unwrap();
        assert!(sim.state().strategic_themes.is_empty());
    }

    #[test]
    fn estimate_story_requires_known_item() {
        let mut sim = sim_with(Tier::Essential, vec![]);
        sim.setup_project("Demo", sample_backlog(), None).unwrap();
        assert!(matches!(
            sim.estimate_story("Teleportation"),
            Err(SafeError::ItemNotFound(_))
        ));
        let est = sim.estimate_story("Dashboard UI").unwrap();
        assert_eq!(est.points, 5);
        assert_eq!(sim.product_backlog(), &sample_backlog()[..]);
        assert_eq!(sim.events(Some(1))[0].kind, EventKind::StoryEstimation);
    }
}
