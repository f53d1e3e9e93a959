use safe_llm::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::{list_or, Agent, Checkpoint};
use crate::backlog::{format_backlog, BacklogItem};
use crate::change::ChangeRequest;
use crate::error::Result;
use crate::metrics::{self, SprintMetrics};
use crate::types::AgentRole;

/// One team member's stand-up status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamUpdate {
    pub member: String,
    pub status: String,
    pub impediment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrumMasterState {
    pub pi: u32,
    pub sprint: u32,
    pub sprint_backlog: Vec<BacklogItem>,
    /// Open impediments, unique, in the order raised.
    pub impediments: Vec<String>,
    /// Completed points per finished sprint.
    pub velocity_history: Vec<u32>,
}

pub struct ScrumMaster {
    agent: Agent,
    state: ScrumMasterState,
}

impl ScrumMaster {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        let role = AgentRole::ScrumMaster;
        Self {
            agent: Agent::new(role, system_prompt(role.display_name()), provider),
            state: ScrumMasterState::default(),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn state(&self) -> &ScrumMasterState {
        &self.state
    }

    pub fn sprint_backlog(&self) -> &[BacklogItem] {
        &self.state.sprint_backlog
    }

    pub fn impediments(&self) -> &[String] {
        &self.state.impediments
    }

    pub fn velocity(&self) -> f64 {
        metrics::velocity(&self.state.velocity_history)
    }

    /// Sprint planning: fill a sprint backlog from `pi_scope` up to the
    /// team's velocity.
    pub fn start_sprint(
        &mut self,
        pi: u32,
        sprint: u32,
        pi_scope: &[BacklogItem],
    ) -> Result<(Vec<BacklogItem>, String)> {
        let velocity = self.velocity();
        let prompt = format!(
            "As a Scrum Master, facilitate Sprint Planning for Sprint {sprint} of PI {pi}.\n\n\
             Items available from the PI scope:\n{}\n\
             Team average velocity: {velocity} story points\n\n\
             Please:\n\
             1. Pick sprint backlog items that fit the velocity\n\
             2. Break items into tasks where useful\n\
             3. Flag risks or impediments for the sprint\n\
             4. State the sprint goal\n\
             5. Present a clear sprint plan",
            format_backlog(pi_scope),
        );
        let reply = self.agent.respond(prompt)?;

        let backlog = metrics::select_sprint_backlog(pi_scope, velocity);
        self.state.pi = pi;
        self.state.sprint = sprint;
        self.state.sprint_backlog = backlog.clone();
        Ok((backlog, reply))
    }

    /// Stand-up summary. New impediments from `updates` join the open list.
    pub fn daily_standup(
        &mut self,
        day: u32,
        updates: &[TeamUpdate],
    ) -> Result<(Vec<BacklogItem>, String)> {
        let prompt = format!(
            "As a Scrum Master, facilitate the Daily Standup for day {day} of Sprint {} (PI {}).\n\n\
             Team updates:\n{}\n\
             Open impediments: {}\n\n\
             Please:\n\
             1. Summarize the team's progress\n\
             2. Call out new impediments that need attention\n\
             3. Decide whether the sprint plan needs adjusting\n\
             4. Give guidance to keep the team on track",
            self.state.sprint,
            self.state.pi,
            format_updates(updates),
            list_or(&self.state.impediments, "None"),
        );
        let reply = self.agent.respond(prompt)?;

        for impediment in updates.iter().filter_map(|u| u.impediment.as_ref()) {
            if !self.state.impediments.contains(impediment) {
                self.state.impediments.push(impediment.clone());
            }
        }
        Ok((self.state.sprint_backlog.clone(), reply))
    }

    /// Address an impediment and drop it from the open list (no-op if it
    /// was never raised).
    pub fn resolve_impediment(&mut self, impediment: &str) -> Result<String> {
        let prompt = format!(
            "As a Scrum Master, deal with this impediment for your team:\n\n\
             Impediment: {impediment}\n\n\
             Please:\n\
             1. Analyze its impact on the team\n\
             2. Propose a concrete resolution strategy\n\
             3. Name the stakeholders who need to be involved\n\
             4. Suggest how to prevent it in future"
        );
        let reply = self.agent.respond(prompt)?;
        self.state.impediments.retain(|i| i != impediment);
        Ok(reply)
    }

    /// Sprint review and retrospective. Records velocity and clears the
    /// sprint backlog.
    pub fn end_sprint(&mut self, completed: &[BacklogItem]) -> Result<(SprintMetrics, String)> {
        let m = SprintMetrics::compute(&self.state.sprint_backlog, completed);
        let prompt = format!(
            "As a Scrum Master, run the Sprint Review and Retrospective for Sprint {} of PI {}.\n\n\
             Sprint metrics:\n\
             - Planned items: {}\n\
             - Completed items: {}\n\
             - Planned story points: {}\n\
             - Completed story points: {}\n\
             - Completion rate: {:.1}%\n\
             - Sprint velocity: {}\n\n\
             Completed items:\n{}\n\
             Impediments encountered: {}\n\n\
             Please:\n\
             1. Summarize what the sprint achieved\n\
             2. Say what went well and what could improve\n\
             3. Propose concrete actions for the next sprint\n\
             4. Comment on trends in team performance",
            self.state.sprint,
            self.state.pi,
            m.planned_items,
            m.completed_items,
            m.planned_points,
            m.completed_points,
            m.completion_rate,
            m.velocity,
            format_backlog(completed),
            list_or(&self.state.impediments, "None"),
        );
        let reply = self.agent.respond(prompt)?;

        self.state.velocity_history.push(m.completed_points);
        self.state.sprint_backlog.clear();
        Ok((m, reply))
    }

    pub fn handle_change_request(
        &mut self,
        change: &ChangeRequest,
        sprint_progress: f64,
    ) -> Result<String> {
        let estimate = change
            .estimate
            .map_or_else(|| "Unknown".to_string(), |e| e.to_string());
        let prompt = format!(
            "As a Scrum Master, a change request has arrived during Sprint {} of PI {}:\n\n\
             Change request: {}\n\
             Priority: {}/10\n\
             Size estimate: {estimate} story points\n\
             The current sprint is {sprint_progress:.0}% complete.\n\
             Current sprint backlog:\n{}\n\
             Open impediments: {}\n\n\
             Please:\n\
             1. Assess the change's impact on the sprint\n\
             2. Decide whether to accept, defer or reject it\n\
             3. If accepting, explain the adjustments needed\n\
             4. Justify the decision with Agile principles",
            self.state.sprint,
            self.state.pi,
            change.description,
            change.priority,
            format_backlog(&self.state.sprint_backlog),
            list_or(&self.state.impediments, "None"),
        );
        self.agent.respond(prompt)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint<ScrumMasterState> {
        Checkpoint::new(&self.agent, self.state.clone())
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint<ScrumMasterState>) {
        self.state = checkpoint.restore_into(&mut self.agent);
    }
}

fn format_updates(updates: &[TeamUpdate]) -> String {
    let mut out = String::new();
    for u in updates {
        let _ = writeln!(out, "{}: {}", u.member, u.status);
        if let Some(imp) = &u.impediment {
            let _ = writeln!(out, "  Impediment: {imp}");
        }
    }
    out
}

fn system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a Scrum Master in a SAFe (Scaled Agile Framework) implementation.\n\
         Your responsibilities:\n\
         1. Facilitating Scrum events (Sprint Planning, Daily Stand-ups, Sprint Review, Retrospective)\n\
         2. Coaching the team on Agile and Scrum practice\n\
         3. Removing impediments for the team\n\
         4. Shielding the team from outside interference\n\
         5. Helping the team improve its process\n\
         6. Working with the SAFe Coach (RTE) during program events\n\
         7. Keeping team goals aligned with program objectives\n\
         8. Tracking and reporting team-level metrics\n\
         9. Joining the Scrum of Scrums when needed\n\
         10. Helping the team produce high-quality increments\n\n\
         Answer in line with SAFe and Scrum principles, using the proper terminology. \
         Help the team deliver value while it keeps improving how it works."
    )
}
