use safe_llm::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Agent, Checkpoint};
use crate::backlog::{format_backlog, BacklogItem};
use crate::error::{Result, SafeError};
use crate::metrics::{self, PiMetrics};
use crate::types::{AgentRole, Tier};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoachState {
    pub pi_counter: u32,
    /// Inspect & Adapt metrics keyed by PI number.
    pub metrics: BTreeMap<u32, PiMetrics>,
    /// Portfolio and full tiers only.
    pub strategic_themes: Vec<String>,
    /// Epics that have been through strategy alignment, unique, in order.
    pub portfolio_backlog: Vec<String>,
}

/// SAFe Coach acting as Release Train Engineer.
pub struct Coach {
    agent: Agent,
    state: CoachState,
}

impl Coach {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        let role = AgentRole::Coach;
        Self {
            agent: Agent::new(role, system_prompt(role.display_name()), provider),
            state: CoachState::default(),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn state(&self) -> &CoachState {
        &self.state
    }

    pub fn strategic_themes(&self) -> &[String] {
        &self.state.strategic_themes
    }

    pub(crate) fn set_strategic_themes(&mut self, themes: Vec<String>) {
        self.state.strategic_themes = themes;
    }

    /// PI planning. The scope is the first ten backlog items in order.
    pub fn start_pi_planning(
        &mut self,
        backlog: &[BacklogItem],
        tier: Tier,
    ) -> Result<(Vec<BacklogItem>, String)> {
        let pi = self.state.pi_counter + 1;
        let prompt = format!(
            "As a SAFe Coach, run PI Planning for PI {pi} using the {tier} SAFe configuration.\n\n\
             The backlog currently holds:\n{}\n\
             Please:\n\
             1. Share the vision and objectives for this PI\n\
             2. Prioritize the backlog items\n\
             3. Choose a realistic scope for the PI\n\
             4. Identify key dependencies and risks\n\
             5. Produce a structured PI plan",
            format_backlog(backlog),
        );
        let reply = self.agent.respond(prompt)?;
        self.state.pi_counter = pi;
        Ok((metrics::select_pi_scope(backlog), reply))
    }

    /// Program-level handling of an impediment or escalated request.
    pub fn handle_impediment(&mut self, impediment: &str, tier: Tier) -> Result<String> {
        let prompt = format!(
            "As a SAFe Coach working in the {tier} SAFe configuration, address this impediment:\n\n\
             Impediment: {impediment}\n\n\
             How would you resolve it at the program level, and what actions would you take?"
        );
        self.agent.respond(prompt)
    }

    /// Inspect & Adapt for the PI just finished; stores `metrics` under it.
    pub fn end_pi(
        &mut self,
        achievements: &[String],
        metrics: &PiMetrics,
        tier: Tier,
    ) -> Result<String> {
        let pi = self.state.pi_counter;
        let prompt = format!(
            "As a SAFe Coach working in the {tier} SAFe configuration, run an Inspect & Adapt \
             workshop for PI {pi}, which has just ended.\n\n\
             Achievements:\n{}\n\n\
             Metrics:\n\
             - Predictability: {:.1}%\n\
             - Business value delivered: {:.1}\n\
             - Team satisfaction: {:.1}/10\n\n\
             Please:\n\
             1. Analyze how the PI performed\n\
             2. Draw out the key learnings\n\
             3. Propose concrete improvements for the next PI\n\
             4. Give actionable recommendations for each level",
            achievements.join(", "),
            metrics.predictability,
            metrics.business_value,
            metrics.team_satisfaction,
        );
        let reply = self.agent.respond(prompt)?;
        self.state.metrics.insert(pi, metrics.clone());
        Ok(reply)
    }

    /// Portfolio and full tiers only.
    pub fn align_with_strategy(
        &mut self,
        themes: &[String],
        epics: &[String],
        tier: Tier,
    ) -> Result<String> {
        if !tier.has_portfolio() {
            return Err(SafeError::ConfigurationMismatch {
                operation: "align with strategy",
                required: Tier::Portfolio,
            });
        }
        let prompt = format!(
            "As a SAFe Coach working in the {tier} SAFe configuration, align these epics \
             with the strategic themes.\n\n\
             Strategic Themes:\n{}\n\n\
             Epics:\n{}\n\n\
             Please:\n\
             1. Analyze how each epic supports the themes\n\
             2. Prioritize the epics by strategic alignment\n\
             3. Recommend which epics to fund and build\n\
             4. Explain the decision using Lean Portfolio Management principles",
            themes.join(", "),
            epics.join(", "),
        );
        let reply = self.agent.respond(prompt)?;
        for epic in epics {
            if !self.state.portfolio_backlog.contains(epic) {
                self.state.portfolio_backlog.push(epic.clone());
            }
        }
        Ok(reply)
    }

    /// Full tier only.
    pub fn coordinate_solution_train(
        &mut self,
        solution: &str,
        arts: &[String],
        tier: Tier,
    ) -> Result<String> {
        if !tier.has_solution_train() {
            return Err(SafeError::ConfigurationMismatch {
                operation: "coordinate solution train",
                required: Tier::Full,
            });
        }
        let prompt = format!(
            "As a SAFe Coach working in the Full SAFe configuration, coordinate this Solution Train:\n\n\
             Solution: {solution}\n\
             Agile Release Trains involved:\n{}\n\n\
             Please:\n\
             1. Outline how you will coordinate these ARTs\n\
             2. Describe how dependencies between ARTs will be handled\n\
             3. Explain how alignment with the portfolio vision is kept\n\
             4. Suggest a cadence for Solution Train events\n\
             5. Propose metrics for solution-level progress",
            arts.join(", "),
        );
        self.agent.respond(prompt)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint<CoachState> {
        Checkpoint::new(&self.agent, self.state.clone())
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint<CoachState>) {
        self.state = checkpoint.restore_into(&mut self.agent);
    }
}

fn system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a Release Train Engineer (RTE) in a SAFe (Scaled Agile Framework) \
         implementation.\n\
         Your responsibilities:\n\
         1. Facilitating Agile Release Train (ART) events and processes\n\
         2. Supporting teams in their agile practices\n\
         3. Keeping teams aligned with strategic objectives\n\
         4. Guiding PI Planning, System Demos and Inspect & Adapt workshops\n\
         5. Removing program-level impediments\n\
         6. Mentoring Scrum Masters and teams on SAFe practice\n\
         7. Tracking and reporting program-level metrics\n\n\
         In Portfolio SAFe you also:\n\
         8. Drive portfolio-level decisions\n\
         9. Prioritize work using Lean Portfolio Management\n\
         10. Align work with enterprise strategy and value streams\n\n\
         In Full SAFe you additionally:\n\
         11. Coordinate across team, program and portfolio levels\n\
         12. Manage several ARTs and work with Solution Trains\n\
         13. Apply the seven core competencies of business agility\n\n\
         Answer in line with SAFe principles, using SAFe terminology correctly. \
         Maximize delivered business value while keeping a sustainable pace and high quality."
    )
}
