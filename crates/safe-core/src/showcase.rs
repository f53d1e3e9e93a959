//! Guided walkthroughs of the SAFe configurations: each agent answers a
//! role-specific question about one view of the framework.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agents::Reasoning;
use crate::error::SafeError;
use crate::types::AgentRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigView {
    BigPicture,
    CoreCompetencies,
    Essential,
    LargeSolution,
    Portfolio,
    Full,
}

impl ConfigView {
    pub fn all() -> &'static [ConfigView] {
        &[
            ConfigView::BigPicture,
            ConfigView::CoreCompetencies,
            ConfigView::Essential,
            ConfigView::LargeSolution,
            ConfigView::Portfolio,
            ConfigView::Full,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigView::BigPicture => "big_picture",
            ConfigView::CoreCompetencies => "core_competencies",
            ConfigView::Essential => "essential",
            ConfigView::LargeSolution => "large_solution",
            ConfigView::Portfolio => "portfolio",
            ConfigView::Full => "full",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigView::BigPicture => "Big Picture",
            ConfigView::CoreCompetencies => "Core Competencies",
            ConfigView::Essential => "Essential",
            ConfigView::LargeSolution => "Large Solution",
            ConfigView::Portfolio => "Portfolio",
            ConfigView::Full => "Full",
        }
    }

    pub fn question(self, role: AgentRole) -> &'static str {
        use AgentRole::*;
        use ConfigView::*;
        match (self, role) {
            (BigPicture, Coach) => "Explain the SAFe Big Picture configuration. What are the key components and how do they work together?",
            (BigPicture, ScrumMaster) => "How would you use the SAFe Big Picture to help teams understand their place in the organization?",
            (BigPicture, Developer) => "From a developer perspective, which parts of the SAFe Big Picture matter most in your daily work?",
            (CoreCompetencies, Coach) => "Explain the SAFe Core Competencies and why they matter for business agility.",
            (CoreCompetencies, ScrumMaster) => "How would you help teams build these core competencies into their daily practice?",
            (CoreCompetencies, Developer) => "Which core competencies directly affect development teams, and how can developers contribute to them?",
            (Essential, Coach) => "Explain the Essential SAFe configuration. What is the minimum needed to implement SAFe?",
            (Essential, ScrumMaster) => "How would you introduce Essential SAFe practices to a team that is new to SAFe?",
            (Essential, Developer) => "What changes would developers notice when moving from traditional development to Essential SAFe?",
            (LargeSolution, Coach) => "Explain the Large Solution SAFe configuration. How does it extend Essential SAFe?",
            (LargeSolution, ScrumMaster) => "Which additional events and practices would you introduce when scaling to Large Solution SAFe?",
            (LargeSolution, Developer) => "How does development work change when moving from Essential to Large Solution SAFe?",
            (Portfolio, Coach) => "Explain the Portfolio SAFe configuration. How does it help align strategy with execution?",
            (Portfolio, ScrumMaster) => "How would you explain the link between portfolio-level decisions and team-level work?",
            (Portfolio, Developer) => "How do portfolio concerns such as strategic themes affect developers day to day?",
            (Full, Coach) => "Explain the Full SAFe configuration. Which challenges of the largest enterprises does it address?",
            (Full, ScrumMaster) => "What are the main challenges in implementing Full SAFe, and how would you address them?",
            (Full, Developer) => "How do developers stay agile and avoid bureaucracy in a Full SAFe implementation?",
        }
    }
}

impl fmt::Display for ConfigView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigView {
    type Err = SafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        ConfigView::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == key)
            .ok_or_else(|| SafeError::UnknownTier(s.to_string()))
    }
}

/// One reasoning answer per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDemonstration {
    pub view: ConfigView,
    pub coach: Reasoning,
    pub scrum_master: Reasoning,
    pub developer: Reasoning,
}
