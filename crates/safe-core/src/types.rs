use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SafeError;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// SAFe configuration level. Higher tiers unlock portfolio and
/// solution-train operations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Essential,
    Portfolio,
    Full,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[Tier::Essential, Tier::Portfolio, Tier::Full]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Essential => "essential",
            Tier::Portfolio => "portfolio",
            Tier::Full => "full",
        }
    }

    /// Capitalized label used in log descriptions and prompts.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Essential => "Essential",
            Tier::Portfolio => "Portfolio",
            Tier::Full => "Full",
        }
    }

    pub fn has_portfolio(self) -> bool {
        matches!(self, Tier::Portfolio | Tier::Full)
    }

    pub fn has_solution_train(self) -> bool {
        self == Tier::Full
    }

    /// Parse leniently: unknown input falls back to the default tier.
    pub fn parse_or_default(s: &str) -> Tier {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(tier = s, "unknown configuration tier, using essential");
            Tier::default()
        })
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = SafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "essential" => Ok(Tier::Essential),
            "portfolio" => Ok(Tier::Portfolio),
            "full" => Ok(Tier::Full),
            _ => Err(SafeError::UnknownTier(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coach,
    ScrumMaster,
    Developer,
}

impl AgentRole {
    pub fn all() -> &'static [AgentRole] {
        &[AgentRole::Coach, AgentRole::ScrumMaster, AgentRole::Developer]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Coach => "coach",
            AgentRole::ScrumMaster => "scrum_master",
            AgentRole::Developer => "developer",
        }
    }

    /// Display name used as sender/recipient in the communication log.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Coach => "SAFe Coach",
            AgentRole::ScrumMaster => "Scrum Master",
            AgentRole::Developer => "Developer",
        }
    }

    /// Role description placed in the agent's system prompt.
    pub fn title(self) -> &'static str {
        match self {
            AgentRole::Coach => "Release Train Engineer (RTE)",
            AgentRole::ScrumMaster => "Scrum Master",
            AgentRole::Developer => "Developer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = SafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coach" | "safe_coach" | "rte" => Ok(AgentRole::Coach),
            "scrum_master" | "scrum-master" | "sm" => Ok(AgentRole::ScrumMaster),
            "developer" | "dev" => Ok(AgentRole::Developer),
            _ => Err(SafeError::UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_gates() {
        assert!(!Tier::Essential.has_portfolio());
        assert!(Tier::Portfolio.has_portfolio());
        assert!(!Tier::Portfolio.has_solution_train());
        assert!(Tier::Full.has_solution_train());
    }

    #[test]
    fn unknown_tier_falls_back() {
        assert_eq!(Tier::parse_or_default("Large Solution"), Tier::Essential);
        assert_eq!(Tier::parse_or_default("FULL"), Tier::Full);
        assert!(matches!(
            "big".parse::<Tier>(),
            Err(SafeError::UnknownTier(_))
        ));
    }

    #[test]
    fn role_accepts_wire_aliases() {
        assert_eq!("safe_coach".parse::<AgentRole>().unwrap(), AgentRole::Coach);
        assert_eq!("scrum_master".parse::<AgentRole>().unwrap(), AgentRole::ScrumMaster);
        assert!("product_owner".parse::<AgentRole>().is_err());
    }
}
