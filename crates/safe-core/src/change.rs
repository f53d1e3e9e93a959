use serde::{Deserialize, Serialize};

/// Priority at or above which a change counts as strategic.
pub const STRATEGIC_PRIORITY: i64 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<u32>,
    #[serde(default)]
    pub strategic: bool,
    /// Asks for a strategic-theme alignment check on the portfolio path.
    #[serde(default)]
    pub align_with_themes: bool,
}

fn default_priority() -> i64 {
    5
}

fn default_urgency() -> String {
    "medium".to_string()
}

impl ChangeRequest {
    pub fn new(description: impl Into<String>, priority: i64) -> Self {
        Self {
            description: description.into(),
            priority,
            urgency: default_urgency(),
            estimate: None,
            strategic: false,
            align_with_themes: false,
        }
    }

    pub fn strategic(mut self) -> Self {
        self.strategic = true;
        self
    }

    pub fn with_theme_alignment(mut self) -> Self {
        self.align_with_themes = true;
        self
    }

    pub fn is_strategic(&self) -> bool {
        self.strategic || self.priority >= STRATEGIC_PRIORITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    Portfolio,
    Program,
    Team,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    pub level: ChangeLevel,
    pub handler: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_response: Option<String>,
    pub accepted: bool,
}
