use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::{Result, SafeError};

/// Relative sizing scale agents are asked to estimate on.
pub const STORY_POINT_SCALE: [u32; 7] = [1, 2, 3, 5, 8, 13, 20];

/// Estimate assumed for an unestimated item when filling a sprint.
pub const PLANNING_DEFAULT_POINTS: u32 = 5;

/// Estimate assumed for an unestimated item when totalling sprint metrics.
pub const REVIEW_DEFAULT_POINTS: u32 = 3;

// ---------------------------------------------------------------------------
// BacklogItem
// ---------------------------------------------------------------------------

/// A candidate work item. Identity is the item name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
}

impl BacklogItem {
    pub fn new(name: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            priority,
            estimate: None,
            description: None,
            acceptance_criteria: Vec::new(),
        }
    }

    pub fn with_estimate(mut self, points: u32) -> Self {
        self.estimate = Some(points);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Story points, falling back to `default` when unestimated.
    pub fn points_or(&self, default: u32) -> u32 {
        resolve_estimate(self.estimate, default)
    }

    /// Copy of this item with the estimate filled in.
    pub fn resolved(&self, default: u32) -> BacklogItem {
        BacklogItem {
            estimate: Some(self.points_or(default)),
            ..self.clone()
        }
    }

    /// Reject an estimate that is off the story point scale.
    pub fn check_estimate(&self) -> Result<()> {
        match self.estimate {
            Some(points) if !STORY_POINT_SCALE.contains(&points) => {
                Err(SafeError::InvalidEstimate {
                    item: self.name.clone(),
                    points,
                })
            }
            _ => Ok(()),
        }
    }

    pub fn same_item(&self, other: &BacklogItem) -> bool {
        self.name == other.name
    }

    pub(crate) fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or("No detailed description provided")
    }

    pub(crate) fn criteria_or_default(&self) -> String {
        if self.acceptance_criteria.is_empty() {
            "None provided".to_string()
        } else {
            self.acceptance_criteria.join("; ")
        }
    }
}

/// The single place an estimate default is applied.
pub fn resolve_estimate(estimate: Option<u32>, default: u32) -> u32 {
    estimate.unwrap_or(default)
}

pub fn total_points(items: &[BacklogItem], default: u32) -> u32 {
    items
        .iter()
        .fold(0u32, |acc, i| acc.saturating_add(i.points_or(default)))
}

/// Numbered list used inside agent prompts.
pub fn format_backlog(items: &[BacklogItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        let _ = write!(out, "{}. {} (Priority: {}", i + 1, item.name, item.priority);
        if let Some(est) = item.estimate {
            let _ = write!(out, ", Estimate: {est}");
        }
        out.push_str(")\n");
    }
    out
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

/// Twelve-item backlog used by the demo and by `use_sample_backlog`.
pub fn sample_backlog() -> Vec<BacklogItem> {
    [
        ("User Authentication", 10, 8, "Implement secure user authentication system"),
        ("Dashboard UI", 8, 5, "Create responsive dashboard interface"),
        ("Data Export", 6, 3, "Allow users to export data in multiple formats"),
        ("API Integration", 7, 8, "Integrate with third-party payment processing API"),
        ("Reporting Module", 5, 13, "Create customizable reporting system"),
        ("User Preferences", 4, 3, "Allow users to customize their experience"),
        ("Mobile Responsiveness", 7, 5, "Ensure application works well on mobile devices"),
        ("Email Notifications", 6, 5, "Send email alerts for important events"),
        ("Search Functionality", 5, 8, "Implement advanced search across all content"),
        ("Admin Dashboard", 8, 8, "Create administration interface for system management"),
        ("Performance Optimization", 4, 5, "Improve system response time and throughput"),
        ("Data Visualization", 3, 8, "Add charts and graphs to represent data"),
    ]
    .into_iter()
    .map(|(name, priority, estimate, description)| {
        BacklogItem::new(name, priority)
            .with_estimate(estimate)
            .with_description(description)
    })
    .collect()
}

/// Strategic themes used for portfolio and full tiers when none are supplied.
pub fn default_strategic_themes() -> Vec<String> {
    [
        "Digital Transformation",
        "Customer Experience Enhancement",
        "Operational Excellence",
        "Market Expansion",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
