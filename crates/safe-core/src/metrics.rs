use serde::{Deserialize, Serialize};

use crate::backlog::{total_points, BacklogItem, PLANNING_DEFAULT_POINTS, REVIEW_DEFAULT_POINTS};

/// Velocity assumed before any sprint has completed.
pub const DEFAULT_VELOCITY: f64 = 20.0;

/// Sprints averaged when computing velocity.
pub const VELOCITY_WINDOW: usize = 3;

/// Most items a PI can take into scope.
pub const PI_SCOPE_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// SprintMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintMetrics {
    pub planned_items: usize,
    pub completed_items: usize,
    pub planned_points: u32,
    pub completed_points: u32,
    /// Percentage of planned items completed; 100 when nothing was planned.
    pub completion_rate: f64,
    /// Completed points this sprint.
    pub velocity: u32,
}

impl SprintMetrics {
    pub fn compute(planned: &[BacklogItem], completed: &[BacklogItem]) -> Self {
        let planned_points = total_points(planned, REVIEW_DEFAULT_POINTS);
        let completed_points = total_points(completed, REVIEW_DEFAULT_POINTS);
        let completion_rate = if planned.is_empty() {
            100.0
        } else {
            completed.len() as f64 / planned.len() as f64 * 100.0
        };
        Self {
            planned_items: planned.len(),
            completed_items: completed.len(),
            planned_points,
            completed_points,
            completion_rate,
            velocity: completed_points,
        }
    }
}

// ---------------------------------------------------------------------------
// PiMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiMetrics {
    pub predictability: f64,
    pub business_value: f64,
    pub team_satisfaction: f64,
}

/// Completed over planned points across a PI's sprints, as a percentage.
/// 100 when nothing was planned.
pub fn predictability<'a>(sprints: impl IntoIterator<Item = &'a SprintMetrics>) -> f64 {
    let (planned, completed) = sprints.into_iter().fold((0u64, 0u64), |(p, c), m| {
        (p + u64::from(m.planned_points), c + u64::from(m.completed_points))
    });
    if planned == 0 {
        100.0
    } else {
        completed as f64 / planned as f64 * 100.0
    }
}

/// `Feature A`, `Feature B`, ... one per 20 points of predictability, at most five.
pub fn achievements(predictability: f64) -> Vec<String> {
    let count = ((predictability / 20.0).floor().max(0.0) as usize).min(5);
    (0..count)
        .map(|i| format!("Feature {}", char::from(b'A' + i as u8)))
        .collect()
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Average of the most recent completed-point totals.
pub fn velocity(history: &[u32]) -> f64 {
    if history.is_empty() {
        return DEFAULT_VELOCITY;
    }
    let recent = &history[history.len().saturating_sub(VELOCITY_WINDOW)..];
    recent.iter().map(|&p| f64::from(p)).sum::<f64>() / recent.len() as f64
}

/// First `min(10, len)` items, in backlog order.
pub fn select_pi_scope(backlog: &[BacklogItem]) -> Vec<BacklogItem> {
    backlog.iter().take(PI_SCOPE_LIMIT).cloned().collect()
}

/// Greedy in-order fill: an item is taken when it still fits under
/// `velocity`, and filling stops once the sprint holds `velocity / 3` items.
/// Returned items carry their resolved estimate.
pub fn select_sprint_backlog(scope: &[BacklogItem], velocity: f64) -> Vec<BacklogItem> {
    let item_cap = velocity / 3.0;
    let mut total = 0u32;
    let mut selected = Vec::new();
    for item in scope {
        let item = item.resolved(PLANNING_DEFAULT_POINTS);
        let points = item.points_or(PLANNING_DEFAULT_POINTS);
        let next = total.saturating_add(points);
        if f64::from(next) <= velocity {
            total = next;
            selected.push(item);
        }
        if selected.len() as f64 >= item_cap {
            break;
        }
    }
    selected
}
