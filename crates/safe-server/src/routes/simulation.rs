use axum::extract::State;
use axum::Json;
use safe_core::backlog::{default_strategic_themes, sample_backlog, BacklogItem};
use safe_core::change::ChangeRequest;
use safe_core::types::Tier;
use safe_core::SafeError;
use serde::Deserialize;
use serde_json::Value;

use super::perform;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Initialize
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct InitializeBody {
    #[serde(default = "default_configuration")]
    pub configuration: String,
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_true")]
    pub use_sample_backlog: bool,
    #[serde(default)]
    pub custom_backlog: Vec<BacklogItem>,
    /// Portfolio and full only; defaults to the standard four themes.
    #[serde(default)]
    pub strategic_themes: Option<Vec<String>>,
}

fn default_configuration() -> String {
    Tier::Essential.as_str().to_string()
}

fn default_project_name() -> String {
    "Demo Project".to_string()
}

fn default_true() -> bool {
    true
}

/// POST /api/initialize - replace the simulation with a fresh one.
pub async fn initialize(
    State(app): State<AppState>,
    Json(body): Json<InitializeBody>,
) -> Result<Json<Value>, AppError> {
    let tier = Tier::parse_or_default(&body.configuration);
    let shared = app.clone();
    let state = tokio::task::spawn_blocking(move || {
        let mut sim = shared.build_simulation(tier);
        let backlog = if body.use_sample_backlog {
            sample_backlog()
        } else {
            body.custom_backlog
        };
        let themes = tier
            .has_portfolio()
            .then(|| body.strategic_themes.unwrap_or_else(default_strategic_themes));
        sim.setup_project(body.project_name, backlog, themes)?;
        let state = sim.state();
        shared.replace_simulation(sim);
        Ok::<_, SafeError>(state)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    tracing::info!(%tier, project = %state.project_name, "simulation initialized");
    app.notify("initialized", state.clone());
    Ok(Json(serde_json::json!({
        "message": format!("Simulation initialized with {tier} configuration"),
        "state": state,
    })))
}

// ---------------------------------------------------------------------------
// Ceremonies
// ---------------------------------------------------------------------------

/// POST /api/start_pi - PI planning with the coach.
pub async fn start_pi(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    perform(app, Some("pi_started"), |sim| sim.start_pi()).await
}

/// POST /api/start_sprint - sprint planning with the scrum master.
pub async fn start_sprint(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    perform(app, Some("sprint_started"), |sim| sim.start_sprint()).await
}

/// POST /api/daily_standup
pub async fn daily_standup(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    perform(app, Some("standup_completed"), |sim| sim.run_daily_standup()).await
}

/// POST /api/end_sprint - sprint review and retrospective.
pub async fn end_sprint(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    perform(app, Some("sprint_ended"), |sim| sim.end_sprint()).await
}

/// POST /api/end_pi - system demo and Inspect & Adapt.
pub async fn end_pi(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    perform(app, Some("pi_ended"), |sim| sim.end_pi()).await
}

// ---------------------------------------------------------------------------
// Change requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChangeRequestBody {
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    #[serde(default = "default_estimate")]
    pub estimate: Option<u32>,
    #[serde(default)]
    pub strategic: bool,
    #[serde(default)]
    pub align_with_themes: bool,
}

fn default_description() -> String {
    "Unnamed change request".to_string()
}

fn default_priority() -> i64 {
    5
}

fn default_urgency() -> String {
    "medium".to_string()
}

fn default_estimate() -> Option<u32> {
    Some(5)
}

impl From<ChangeRequestBody> for ChangeRequest {
    fn from(body: ChangeRequestBody) -> Self {
        ChangeRequest {
            description: body.description,
            priority: body.priority,
            urgency: body.urgency,
            estimate: body.estimate,
            strategic: body.strategic,
            align_with_themes: body.align_with_themes,
        }
    }
}

/// POST /api/change_request - route a change to the right level.
pub async fn change_request(
    State(app): State<AppState>,
    Json(body): Json<ChangeRequestBody>,
) -> Result<Json<Value>, AppError> {
    let change = ChangeRequest::from(body);
    perform(app, Some("change_processed"), move |sim| {
        sim.handle_change_request(&change)
    })
    .await
}
