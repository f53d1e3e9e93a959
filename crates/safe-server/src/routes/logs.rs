use axum::extract::{Query, State};
use axum::Json;
use safe_core::SafeError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::markdown;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/state - current simulation snapshot.
pub async fn get_state(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    let state = tokio::task::spawn_blocking(move || {
        app.current_state().ok_or(SafeError::NotInitialized)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(json!({ "data": state })))
}

/// GET /api/events?limit=N - most recent events, oldest first.
pub async fn get_events(
    State(app): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Value>, AppError> {
    let events = tokio::task::spawn_blocking(move || {
        app.with_simulation(|sim| Ok(sim.events(q.limit).to_vec()))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(json!({ "data": events })))
}

/// GET /api/communications?limit=N - most recent messages, with rendered HTML.
pub async fn get_communications(
    State(app): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Value>, AppError> {
    let communications = tokio::task::spawn_blocking(move || {
        app.with_simulation(|sim| Ok(sim.communications(q.limit).to_vec()))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let mut data = serde_json::to_value(communications)?;
    markdown::decorate(&mut data);
    Ok(Json(json!({ "data": data })))
}

/// GET /api/health
pub async fn health(State(app): State<AppState>) -> Result<Json<Value>, AppError> {
    let initialized = tokio::task::spawn_blocking(move || app.current_state().is_some())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;
    Ok(Json(json!({ "status": "ok", "initialized": initialized })))
}
