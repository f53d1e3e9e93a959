pub mod agents;
pub mod events;
pub mod logs;
pub mod simulation;

use axum::Json;
use safe_core::{SafeError, Simulation};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::markdown;
use crate::state::AppState;

/// Run `op` against the simulation on the blocking pool and answer with
/// `{data, state}`. When `event` is set, subscribers get the new state.
pub(crate) async fn perform<T, F>(
    app: AppState,
    event: Option<&'static str>,
    op: F,
) -> Result<Json<Value>, AppError>
where
    T: Serialize + Send + 'static,
    F: FnOnce(&mut Simulation) -> Result<T, SafeError> + Send + 'static,
{
    let shared = app.clone();
    let (mut data, state) = tokio::task::spawn_blocking(move || {
        shared.with_simulation(|sim| {
            let data = op(sim)?;
            Ok::<_, SafeError>((serde_json::to_value(data)?, sim.state()))
        })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    markdown::decorate(&mut data);
    if let Some(event) = event {
        app.notify(event, state.clone());
    }
    Ok(Json(serde_json::json!({ "data": data, "state": state })))
}
