use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::{AppState, StateUpdate};

/// GET /api/stream - SSE stream of named state updates. A new subscriber
/// first receives `simulation_state` with the current snapshot, if any.
pub async fn stream(State(app): State<AppState>) -> impl IntoResponse {
    let rx = app.event_tx.subscribe();
    let initial = tokio::task::spawn_blocking(move || app.current_state())
        .await
        .ok()
        .flatten()
        .map(|state| StateUpdate {
            event: "simulation_state",
            state,
        });

    let updates = BroadcastStream::new(rx).filter_map(|msg| msg.ok());
    let stream = tokio_stream::iter(initial)
        .chain(updates)
        .map(|update| Event::default().event(update.event).json_data(&update.state));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
