pub mod embed;
pub mod error;
pub mod markdown;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use safe_core::config::SafeConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
pub fn build_router(config: SafeConfig) -> Router {
    build_router_with(state::AppState::new(config))
}

/// Same as [`build_router`] on a prepared state; integration tests pass a
/// state with scripted providers.
pub fn build_router_with(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Push updates (SSE)
        .route("/api/stream", get(routes::events::stream))
        // Read-only
        .route("/api/health", get(routes::logs::health))
        .route("/api/state", get(routes::logs::get_state))
        .route("/api/events", get(routes::logs::get_events))
        .route("/api/communications", get(routes::logs::get_communications))
        // Lifecycle
        .route("/api/initialize", post(routes::simulation::initialize))
        .route("/api/start_pi", post(routes::simulation::start_pi))
        .route("/api/start_sprint", post(routes::simulation::start_sprint))
        .route("/api/daily_standup", post(routes::simulation::daily_standup))
        .route("/api/end_sprint", post(routes::simulation::end_sprint))
        .route("/api/end_pi", post(routes::simulation::end_pi))
        .route("/api/change_request", post(routes::simulation::change_request))
        // Agents
        .route(
            "/api/technical_guidance",
            post(routes::agents::technical_guidance),
        )
        .route("/api/estimate", post(routes::agents::estimate))
        .route("/api/start_work", post(routes::agents::start_work))
        .route("/api/align_strategy", post(routes::agents::align_strategy))
        .route("/api/solution_train", post(routes::agents::solution_train))
        .route("/api/ask_agent", post(routes::agents::ask_agent))
        .route(
            "/api/chain_of_thought",
            post(routes::agents::chain_of_thought),
        )
        .route(
            "/api/demonstrate_config",
            post(routes::agents::demonstrate_config),
        )
        .fallback(embed::static_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the simulation dashboard server.
pub async fn serve(config: SafeConfig, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let app = build_router(config);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("SAFe simulation server listening on http://localhost:{port}");

    if open_browser {
        let url = format!("http://localhost:{port}");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
