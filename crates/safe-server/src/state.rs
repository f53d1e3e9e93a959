use safe_core::config::SafeConfig;
use safe_core::types::{AgentRole, Tier};
use safe_core::{SafeError, Simulation, SimulationState};
use safe_llm::CompletionProvider;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Builds the provider for one agent. Replaces the configured HTTP
/// providers, mainly for tests and offline runs.
pub type ProviderFactory = Arc<dyn Fn(AgentRole) -> Box<dyn CompletionProvider> + Send + Sync>;

/// Pushed to `/api/stream` subscribers after every state change.
#[derive(Debug, Clone, Serialize)]
pub struct StateUpdate {
    pub event: &'static str,
    pub state: SimulationState,
}

/// Shared application state passed to all route handlers.
///
/// At most one simulation exists; `/api/initialize` replaces it. The mutex
/// makes ceremonies strictly sequential.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SafeConfig>,
    pub simulation: Arc<Mutex<Option<Simulation>>>,
    pub event_tx: broadcast::Sender<StateUpdate>,
    providers: Option<ProviderFactory>,
}

impl AppState {
    pub fn new(config: SafeConfig) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            config: Arc::new(config),
            simulation: Arc::new(Mutex::new(None)),
            event_tx: tx,
            providers: None,
        }
    }

    pub fn with_providers(config: SafeConfig, providers: ProviderFactory) -> Self {
        Self {
            providers: Some(providers),
            ..Self::new(config)
        }
    }

    /// Fresh simulation at `tier`, every other setting from the server config.
    pub fn build_simulation(&self, tier: Tier) -> Simulation {
        let config = SafeConfig {
            tier,
            ..(*self.config).clone()
        };
        let mut builder = Simulation::builder(config);
        if let Some(factory) = &self.providers {
            for role in AgentRole::all() {
                builder = builder.provider(*role, factory(*role));
            }
        }
        builder.build()
    }

    pub fn replace_simulation(&self, sim: Simulation) {
        *self.lock() = Some(sim);
    }

    /// Run `op` against the current simulation.
    pub fn with_simulation<T>(
        &self,
        op: impl FnOnce(&mut Simulation) -> Result<T, SafeError>,
    ) -> Result<T, SafeError> {
        let mut guard = self.lock();
        let sim = guard.as_mut().ok_or(SafeError::NotInitialized)?;
        op(sim)
    }

    pub fn current_state(&self) -> Option<SimulationState> {
        self.lock().as_ref().map(Simulation::state)
    }

    pub fn notify(&self, event: &'static str, state: SimulationState) {
        // No subscribers is fine.
        let _ = self.event_tx.send(StateUpdate { event, state });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Simulation>> {
        // Ceremonies commit only on success, so a poisoned lock is usable.
        self.simulation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
