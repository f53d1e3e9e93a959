//! Core of the SAFe simulator: three LLM-backed agents walking a
//! PI → Sprint → Day state machine, with metrics and append-only logs.

pub mod agents;
pub mod backlog;
pub mod change;
pub mod classifier;
pub mod config;
pub mod error;
pub mod io;
pub mod log;
pub mod metrics;
pub mod random;
pub mod showcase;
pub mod simulation;
pub mod types;

pub use error::{Result, SafeError};
pub use simulation::{Simulation, SimulationBuilder, SimulationState};
