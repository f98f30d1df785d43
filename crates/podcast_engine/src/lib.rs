//! Podcast engine: job backends and the controller runtime that executes
//! core effects against them.
mod backend;
mod controller;
mod periodic;
mod random;
mod remote;
mod simulator;
mod types;
mod wire;

pub use backend::JobBackend;
pub use controller::{ControllerError, ControllerHandle};
pub use periodic::PeriodicTask;
pub use random::{RandomSource, SeededRandom};
pub use remote::{RemoteBackend, RemoteSettings, RouteLayout, DEFAULT_API_BASE, TIMEOUT_MESSAGE};
pub use simulator::{
    stage_for_percent, SimulatedBackend, SimulatorSettings, SimulatorStats, CANCELED_MESSAGE, RUNNING_CEILING,
    SIMULATED_SOURCES_KEPT,
};
pub use types::{BackendKind, CancelAck, Job};
