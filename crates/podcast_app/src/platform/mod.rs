mod app;
pub(crate) mod config;
mod confirm;
mod ui;

pub(crate) use app::{run_app, RunOutcome};
