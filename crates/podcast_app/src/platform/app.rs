use std::sync::Arc;

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use podcast_core::{AppViewModel, GenerateSpec, Phase};
use podcast_engine::{
    ControllerError, ControllerHandle, JobBackend, RemoteBackend, SimulatedBackend,
    SimulatorSettings,
};

use super::config::AppConfig;
use super::confirm;
use super::ui::render::Renderer;

/// How a run ended, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Ready,
    Failed,
    Rejected,
    Canceled,
}

pub(crate) fn build_backend(config: &AppConfig) -> Result<Arc<dyn JobBackend>> {
    if config.use_mock {
        engine_info!("Using the simulated backend");
        return Ok(Arc::new(SimulatedBackend::new(SimulatorSettings::default())));
    }
    let settings = config.remote_settings()?;
    engine_info!("Using the generation service at {}", settings.base_url);
    let backend = RemoteBackend::new(settings).context("failed to build HTTP client")?;
    Ok(Arc::new(backend))
}

/// Submits `spec`, renders progress until the job settles, and offers the
/// cancel prompt on Ctrl-C.
pub(crate) async fn run_app(
    spec: GenerateSpec,
    config: &AppConfig,
    confirm_cancel: bool,
) -> Result<RunOutcome> {
    let backend = build_backend(config)?;
    let controller = ControllerHandle::spawn(backend, config.poll_settings());
    let mut renderer = Renderer::default();
    let mut views = controller.subscribe();

    println!(
        "Generating a {}-minute {} episode about {:?} ({} backend)",
        spec.length.minutes(),
        spec.tone,
        spec.topic.trim(),
        controller.backend_kind()
    );

    match controller.submit(spec) {
        Ok(()) => {}
        Err(ControllerError::Rejected(err)) => {
            eprintln!("Cannot submit: {err}");
            controller.shutdown().await;
            return Ok(RunOutcome::Rejected);
        }
        Err(err) => return Err(err).context("failed to submit"),
    }

    let outcome = loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break RunOutcome::Failed;
                }
                let view = views.borrow_and_update().clone();
                print_frame(&mut renderer, &view);
                match view.phase {
                    Phase::Success => break RunOutcome::Ready,
                    Phase::Error => break RunOutcome::Failed,
                    Phase::Idle | Phase::Running => {}
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                if handle_interrupt(&controller, confirm_cancel).await? {
                    break RunOutcome::Canceled;
                }
            }
        }
    };

    if outcome == RunOutcome::Canceled {
        println!("Canceled.");
    }
    controller.shutdown().await;
    Ok(outcome)
}

/// Runs the cancel gate. Returns whether the job was canceled.
async fn handle_interrupt(controller: &ControllerHandle, confirm_cancel: bool) -> Result<bool> {
    controller.request_cancel()?;
    let confirmed = if confirm_cancel {
        confirm::ask_cancel().await.unwrap_or_else(|err| {
            engine_warn!("Could not read the cancel answer: {}", err);
            false
        })
    } else {
        true
    };

    if confirmed {
        controller.confirm_cancel()?;
        controller
            .wait_for(|view| view.phase == Phase::Idle)
            .await?;
        engine_info!("Generation canceled by user");
    } else {
        controller.dismiss_cancel()?;
        println!("Continuing.");
    }
    Ok(confirmed)
}

fn print_frame(renderer: &mut Renderer, view: &AppViewModel) {
    for line in renderer.frame(view) {
        println!("{line}");
    }
}
