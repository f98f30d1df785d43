mod cli;
mod platform;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use engine_logging::engine_info;

use cli::Cli;
use platform::config::AppConfig;
use platform::RunOutcome;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?.with_overrides(&cli);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_ron()?);
        return Ok(ExitCode::SUCCESS);
    }

    engine_logging::initialize(cli.log_to.into(), engine_logging::parse_level(&config.log_level));
    engine_info!("podcast-studio {} starting", env!("CARGO_PKG_VERSION"));

    let Some(spec) = cli.spec() else {
        anyhow::bail!("a topic is required");
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start the tokio runtime")?;
    let outcome = runtime.block_on(platform::run_app(spec, &config, !cli.no_confirm))?;

    Ok(match outcome {
        RunOutcome::Ready => ExitCode::SUCCESS,
        RunOutcome::Failed => ExitCode::FAILURE,
        RunOutcome::Rejected => ExitCode::from(2),
        RunOutcome::Canceled => ExitCode::from(130),
    })
}
