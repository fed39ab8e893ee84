//! ollama-tool-cli - back up, restore and update local Ollama models.
//!
//! Diagnostics go to stderr through `tracing`; command output goes to
//! stdout. A command started with `--background` re-spawns itself detached
//! and its child writes both streams to the managed log file.

mod cli;
mod commands;

use clap::Parser;
use ollama_tools::background::is_background_child;
use ollama_tools::{spawn_background, LogManager, OllamaCli, PlatformProfile, ProcessRunner};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    init_tracing(cli.debug)?;

    let ollama = OllamaCli::new(ProcessRunner::new(&cli.ollama_bin));
    if !ollama.is_available() {
        eprintln!("Error: Ollama is not installed. Please install Ollama before using this tool.");
        return Ok(ExitCode::FAILURE);
    }

    let mut profile = PlatformProfile::detect()?;
    if let Some(root) = &cli.models_dir {
        profile = profile.with_models_root(root);
    }
    let logs = LogManager::new(&profile);
    debug!("Log file: {}", logs.log_file().display());

    if cli.command.background() && is_background_child() {
        warn!("Already running detached; ignoring the background flag");
    } else if cli.command.background() {
        let handle = spawn_background(&logs)?;
        println!("Running in background. PID: {}", handle.pid);
        println!("View logs with: ollama-tool-cli logs --follow");
        println!("Logs: {}", handle.log_file.display());
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = commands::Context {
        ollama,
        profile,
        logs,
    };
    commands::dispatch(cli.command, &ctx)
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
