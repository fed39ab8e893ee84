//! Handlers for each subcommand. They print user-facing output to stdout
//! and return the process exit code.

use crate::cli::{BatchArgs, Commands};
use anyhow::Context as _;
use ollama_tools::platform::paths::expand_home;
use ollama_tools::{
    actions, archive, resolve_jobs, BatchReport, CancellationToken, LogManager, ModelIdentifier,
    ModelStore, OllamaCli, PlatformProfile,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

const SEPARATOR: &str = "----------------------------------------";

/// Everything a handler needs, built once in `main`.
pub struct Context {
    pub ollama: OllamaCli,
    pub profile: PlatformProfile,
    pub logs: LogManager,
}

pub fn dispatch(command: Commands, ctx: &Context) -> anyhow::Result<ExitCode> {
    match command {
        Commands::List => list(ctx),
        Commands::Update { model, batch } => update(ctx, model, batch),
        Commands::Backup { path, model, batch } => backup(ctx, path, model, batch),
        Commands::Restore { path, batch } => restore(ctx, &path, batch),
        Commands::Info => info(ctx),
        Commands::Logs { follow } => logs(ctx, follow),
    }
}

fn list(ctx: &Context) -> anyhow::Result<ExitCode> {
    let models = ctx.ollama.list_models()?;
    if models.is_empty() {
        println!("No models are installed. Use `ollama pull <model>` to install one.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("\nInstalled {} model(s):", models.len());
    println!("{SEPARATOR}");
    for model in &models {
        println!("  \u{2022} {model}");
    }
    println!("{SEPARATOR}");
    Ok(ExitCode::SUCCESS)
}

fn update(ctx: &Context, model: Option<String>, batch: BatchArgs) -> anyhow::Result<ExitCode> {
    let jobs = resolve_jobs(batch.jobs);
    let models = selected_models(ctx, model)?;
    if models.is_empty() {
        println!("No models to update.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Updating {} model(s)...\n", models.len());
    let report = actions::update_models(&ctx.ollama, models, jobs);
    Ok(finish("Update", &report, ModelIdentifier::to_string))
}

fn backup(
    ctx: &Context,
    path: Option<PathBuf>,
    model: Option<String>,
    batch: BatchArgs,
) -> anyhow::Result<ExitCode> {
    let jobs = resolve_jobs(batch.jobs);
    let backup_dir = match path {
        Some(path) => expand_home(&path),
        None => ctx.profile.default_backup_dir().to_path_buf(),
    };

    println!("Backing up models to: {}", backup_dir.display());
    let models = selected_models(ctx, model)?;
    if models.is_empty() {
        println!("No models to back up.");
        return Ok(ExitCode::SUCCESS);
    }

    let store = ModelStore::from_profile(&ctx.profile)?;
    let report = actions::backup_models(&store, &backup_dir, models, jobs)?;
    Ok(finish("Backup", &report, ModelIdentifier::to_string))
}

fn restore(ctx: &Context, path: &Path, batch: BatchArgs) -> anyhow::Result<ExitCode> {
    let path = expand_home(path);
    if !path.exists() {
        eprintln!("Error: Backup path does not exist: {}", path.display());
        return Ok(ExitCode::FAILURE);
    }

    let jobs = resolve_jobs(batch.jobs);
    let archives = archive::find_archives(&path)?;
    if path.is_dir() {
        if archives.is_empty() {
            eprintln!(
                "Error: No backup zip files found in directory: {}",
                path.display()
            );
            return Ok(ExitCode::FAILURE);
        }
        println!("Restoring {} backup(s) from: {}", archives.len(), path.display());
    } else {
        println!("Restoring models from: {}", path.display());
    }

    let store_root = ctx.profile.models_root()?;
    let report = actions::restore_archives(store_root, archives, jobs);
    Ok(finish("Restore", &report, |archive: &PathBuf| {
        archive.display().to_string()
    }))
}

fn info(ctx: &Context) -> anyhow::Result<ExitCode> {
    println!("Ollama Version: {}", ctx.ollama.version()?);
    println!("Platform: {}", ctx.profile.os());
    println!("Installed Models: {}", ctx.ollama.list_models()?.len());
    println!("Models Path: {}", ctx.profile.models_root()?.display());
    println!("Logs: {}", ctx.logs.log_dir().display());
    Ok(ExitCode::SUCCESS)
}

fn logs(ctx: &Context, follow: bool) -> anyhow::Result<ExitCode> {
    let log_file = ctx.logs.log_file();
    if !follow {
        println!("Log directory: {}", ctx.logs.log_dir().display());
        println!("Log file: {}", log_file.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("Following logs: {}", log_file.display());
    ctx.logs.ensure_dir()?;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl-C handler")?;

    ctx.logs
        .tailer()
        .follow(&token, |line| println!("{line}"))?;
    Ok(ExitCode::SUCCESS)
}

/// The named model, or every installed model.
fn selected_models(ctx: &Context, model: Option<String>) -> anyhow::Result<Vec<ModelIdentifier>> {
    match model {
        Some(model) => Ok(vec![ModelIdentifier::parse(model)?]),
        None => Ok(actions::installed_models(&ctx.ollama)?),
    }
}

/// Print the batch summary and pick the exit code.
fn finish<T>(action: &str, report: &BatchReport<T>, label: impl Fn(&T) -> String) -> ExitCode {
    if report.is_success() {
        println!("\n{action} complete.");
        return ExitCode::SUCCESS;
    }

    for failure in &report.failed {
        error!("{}: {}", label(&failure.item), failure.reason);
    }
    let failed: Vec<String> = report.failed.iter().map(|f| label(&f.item)).collect();
    println!("\n{action} completed with errors.");
    println!("Failed: {}", failed.join(", "));
    ExitCode::FAILURE
}
