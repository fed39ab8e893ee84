//! The batch operations behind `update`, `backup` and `restore`.
//!
//! Each action runs one independent unit per model (or archive) through
//! [`run_batch`], so a single broken model only fails its own entry.
//! Backing up and restoring the same model at the same time is not
//! supported; callers run one action at a time.

use crate::archive::{archive_file_name, create_archive, restore_archive};
use crate::batch::{run_batch, BatchReport};
use crate::error::{Result, ToolError};
use crate::ollama::{CommandRunner, OllamaCli};
use crate::store::{ModelIdentifier, ModelStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Models reported by `ollama list`, skipping names that do not parse.
pub fn installed_models<R: CommandRunner>(ollama: &OllamaCli<R>) -> Result<Vec<ModelIdentifier>> {
    let models = ollama
        .list_models()?
        .into_iter()
        .filter_map(|name| match ModelIdentifier::parse(name) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping unrecognised model: {}", e);
                None
            }
        })
        .collect();
    Ok(models)
}

/// Pull every model. A non-zero `pull` exit fails that model only.
pub fn update_models<R: CommandRunner>(
    ollama: &OllamaCli<R>,
    models: Vec<ModelIdentifier>,
    jobs: usize,
) -> BatchReport<ModelIdentifier> {
    run_batch(models, jobs, |model| {
        info!("Updating model: {}", model);
        ollama.pull(model.as_str()).map(|_| ())
    })
}

/// Archive every model into `backup_dir` as `<name>-<version>.zip`.
///
/// The directory is created before any work starts; failing to create it
/// fails the whole action.
pub fn backup_models(
    store: &ModelStore,
    backup_dir: &Path,
    models: Vec<ModelIdentifier>,
    jobs: usize,
) -> Result<BatchReport<ModelIdentifier>> {
    fs::create_dir_all(backup_dir).map_err(|e| ToolError::io_with_path(e, backup_dir))?;

    Ok(run_batch(models, jobs, |model| {
        info!("Backing up model: {}", model);
        let files = store.resolve(model)?;
        create_archive(&files, &backup_dir.join(archive_file_name(model)))
    }))
}

/// Extract every archive into `store_root`.
pub fn restore_archives(
    store_root: &Path,
    archives: Vec<PathBuf>,
    jobs: usize,
) -> BatchReport<PathBuf> {
    run_batch(archives, jobs, |archive| {
        info!("Restoring {}", archive.display());
        restore_archive(archive, store_root).map(|_| ())
    })
}
