//! ollama-tools - backup, restore, update and log supervision for a local
//! Ollama model store.
//!
//! The library is usable without the CLI: resolve a model to its files,
//! zip it, unzip it into another store, pull updates through the `ollama`
//! binary, and supervise detached runs through a rotated log file.
//!
//! # Example
//!
//! ```rust,no_run
//! use ollama_tools::{actions, ModelIdentifier, ModelStore};
//! use std::path::Path;
//!
//! fn main() -> ollama_tools::Result<()> {
//!     let store = ModelStore::new("/usr/share/ollama/.ollama/models");
//!     let models = vec![ModelIdentifier::parse("llama3:8b")?];
//!
//!     let report = actions::backup_models(&store, Path::new("/backups"), models, 2)?;
//!     for failure in &report.failed {
//!         eprintln!("{}: {}", failure.item, failure.reason);
//!     }
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod archive;
pub mod background;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod error;
pub mod logs;
pub mod ollama;
pub mod platform;
pub mod store;

// Re-export commonly used types
pub use background::{spawn_background, BackgroundHandle, DetachedCommand};
pub use batch::{resolve_jobs, run_batch, BatchFailure, BatchReport};
pub use cancel::CancellationToken;
pub use config::{AppConfig, StoreConfig};
pub use error::{Result, ToolError};
pub use logs::{LogManager, LogRotator, LogTailer, TailState, TickOutcome};
pub use ollama::{CommandResult, CommandRunner, OllamaCli, ProcessRunner};
pub use platform::{HostOs, PlatformProfile};
pub use store::{ModelFileSet, ModelIdentifier, ModelStore};
