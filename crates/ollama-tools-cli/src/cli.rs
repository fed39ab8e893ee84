use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level parser for the `ollama-tool-cli` binary.
#[derive(Debug, Parser)]
#[command(name = "ollama-tool-cli", version, about = "Manage a local Ollama model store")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Model store root (defaults to the platform location)
    #[arg(long, global = true, env = "OLLAMA_MODELS")]
    pub models_dir: Option<PathBuf>,

    /// The ollama executable to run
    #[arg(long, global = true, env = "OLLAMA_BIN", default_value = "ollama")]
    pub ollama_bin: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all installed Ollama models
    List,

    /// Update one or all Ollama models
    Update {
        /// Model name to update (updates all models if not provided)
        model: Option<String>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Back up Ollama models to zip files
    Backup {
        /// Directory where backups are saved (default: ~/Downloads/ollama_models_backup)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Specific model to back up (backs up all models if not provided)
        #[arg(short, long)]
        model: Option<String>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Restore Ollama models from backups
    Restore {
        /// Path to a backup zip file or a directory of backup zip files
        path: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Show Ollama installation information
    Info,

    /// Show the log file location or follow logs
    Logs {
        /// Follow the log output
        #[arg(short, long)]
        follow: bool,
    },
}

/// Options shared by the batch commands.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct BatchArgs {
    /// Number of parallel jobs
    #[arg(short, long, allow_negative_numbers = true)]
    pub jobs: Option<i64>,

    /// Run the command in the background
    #[arg(short, long)]
    pub background: bool,
}

impl Commands {
    /// Whether the user asked for this command to run detached.
    pub fn background(&self) -> bool {
        match self {
            Commands::Update { batch, .. }
            | Commands::Backup { batch, .. }
            | Commands::Restore { batch, .. } => batch.background,
            Commands::List | Commands::Info | Commands::Logs { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_backup_options() {
        let cli = Cli::try_parse_from([
            "ollama-tool-cli",
            "backup",
            "-p",
            "/tmp/out",
            "-m",
            "llama3:8b",
            "-j",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Backup { path, model, batch } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/out")));
                assert_eq!(model.as_deref(), Some("llama3:8b"));
                assert_eq!(batch.jobs, Some(3));
                assert!(!batch.background);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_negative_jobs_are_accepted() {
        let cli = Cli::try_parse_from(["ollama-tool-cli", "update", "-j", "-2"]).unwrap();
        match cli.command {
            Commands::Update { model, batch } => {
                assert_eq!(model, None);
                assert_eq!(batch.jobs, Some(-2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_background_flag() {
        let cli = Cli::try_parse_from(["ollama-tool-cli", "restore", "/b", "-b"]).unwrap();
        assert!(cli.command.background());

        let cli = Cli::try_parse_from(["ollama-tool-cli", "logs", "-f"]).unwrap();
        assert!(!cli.command.background());
        assert!(matches!(cli.command, Commands::Logs { follow: true }));
    }

    #[test]
    fn test_respawned_arguments_do_not_background() {
        let stripped = ollama_tools::background::strip_background_flags([
            "ollama-tool-cli",
            "backup",
            "-bj",
            "2",
        ]);
        let cli = Cli::try_parse_from(stripped).unwrap();
        assert!(!cli.command.background());
        match cli.command {
            Commands::Backup { batch, .. } => assert_eq!(batch.jobs, Some(2)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_clustered_background_flag() {
        let cli = Cli::try_parse_from(["ollama-tool-cli", "update", "-bj", "2"]).unwrap();
        assert!(cli.command.background());
    }

    #[test]
    fn test_restore_requires_path() {
        assert!(Cli::try_parse_from(["ollama-tool-cli", "restore"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ollama-tool-cli",
            "info",
            "--debug",
            "--models-dir",
            "/srv/models",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.models_dir, Some(PathBuf::from("/srv/models")));
    }
}
