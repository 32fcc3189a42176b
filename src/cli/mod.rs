//! CLI routing and command dispatch.

use crate::constants;
use crate::core::paths;
use crate::models::config::PassgenConfig;
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub mod passgen;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub config: PassgenConfig,
}

#[derive(Parser, Debug)]
#[command(
    name = "simp-passgen",
    version,
    about = "List, show, set, and remove passwords generated by simplib::passgen"
)]
pub struct Cli {
    /// Configuration file (default: $SIMP_PASSGEN_CONFIG, then /etc/simp/passgen.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        init_logging(self.verbose);

        let config_path = paths::resolve_config_path(self.config);
        let config = paths::load_config(config_path.as_deref())?;
        tracing::debug!(config = ?config_path, "configuration loaded");

        let ctx = CliContext { config };

        if let Some(action) = self.command.root_action() {
            crate::util::privilege::require_root(action)?;
        }

        match self.command {
            Commands::ListEnvironments => passgen::run_list_environments(&ctx),
            Commands::ListNames(args) => passgen::run_list_names(&ctx, args),
            Commands::Show(args) => passgen::run_show(&ctx, args),
            Commands::Set(args) => passgen::run_set(&ctx, args),
            Commands::Remove(args) => passgen::run_remove(&ctx, args),
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env(constants::LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List puppet environments
    ListEnvironments,
    /// List password names in an environment
    ListNames(passgen::ListNamesArgs),
    /// Show current and previous values of passwords
    Show(passgen::ShowArgs),
    /// Set (or generate) passwords
    Set(passgen::SetArgs),
    /// Remove passwords and their backups
    Remove(passgen::RemoveArgs),
}

impl Commands {
    /// Name of the action when it needs root privileges.
    ///
    /// Writes to the default locations belong to the puppet service account;
    /// an explicit `--dir` is left to filesystem permissions.
    pub fn root_action(&self) -> Option<&'static str> {
        match self {
            Commands::Set(args) if args.target.dir.is_none() => Some("set"),
            Commands::Remove(args) if args.target.dir.is_none() => Some("remove"),
            _ => None,
        }
    }
}
