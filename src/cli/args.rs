//! CLI argument definitions using clap derive

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dx - run versioned registry packages as commands
///
/// Any subcommand that is not built in is looked up under [commands] in
/// the config, installed from the registry if needed, and run with the
/// remaining arguments.
#[derive(Parser, Debug)]
#[command(name = "dx")]
#[command(author, version, about, long_about = None)]
#[command(allow_external_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root (default: ~/.dx-cli)
    #[arg(long, global = true, env = "DX_HOME")]
    pub home: Option<PathBuf>,

    /// Run the package found at this path instead of the cache
    #[arg(long, global = true, env = "DX_TARGET_PATH")]
    pub target_path: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, global = true, env = "DX_REGISTRY")]
    pub registry: Option<String>,

    /// Use the cached package version without checking for a newer one
    #[arg(long, global = true)]
    pub no_update: bool,

    /// Skip the check for a newer dx release
    #[arg(long, global = true, env = "DX_SKIP_UPDATE_CHECK", value_parser = FalseyValueParser::new())]
    pub skip_update_check: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect installed command packages
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Package-backed command (e.g. `dx init my-app`)
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List installed packages, newest version first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the store directory
    Path,
}
