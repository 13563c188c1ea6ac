//! dx - package-backed command dispatcher
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use dx::cli::commands::exec::ExecFlags;
use dx::cli::{Cli, Commands};
use dx::config::{ConfigManager, Overrides, Settings};
use dx::error::{DxError, DxResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> DxResult<()> {
    let invoker = dx::privilege::drop_root()?;
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Config: {}", config_manager.path().display());
    if let Some(invoker) = &invoker {
        debug!("Started through sudo, running as uid {}", invoker.uid);
    }

    if let Commands::Config(args) = cli.command {
        return dx::cli::commands::config(args, &config, &config_manager).await;
    }

    let cwd = std::env::current_dir().map_err(|e| DxError::io("getting current directory", e))?;
    let overrides = Overrides {
        home: cli.home,
        target_path: cli.target_path,
        registry: cli.registry,
    };
    let settings = Settings::resolve(&config, &overrides, &cwd)?;
    debug!("Cache root: {}", settings.home.display());

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Cache(args) => dx::cli::commands::cache(args, &settings).await,
        Commands::External(argv) => {
            let flags = ExecFlags {
                no_update: cli.no_update,
                skip_update_check: cli.skip_update_check,
            };
            dx::cli::commands::exec(argv, &config, &settings, flags).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; always on stderr
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("dx=warn"),
        1 => EnvFilter::new("dx=info"),
        _ => EnvFilter::new("dx=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
