//! Cache command - inspect installed command packages

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Settings;
use crate::error::DxResult;
use crate::package::{CacheEntry, PackageCache};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, settings: &Settings) -> DxResult<()> {
    match args.action {
        CacheAction::List { format } => list(settings, format).await,
        CacheAction::Path => {
            println!("{}", settings.store_dir().display());
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct EntryView {
    name: String,
    version: String,
    path: String,
    installed: Option<String>,
}

impl From<&CacheEntry> for EntryView {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            name: entry.name.clone(),
            version: entry.version.to_string(),
            path: entry.path.display().to_string(),
            installed: entry.modified.map(|t| t.to_rfc3339()),
        }
    }
}

async fn list(settings: &Settings, format: OutputFormat) -> DxResult<()> {
    let entries = PackageCache::entries(&settings.store_dir()).await?;

    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No packages installed");
            }
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntry]) {
    println!(
        "{:<40} {:<16} {:<17}",
        style("PACKAGE").bold(),
        style("VERSION").bold(),
        style("INSTALLED").bold()
    );
    println!("{}", "-".repeat(73));

    for entry in entries {
        let installed = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:<40} {:<16} {:<17}",
            entry.name,
            entry.version.to_string(),
            installed
        );
    }

    println!();
    println!("{} package(s)", entries.len());
}

fn print_json(entries: &[CacheEntry]) -> DxResult<()> {
    let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

fn print_plain(entries: &[CacheEntry]) {
    for entry in entries {
        println!("{}@{}", entry.name, entry.version);
    }
}
