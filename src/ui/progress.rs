//! Install progress with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const MAX_LINE_WIDTH: usize = 60;

/// Spinner fed with installer output lines.
///
/// Nothing is drawn until the first line arrives, so a cache hit prints
/// nothing at all. In CI the lines only reach the debug log.
pub struct InstallProgress {
    bar: Option<ProgressBar>,
}

impl InstallProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
            if let Ok(style) =
                ProgressStyle::with_template("  {spinner:.cyan} Installing {prefix}  {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_prefix(label.to_string());
            bar
        });
        Self { bar }
    }

    /// Process one installer output line
    pub fn on_line(&self, line: &str) {
        let Some(ref bar) = self.bar else {
            return;
        };

        if bar.is_hidden() {
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(120));
        }

        let trimmed = line.trim();
        if !trimmed.is_empty() && !is_install_noise(trimmed) {
            bar.set_message(truncate(trimmed));
        }
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// npm lines that say nothing about progress
fn is_install_noise(line: &str) -> bool {
    line.starts_with("npm WARN")
        || line.starts_with("npm notice")
        || line.starts_with("npm warn")
        || line.starts_with("npm fund")
}

fn truncate(line: &str) -> String {
    if line.chars().count() > MAX_LINE_WIDTH {
        let cut: String = line.chars().take(MAX_LINE_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
