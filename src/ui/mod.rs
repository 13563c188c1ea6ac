//! Terminal output for dx itself
//!
//! Uses `cliclack` for styled log lines and `indicatif` for the install
//! spinner, with plain-text fallback in CI and when stderr is not a
//! terminal. Everything is written to stderr; stdout belongs to the
//! dispatched command.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::InstallProgress;
