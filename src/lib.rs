//! dx - package-backed command dispatcher
//!
//! Commands are not built in. Each one names a package in an npm-compatible
//! registry; dx resolves a version, installs it into a local cache keyed by
//! name and version, and runs its entry point in a child process.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod package;
pub mod privilege;
mod process;
pub mod registry;
pub mod ui;
pub mod update;

pub use error::{DxError, DxResult};
