//! CLI command implementations

pub mod cache;
pub mod config;
pub mod exec;

pub use cache::execute as cache;
pub use config::execute as config;
pub use exec::execute as exec;
