//! Weekly GitHub activity digest CLI library.
//!
//! This crate wires the core pipeline to the GitHub client and the command
//! line.

mod cli;
pub mod config;
pub mod digest;
mod github;

pub use cli::Cli;
pub use config::{Config, ConfigError};
