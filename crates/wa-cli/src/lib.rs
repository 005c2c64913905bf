//! Workflow archaeology CLI library.
//!
//! This crate provides the CLI interface over the reconstruction pipeline.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::{Config, ConnectorConfig};
