//! CallInsight CLI library.
//!
//! This crate provides the CLI interface for replaying telephony
//! notifications through the call tracking pipeline.

mod cli;
pub mod commands;
mod config;
pub mod console;

pub use cli::{Cli, Commands};
pub use config::Config;
