//! CLI subcommand implementations.

pub mod classify;
pub mod replay;
