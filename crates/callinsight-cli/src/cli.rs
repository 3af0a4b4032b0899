//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Call history overlay for incoming calls.
///
/// Replays telephony state notifications through the call tracking pipeline
/// and prints what the overlay, running indicator and follow-up screen do.
#[derive(Debug, Parser)]
#[command(name = "callinsight", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSONL stream of phone state notifications.
    Replay {
        /// Notifications file, one JSON object per line. Reads stdin if omitted.
        file: Option<PathBuf>,

        /// JSON fixture with call log and message history.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Behave as if the overlay permission was not granted.
        #[arg(long)]
        deny_overlay: bool,
    },

    /// Show how a raw phone state token is classified.
    Classify {
        /// The raw state token (e.g., RINGING, OFFHOOK, IDLE).
        token: String,
    },
}
