//! State token classification command.

use std::io::Write;

use anyhow::Result;

use callinsight_core::{CallState, classify};

/// Prints the call state a raw token maps to.
pub fn run<W: Write>(token: &str, mut out: W) -> Result<CallState> {
    let state = classify(token);
    if state == CallState::Unknown {
        tracing::debug!(token, "token not in any state table");
    }
    writeln!(out, "{state}")?;
    Ok(state)
}
