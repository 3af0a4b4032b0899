//! Replay command: feeds recorded notifications through the pipeline.
//!
//! Input is JSONL, one raw notification per line:
//!
//! ```text
//! {"action": "android.intent.action.PHONE_STATE", "state": "RINGING", "number": "+15551234"}
//! ```

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use callinsight_core::{
    CallInsightService, LifecycleEvent, MergedHistory, OverlayController, RawNotification,
};
use callinsight_history::HistoryStore;

use crate::Config;
use crate::console::{ConsoleIndicator, ConsoleScreen, ConsoleSurface, Transcript};

/// Options for a replay run.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// JSON fixture used to seed the history store.
    pub history: Option<PathBuf>,
    /// Force the overlay permission off regardless of config.
    pub deny_overlay: bool,
}

/// Counts reported at the end of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub handled: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub started: usize,
    pub ended: usize,
}

/// Builds the history lookup from config and an optional fixture.
fn build_history(config: &Config, options: &ReplayOptions) -> Result<MergedHistory> {
    let store = HistoryStore::open_in_memory().context("failed to open history store")?;
    if let Some(path) = &options.history {
        store
            .load_fixture(path)
            .with_context(|| format!("failed to load history from {}", path.display()))?;
    }

    let call_log_permitted = config.call_log_permitted;
    let sms_permitted = config.sms_permitted;
    Ok(MergedHistory::new()
        .with_source(store.call_log(move || call_log_permitted))
        .with_source(store.messages(move || sms_permitted)))
}

/// Replays every notification from `input`, writing the transcript to `out`.
pub fn run<R: BufRead, W: Write>(
    input: R,
    out: W,
    config: &Config,
    options: &ReplayOptions,
) -> Result<ReplaySummary> {
    let history = build_history(config, options)?;
    let transcript = Transcript::new(out);

    let overlay_permitted = config.overlay_permitted && !options.deny_overlay;
    let overlay = OverlayController::new(
        ConsoleSurface::new(transcript.clone()),
        move || overlay_permitted,
        history,
    )
    .with_limit(config.history_limit);
    let mut service = CallInsightService::new(
        overlay,
        ConsoleScreen::new(transcript.clone()),
        ConsoleIndicator::new(transcript.clone()),
    );

    let mut summary = ReplaySummary::default();
    for (index, line) in input.lines().enumerate() {
        let line = line.context("failed to read notification")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;

        let raw: RawNotification = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed notification");
                transcript.line(format_args!("! line {line_no}: malformed notification"))?;
                summary.malformed += 1;
                continue;
            }
        };

        transcript.line(format_args!(
            "> {} {} {}",
            raw.action,
            raw.state,
            raw.number.as_deref().unwrap_or("-")
        ))?;

        match service.handle(&raw) {
            Some(handled) => {
                summary.handled += 1;
                match handled.event {
                    LifecycleEvent::Started(_) => summary.started += 1,
                    LifecycleEvent::Ended(_) => summary.ended += 1,
                    LifecycleEvent::NoOp => {}
                }
                transcript.line(format_args!("= {}: {}", handled.state, handled.event))?;
            }
            None => {
                summary.ignored += 1;
                transcript.line(format_args!("= ignored"))?;
            }
        }
    }

    service.shutdown();
    drop(service);

    transcript.line(format_args!(
        "{} handled, {} ignored, {} malformed; {} started, {} ended",
        summary.handled, summary.ignored, summary.malformed, summary.started, summary.ended
    ))?;
    Ok(summary)
}
