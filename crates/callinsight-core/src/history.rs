//! Recent interaction history shown on the overlay.
//!
//! The core only defines the lookup contract. Concrete data sources (call log,
//! message store) implement [`HistorySource`] and are combined by
//! [`MergedHistory`], which degrades to partial or empty results instead of
//! failing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PhoneNumber;

/// Number of items the overlay displays.
pub const OVERLAY_ITEM_LIMIT: usize = 3;

/// Maximum number of characters of a message body kept for display.
pub const MAX_SUMMARY_CHARS: usize = 60;

/// Errors raised by a history data source.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The source is not readable with the current permissions.
    #[error("{source_name} is not accessible")]
    NotPermitted { source_name: &'static str },
    /// The underlying query failed.
    #[error("{source_name} query failed: {message}")]
    Query {
        source_name: &'static str,
        message: String,
    },
}

/// Whether an item came from the call log or the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Message,
}

/// Direction of an interaction, as shown on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    Missed,
    /// A call log entry of a type the overlay has no tag for.
    Other,
}

/// One line of overlay content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayContentItem {
    pub kind: InteractionKind,
    pub direction: Direction,
    /// The other party, as recorded by the data source.
    pub counterpart: String,
    /// Call duration or a truncated message body.
    pub summary: String,
    pub occurred_at: DateTime<Utc>,
}

impl OverlayContentItem {
    /// Builds a call log line with the duration as summary.
    #[must_use]
    pub fn call(
        direction: Direction,
        counterpart: impl Into<String>,
        duration_secs: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: InteractionKind::Call,
            direction,
            counterpart: counterpart.into(),
            summary: format!("{duration_secs}s"),
            occurred_at,
        }
    }

    /// Builds a message line, flattening and truncating the body.
    #[must_use]
    pub fn message(
        direction: Direction,
        counterpart: impl Into<String>,
        body: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: InteractionKind::Message,
            direction,
            counterpart: counterpart.into(),
            summary: summarize_body(body),
            occurred_at,
        }
    }

    /// The direction tag, e.g. `IN` or `SMS OUT`.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match (self.kind, self.direction) {
            (InteractionKind::Call, Direction::Incoming) => "IN",
            (InteractionKind::Call, Direction::Outgoing) => "OUT",
            (InteractionKind::Call, Direction::Missed) => "MISSED",
            (InteractionKind::Call, Direction::Other) => "CALL",
            (InteractionKind::Message, Direction::Incoming) => "SMS IN",
            (InteractionKind::Message, _) => "SMS OUT",
        }
    }
}

impl fmt::Display for OverlayContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            InteractionKind::Call => write!(
                f,
                "Call {} • {} • {}",
                self.tag(),
                self.counterpart,
                self.summary
            ),
            InteractionKind::Message => {
                write!(f, "{} • {} • {}", self.tag(), self.counterpart, self.summary)
            }
        }
    }
}

/// Flattens newlines and keeps at most [`MAX_SUMMARY_CHARS`] characters.
fn summarize_body(body: &str) -> String {
    body.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(MAX_SUMMARY_CHARS)
        .collect()
}

/// The lookup boundary used by the overlay.
///
/// Implementations return at most `limit` items, newest first, and an empty
/// list when nothing is available. They never fail.
pub trait HistoryLookup {
    fn lookup(&self, number: Option<&PhoneNumber>, limit: usize) -> Vec<OverlayContentItem>;
}

/// A single underlying data source, such as the call log.
pub trait HistorySource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the source may currently be read. Checked on every lookup.
    fn is_available(&self) -> bool;

    /// Returns up to `limit` recent items for `number`, newest first.
    ///
    /// With no number, returns the most recent items overall.
    fn recent(
        &self,
        number: Option<&PhoneNumber>,
        limit: usize,
    ) -> Result<Vec<OverlayContentItem>, HistoryError>;
}

/// Combines several sources into one newest-first lookup.
#[derive(Default)]
pub struct MergedHistory {
    sources: Vec<Box<dyn HistorySource>>,
}

impl MergedHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(mut self, source: impl HistorySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl HistoryLookup for MergedHistory {
    fn lookup(&self, number: Option<&PhoneNumber>, limit: usize) -> Vec<OverlayContentItem> {
        if limit == 0 {
            return Vec::new();
        }

        let mut items = Vec::new();
        for source in &self.sources {
            if !source.is_available() {
                tracing::info!(source = source.name(), "history source not permitted, skipping");
                continue;
            }
            match source.recent(number, limit) {
                Ok(found) => items.extend(found),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "history source failed");
                }
            }
        }

        // Stable sort keeps source order for equal timestamps.
        items.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        items.truncate(limit);
        items
    }
}

impl<T: HistoryLookup + ?Sized> HistoryLookup for &T {
    fn lookup(&self, number: Option<&PhoneNumber>, limit: usize) -> Vec<OverlayContentItem> {
        (**self).lookup(number, limit)
    }
}

impl<T: HistoryLookup + ?Sized> HistoryLookup for Box<T> {
    fn lookup(&self, number: Option<&PhoneNumber>, limit: usize) -> Vec<OverlayContentItem> {
        (**self).lookup(number, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap()
    }

    struct FixedSource {
        name: &'static str,
        available: bool,
        fail: bool,
        items: Vec<OverlayContentItem>,
    }

    impl FixedSource {
        fn new(name: &'static str, items: Vec<OverlayContentItem>) -> Self {
            Self {
                name,
                available: true,
                fail: false,
                items,
            }
        }
    }

    impl HistorySource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn recent(
            &self,
            _number: Option<&PhoneNumber>,
            limit: usize,
        ) -> Result<Vec<OverlayContentItem>, HistoryError> {
            if self.fail {
                return Err(HistoryError::Query {
                    source_name: self.name,
                    message: "cursor closed".to_string(),
                });
            }
            Ok(self.items.iter().take(limit).cloned().collect())
        }
    }

    fn calls() -> FixedSource {
        FixedSource::new(
            "calls",
            vec![
                OverlayContentItem::call(Direction::Incoming, "+1", 42, at(30)),
                OverlayContentItem::call(Direction::Missed, "+1", 0, at(10)),
            ],
        )
    }

    fn messages() -> FixedSource {
        FixedSource::new(
            "messages",
            vec![
                OverlayContentItem::message(Direction::Incoming, "+1", "on my way", at(20)),
                OverlayContentItem::message(Direction::Outgoing, "+1", "ok", at(5)),
            ],
        )
    }

    #[test]
    fn merges_newest_first_up_to_limit() {
        let history = MergedHistory::new().with_source(calls()).with_source(messages());
        let items = history.lookup(None, 3);

        assert_eq!(items.len(), 3);
        let times: Vec<_> = items.iter().map(|i| i.occurred_at).collect();
        assert_eq!(times, vec![at(30), at(20), at(10)]);
    }

    #[test]
    fn unavailable_source_yields_partial_result() {
        let mut denied = messages();
        denied.available = false;
        let history = MergedHistory::new().with_source(calls()).with_source(denied);

        let items = history.lookup(None, 3);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == InteractionKind::Call));
    }

    #[test]
    fn failing_source_is_skipped() {
        let mut broken = calls();
        broken.fail = true;
        let history = MergedHistory::new().with_source(broken).with_source(messages());

        let items = history.lookup(None, 3);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == InteractionKind::Message));
    }

    #[test]
    fn no_sources_or_zero_limit_is_empty() {
        assert!(MergedHistory::new().lookup(None, 3).is_empty());
        let history = MergedHistory::new().with_source(calls());
        assert!(history.lookup(None, 0).is_empty());
    }

    #[test]
    fn message_body_is_flattened_and_truncated() {
        let body = format!("line one\nline two {}", "x".repeat(100));
        let item = OverlayContentItem::message(Direction::Incoming, "+1", &body, at(0));
        assert_eq!(item.summary.chars().count(), MAX_SUMMARY_CHARS);
        assert!(item.summary.starts_with("line one line two"));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let body = "é".repeat(80);
        let item = OverlayContentItem::message(Direction::Incoming, "+1", &body, at(0));
        assert_eq!(item.summary, "é".repeat(MAX_SUMMARY_CHARS));
    }

    #[test]
    fn renders_display_lines() {
        let call = OverlayContentItem::call(Direction::Outgoing, "+15551234", 42, at(0));
        insta::assert_snapshot!(call.to_string(), @"Call OUT • +15551234 • 42s");

        let sms = OverlayContentItem::message(Direction::Incoming, "+15551234", "see you\nsoon", at(0));
        insta::assert_snapshot!(sms.to_string(), @"SMS IN • +15551234 • see you soon");

        let other = OverlayContentItem::call(Direction::Other, "+1", 3, at(0));
        assert_eq!(other.to_string(), "Call CALL • +1 • 3s");
    }
}
