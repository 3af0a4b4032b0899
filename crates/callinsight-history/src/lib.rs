//! Call log and message store for CallInsight.
//!
//! Provides the data behind the overlay's history lines using an in-memory
//! `rusqlite` connection. Nothing is written to disk: the store lives exactly
//! as long as the process.
//!
//! # Thread Safety
//!
//! The connection is shared between the store and its sources through an
//! `Rc`, so none of these types are `Send`. The notification pipeline is
//! single-threaded and they are only used from it.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC format with a fixed
//! nanosecond fraction (e.g. `2024-01-15T10:30:00.000000000Z`) so
//! lexicographic ordering matches chronological ordering. Numbers are stored exactly as reported by the
//! telephony stack and matched by equality.

use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use callinsight_core::{Direction, HistoryError, HistorySource, OverlayContentItem, PhoneNumber};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to read a fixture file.
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    /// A fixture file was not valid JSON.
    #[error("invalid fixture: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in {table}: {timestamp}")]
    TimestampParse {
        table: &'static str,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored kind column held an unexpected value.
    #[error("invalid {field}: {value}")]
    InvalidKind { field: &'static str, value: String },
}

/// Call log entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Incoming,
    Outgoing,
    Missed,
    Rejected,
    Voicemail,
}

impl CallKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Missed => "missed",
            Self::Rejected => "rejected",
            Self::Voicemail => "voicemail",
        }
    }

    const fn direction(self) -> Direction {
        match self {
            Self::Incoming => Direction::Incoming,
            Self::Outgoing => Direction::Outgoing,
            Self::Missed => Direction::Missed,
            Self::Rejected | Self::Voicemail => Direction::Other,
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            "missed" => Ok(Self::Missed),
            "rejected" => Ok(Self::Rejected),
            "voicemail" => Ok(Self::Voicemail),
            _ => Err(StoreError::InvalidKind {
                field: "call kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Message box a stored message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Inbox,
    Sent,
    Outbox,
    Draft,
}

impl MessageKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Outbox => "outbox",
            Self::Draft => "draft",
        }
    }

    /// Only received messages count as incoming; everything else is ours.
    const fn direction(self) -> Direction {
        match self {
            Self::Inbox => Direction::Incoming,
            Self::Sent | Self::Outbox | Self::Draft => Direction::Outgoing,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Self::Inbox),
            "sent" => Ok(Self::Sent),
            "outbox" => Ok(Self::Outbox),
            "draft" => Ok(Self::Draft),
            _ => Err(StoreError::InvalidKind {
                field: "message kind",
                value: s.to_string(),
            }),
        }
    }
}

/// A call log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub number: String,
    pub kind: CallKind,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: i64,
}

impl From<CallRecord> for OverlayContentItem {
    fn from(record: CallRecord) -> Self {
        Self::call(
            record.kind.direction(),
            record.number,
            record.duration_secs,
            record.occurred_at,
        )
    }
}

/// A message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub address: String,
    pub kind: MessageKind,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub body: String,
}

impl From<MessageRecord> for OverlayContentItem {
    fn from(record: MessageRecord) -> Self {
        Self::message(
            record.kind.direction(),
            record.address,
            &record.body,
            record.occurred_at,
        )
    }
}

/// Seed data for a store, as read from a JSON fixture file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFixture {
    #[serde(default)]
    pub calls: Vec<CallRecord>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

/// In-memory call log and message store.
pub struct HistoryStore {
    conn: Rc<Connection>,
}

impl HistoryStore {
    /// Opens an empty in-memory store.
    ///
    /// The schema is initialized immediately; the data is destroyed when the
    /// last handle to the connection is dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Rc::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            -- Call log: one row per call, newest rows have the largest occurred_at
            CREATE TABLE IF NOT EXISTS calls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number TEXT NOT NULL,
                kind TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                duration_secs INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_calls_number ON calls(number, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_calls_occurred ON calls(occurred_at);

            -- Messages: address is the counterpart's number
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                kind TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                body TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_messages_address ON messages(address, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_messages_occurred ON messages(occurred_at);
            ",
        )?;
        Ok(())
    }

    /// Records a call.
    pub fn insert_call(&self, call: &CallRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO calls (number, kind, occurred_at, duration_secs) VALUES (?, ?, ?, ?)",
            params![
                call.number,
                call.kind.as_str(),
                format_timestamp(call.occurred_at),
                call.duration_secs,
            ],
        )?;
        Ok(())
    }

    /// Records a message.
    pub fn insert_message(&self, message: &MessageRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO messages (address, kind, occurred_at, body) VALUES (?, ?, ?, ?)",
            params![
                message.address,
                message.kind.as_str(),
                format_timestamp(message.occurred_at),
                message.body,
            ],
        )?;
        Ok(())
    }

    /// Inserts every row of a fixture in one transaction.
    pub fn seed(&self, fixture: &HistoryFixture) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        for call in &fixture.calls {
            self.insert_call(call)?;
        }
        for message in &fixture.messages {
            self.insert_message(message)?;
        }
        tx.commit()?;
        tracing::debug!(
            calls = fixture.calls.len(),
            messages = fixture.messages.len(),
            "seeded history store"
        );
        Ok(())
    }

    /// Reads a JSON fixture file and seeds the store with it.
    pub fn load_fixture(&self, path: &Path) -> Result<(), StoreError> {
        let content = std::fs::read_to_string(path)?;
        let fixture: HistoryFixture = serde_json::from_str(&content)?;
        self.seed(&fixture)
    }

    /// Most recent calls with `number` (all calls when `None`), newest first.
    pub fn calls_for(
        &self,
        number: Option<&PhoneNumber>,
        limit: usize,
    ) -> Result<Vec<CallRecord>, StoreError> {
        query_calls(&self.conn, number, limit)
    }

    /// Most recent messages with `number` (all messages when `None`), newest first.
    pub fn messages_for(
        &self,
        number: Option<&PhoneNumber>,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        query_messages(&self.conn, number, limit)
    }

    /// The call log as a history source, readable while `permission` holds.
    pub fn call_log(&self, permission: impl Fn() -> bool + 'static) -> CallLogSource {
        CallLogSource {
            conn: Rc::clone(&self.conn),
            permission: Box::new(permission),
        }
    }

    /// The message store as a history source, readable while `permission` holds.
    pub fn messages(&self, permission: impl Fn() -> bool + 'static) -> MessageSource {
        MessageSource {
            conn: Rc::clone(&self.conn),
            permission: Box::new(permission),
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(table: &'static str, raw: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| StoreError::TimestampParse {
            table,
            timestamp: raw,
            source,
        })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn query_calls(
    conn: &Connection,
    number: Option<&PhoneNumber>,
    limit: usize,
) -> Result<Vec<CallRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "
        SELECT number, kind, occurred_at, duration_secs
        FROM calls
        WHERE (?1 IS NULL OR number = ?1)
        ORDER BY occurred_at DESC, id DESC
        LIMIT ?2
        ",
    )?;
    let rows = stmt.query_map(
        params![number.map(PhoneNumber::as_str), sql_limit(limit)],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    let mut calls = Vec::new();
    for row in rows {
        let (number, kind, occurred_at, duration_secs) = row?;
        calls.push(CallRecord {
            number,
            kind: kind.parse()?,
            occurred_at: parse_timestamp("calls", occurred_at)?,
            duration_secs,
        });
    }
    Ok(calls)
}

fn query_messages(
    conn: &Connection,
    number: Option<&PhoneNumber>,
    limit: usize,
) -> Result<Vec<MessageRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "
        SELECT address, kind, occurred_at, body
        FROM messages
        WHERE (?1 IS NULL OR address = ?1)
        ORDER BY occurred_at DESC, id DESC
        LIMIT ?2
        ",
    )?;
    let rows = stmt.query_map(
        params![number.map(PhoneNumber::as_str), sql_limit(limit)],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    )?;

    let mut messages = Vec::new();
    for row in rows {
        let (address, kind, occurred_at, body) = row?;
        messages.push(MessageRecord {
            address,
            kind: kind.parse()?,
            occurred_at: parse_timestamp("messages", occurred_at)?,
            body,
        });
    }
    Ok(messages)
}

/// The call log, gated by the call-log read permission.
pub struct CallLogSource {
    conn: Rc<Connection>,
    permission: Box<dyn Fn() -> bool>,
}

impl HistorySource for CallLogSource {
    fn name(&self) -> &'static str {
        "call log"
    }

    fn is_available(&self) -> bool {
        (self.permission)()
    }

    fn recent(
        &self,
        number: Option<&PhoneNumber>,
        limit: usize,
    ) -> Result<Vec<OverlayContentItem>, HistoryError> {
        if !self.is_available() {
            return Err(HistoryError::NotPermitted {
                source_name: self.name(),
            });
        }
        let calls = query_calls(&self.conn, number, limit).map_err(|e| HistoryError::Query {
            source_name: self.name(),
            message: e.to_string(),
        })?;
        Ok(calls.into_iter().map(OverlayContentItem::from).collect())
    }
}

/// The message store, gated by the message read permission.
pub struct MessageSource {
    conn: Rc<Connection>,
    permission: Box<dyn Fn() -> bool>,
}

impl HistorySource for MessageSource {
    fn name(&self) -> &'static str {
        "messages"
    }

    fn is_available(&self) -> bool {
        (self.permission)()
    }

    fn recent(
        &self,
        number: Option<&PhoneNumber>,
        limit: usize,
    ) -> Result<Vec<OverlayContentItem>, HistoryError> {
        if !self.is_available() {
            return Err(HistoryError::NotPermitted {
                source_name: self.name(),
            });
        }
        let messages =
            query_messages(&self.conn, number, limit).map_err(|e| HistoryError::Query {
                source_name: self.name(),
                message: e.to_string(),
            })?;
        Ok(messages.into_iter().map(OverlayContentItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use callinsight_core::{HistoryLookup, InteractionKind, MergedHistory};
    use chrono::TimeZone;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, minute, 0).unwrap()
    }

    fn number(s: &str) -> PhoneNumber {
        PhoneNumber::new(s).unwrap()
    }

    fn call(number: &str, kind: CallKind, minute: u32, duration_secs: i64) -> CallRecord {
        CallRecord {
            number: number.to_string(),
            kind,
            occurred_at: at(minute),
            duration_secs,
        }
    }

    fn message(address: &str, kind: MessageKind, minute: u32, body: &str) -> MessageRecord {
        MessageRecord {
            address: address.to_string(),
            kind,
            occurred_at: at(minute),
            body: body.to_string(),
        }
    }

    fn seeded() -> HistoryStore {
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .seed(&HistoryFixture {
                calls: vec![
                    call("+15551234", CallKind::Incoming, 10, 42),
                    call("+15551234", CallKind::Missed, 30, 0),
                    call("+15559999", CallKind::Outgoing, 40, 7),
                    call("+15551234", CallKind::Outgoing, 50, 120),
                ],
                messages: vec![
                    message("+15551234", MessageKind::Inbox, 20, "running late"),
                    message("+15551234", MessageKind::Sent, 45, "no worries\nsee you"),
                    message("+15559999", MessageKind::Inbox, 55, "hi"),
                ],
            })
            .unwrap();
        store
    }

    #[test]
    fn calls_for_number_newest_first() {
        let store = seeded();
        let calls = store.calls_for(Some(&number("+15551234")), 10).unwrap();

        let minutes: Vec<_> = calls.iter().map(|c| c.occurred_at).collect();
        assert_eq!(minutes, vec![at(50), at(30), at(10)]);
        assert!(calls.iter().all(|c| c.number == "+15551234"));
    }

    #[test]
    fn calls_without_number_returns_all() {
        let store = seeded();
        let calls = store.calls_for(None, 2).unwrap();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].number, "+15551234");
        assert_eq!(calls[1].number, "+15559999");
    }

    #[test]
    fn messages_respect_limit() {
        let store = seeded();
        let messages = store.messages_for(Some(&number("+15551234")), 1).unwrap();

        assert_eq!(messages, vec![message("+15551234", MessageKind::Sent, 45, "no worries\nsee you")]);
    }

    #[test]
    fn merged_lookup_interleaves_sources() {
        let store = seeded();
        let history = MergedHistory::new()
            .with_source(store.call_log(|| true))
            .with_source(store.messages(|| true));

        let lines: Vec<String> = history
            .lookup(Some(&number("+15551234")), 3)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            lines,
            vec![
                "Call OUT • +15551234 • 120s",
                "SMS OUT • +15551234 • no worries see you",
                "Call MISSED • +15551234 • 0s",
            ]
        );
    }

    #[test]
    fn sub_second_order_is_preserved() {
        let base = at(0);
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .seed(&HistoryFixture {
                calls: vec![CallRecord {
                    number: "+1".to_string(),
                    kind: CallKind::Incoming,
                    occurred_at: base + chrono::Duration::milliseconds(100),
                    duration_secs: 5,
                }],
                messages: vec![MessageRecord {
                    address: "+1".to_string(),
                    kind: MessageKind::Inbox,
                    occurred_at: base + chrono::Duration::milliseconds(900),
                    body: "newer".to_string(),
                }],
            })
            .unwrap();
        let history = MergedHistory::new()
            .with_source(store.call_log(|| true))
            .with_source(store.messages(|| true));

        let items = history.lookup(Some(&number("+1")), 3);

        assert_eq!(items[0].kind, InteractionKind::Message);
        assert_eq!(items[0].occurred_at, base + chrono::Duration::milliseconds(900));
        assert_eq!(items[1].occurred_at, base + chrono::Duration::milliseconds(100));
    }

    #[test]
    fn denied_source_is_skipped() {
        let store = seeded();
        let history = MergedHistory::new()
            .with_source(store.call_log(|| false))
            .with_source(store.messages(|| true));

        let items = history.lookup(Some(&number("+15551234")), 3);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == InteractionKind::Message));
    }

    #[test]
    fn permission_is_checked_on_each_lookup() {
        let store = seeded();
        let granted = Rc::new(Cell::new(true));
        let flag = Rc::clone(&granted);
        let source = store.call_log(move || flag.get());

        assert!(source.recent(None, 3).is_ok());
        granted.set(false);
        assert!(matches!(
            source.recent(None, 3),
            Err(HistoryError::NotPermitted { .. })
        ));
    }

    #[test]
    fn unknown_number_yields_empty() {
        let store = seeded();
        let history = MergedHistory::new()
            .with_source(store.call_log(|| true))
            .with_source(store.messages(|| true));

        assert!(history.lookup(Some(&number("+10000000")), 3).is_empty());
    }

    #[test]
    fn rejected_and_voicemail_calls_use_generic_tag() {
        let item = OverlayContentItem::from(call("+1", CallKind::Voicemail, 0, 12));
        assert_eq!(item.to_string(), "Call CALL • +1 • 12s");
    }

    #[test]
    fn draft_messages_render_as_outgoing() {
        let item = OverlayContentItem::from(message("+1", MessageKind::Draft, 0, "unsent"));
        assert_eq!(item.to_string(), "SMS OUT • +1 • unsent");
    }

    #[test]
    fn load_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "calls": [
                    {{"number": "+15551234", "kind": "incoming", "occurred_at": "2025-01-01T09:00:00Z", "duration_secs": 5}}
                ],
                "messages": [
                    {{"address": "+15551234", "kind": "inbox", "occurred_at": "2025-01-01T09:01:00Z", "body": "hey"}}
                ]
            }}"#
        )
        .unwrap();

        let store = HistoryStore::open_in_memory().unwrap();
        store.load_fixture(file.path()).unwrap();

        assert_eq!(store.calls_for(None, 10).unwrap().len(), 1);
        assert_eq!(store.messages_for(None, 10).unwrap()[0].body, "hey");
    }

    #[test]
    fn load_fixture_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let store = HistoryStore::open_in_memory().unwrap();
        let err = store.load_fixture(file.path()).unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn kind_roundtrip_through_strings() {
        for kind in [
            CallKind::Incoming,
            CallKind::Outgoing,
            CallKind::Missed,
            CallKind::Rejected,
            CallKind::Voicemail,
        ] {
            assert_eq!(kind.as_str().parse::<CallKind>().unwrap(), kind);
        }
        assert!("busy".parse::<CallKind>().is_err());
        assert!("spam".parse::<MessageKind>().is_err());
    }
}
