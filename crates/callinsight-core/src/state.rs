//! Classification of raw telephony state tokens.
//!
//! Vendors and OS releases disagree on how the current call state is spelled.
//! The known spellings live in the tables below; adding a new variant is a
//! one-line data change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic call state derived from a raw OS token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// The phone is ringing for an incoming call.
    Ringing,
    /// A call is off-hook (answered or dialing).
    Active,
    /// No call in progress.
    #[default]
    Idle,
    /// The token was not recognized.
    Unknown,
}

const RINGING_TOKENS: &[&str] = &["RINGING", "CALL_STATE_RINGING", "1"];
const ACTIVE_TOKENS: &[&str] = &["OFFHOOK", "OFF_HOOK", "CALL_STATE_OFFHOOK", "2"];
const IDLE_TOKENS: &[&str] = &["IDLE", "CALL_STATE_IDLE", "0"];

const TOKEN_TABLE: &[(CallState, &[&str])] = &[
    (CallState::Ringing, RINGING_TOKENS),
    (CallState::Active, ACTIVE_TOKENS),
    (CallState::Idle, IDLE_TOKENS),
];

impl CallState {
    /// Returns the lowercase name used in logs and transcripts.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw state token to a [`CallState`].
///
/// Matching ignores surrounding whitespace and ASCII case. Unrecognized and
/// empty tokens classify as [`CallState::Unknown`].
#[must_use]
pub fn classify(raw_token: &str) -> CallState {
    let token = raw_token.trim();
    if token.is_empty() {
        return CallState::Unknown;
    }

    TOKEN_TABLE
        .iter()
        .find(|(_, spellings)| spellings.iter().any(|s| s.eq_ignore_ascii_case(token)))
        .map_or(CallState::Unknown, |(state, _)| *state)
}
