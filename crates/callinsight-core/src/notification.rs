//! Inbound telephony notifications and action-token normalization.

use serde::{Deserialize, Serialize};

use crate::state::{CallState, classify};
use crate::types::PhoneNumber;

/// Action spellings that all mean "the phone state changed".
///
/// Older releases broadcast the intent action, newer ones the telephony
/// action; test harnesses and bridges often send the short forms.
const PHONE_STATE_ACTIONS: &[&str] = &[
    "android.intent.action.PHONE_STATE",
    "android.telephony.action.PHONE_STATE_CHANGED",
    "PHONE_STATE",
    "PHONE_STATE_CHANGED",
];

/// Canonical internal action after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    PhoneStateChanged,
}

impl NotificationAction {
    /// Normalizes a raw action token. Returns `None` for unrelated actions.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        PHONE_STATE_ACTIONS
            .contains(&raw)
            .then_some(Self::PhoneStateChanged)
    }
}

/// A notification as delivered by the OS, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNotification {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

impl RawNotification {
    pub fn new(action: impl Into<String>, state: impl Into<String>, number: Option<&str>) -> Self {
        Self {
            action: action.into(),
            state: state.into(),
            number: number.map(String::from),
        }
    }
}

/// A notification that passed action filtering and has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneStateChange {
    pub state: CallState,
    pub number: Option<PhoneNumber>,
}

impl PhoneStateChange {
    /// Interprets a raw notification, or returns `None` if its action is not
    /// a phone-state change.
    #[must_use]
    pub fn from_raw(raw: &RawNotification) -> Option<Self> {
        NotificationAction::normalize(&raw.action)?;
        Some(Self {
            state: classify(&raw.state),
            number: PhoneNumber::parse_optional(raw.number.as_deref()),
        })
    }
}
