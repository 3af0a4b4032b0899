//! Call lifecycle tracking.
//!
//! Telephony notifications are noisy: ringing can be reported more than once,
//! idle arrives both at the end of a call and as a heartbeat, and the number
//! is frequently missing. [`observe`] folds one classified state into a
//! [`CallSession`] and reports the lifecycle edge it represents, if any.
//!
//! The session is a plain value owned by the caller and threaded through each
//! call, so there is exactly one session per pipeline and no hidden global.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::CallState;
use crate::types::PhoneNumber;

/// Tracked state for the (single) call lifecycle in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallSession {
    /// The state observed on the previous notification. `Idle` at start.
    pub previous_state: CallState,
    /// True once an `Active` state has been seen since the last `Idle`.
    pub was_active: bool,
    /// Best number known for the current call, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_number: Option<PhoneNumber>,
}

/// A meaningful transition derived from one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "number", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A new call started ringing.
    Started(Option<PhoneNumber>),
    /// A call that was picked up has ended.
    Ended(Option<PhoneNumber>),
    /// Nothing lifecycle-relevant happened.
    NoOp,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, number) = match self {
            Self::Started(number) => ("started", number),
            Self::Ended(number) => ("ended", number),
            Self::NoOp => return f.write_str("no-op"),
        };
        match number {
            Some(number) => write!(f, "{label} {number}"),
            None => f.write_str(label),
        }
    }
}

/// Folds one observed state into the session.
///
/// Returns the lifecycle event for this transition and the updated session.
/// Never fails: unexpected sequences produce [`LifecycleEvent::NoOp`].
#[must_use]
pub fn observe(
    session: CallSession,
    state: CallState,
    number: Option<PhoneNumber>,
) -> (LifecycleEvent, CallSession) {
    let mut session = session;
    let event = session.observe(state, number);
    (event, session)
}

impl CallSession {
    /// In-place form of [`observe`].
    pub fn observe(&mut self, state: CallState, number: Option<PhoneNumber>) -> LifecycleEvent {
        let prev = self.previous_state;

        let event = match state {
            CallState::Active => {
                self.was_active = true;
                self.remember(number);
                LifecycleEvent::NoOp
            }
            CallState::Idle => {
                let ended = self.was_active && prev != CallState::Idle;
                self.was_active = false;
                let best = self.last_known_number.take().or(number);
                if ended {
                    LifecycleEvent::Ended(best)
                } else {
                    LifecycleEvent::NoOp
                }
            }
            CallState::Ringing if prev == CallState::Idle => {
                self.was_active = false;
                self.last_known_number.clone_from(&number);
                LifecycleEvent::Started(number)
            }
            CallState::Ringing | CallState::Unknown => {
                self.remember(number);
                LifecycleEvent::NoOp
            }
        };

        self.previous_state = state;
        event
    }

    /// Records a number without letting an absent one erase a known one.
    fn remember(&mut self, number: Option<PhoneNumber>) {
        if number.is_some() {
            self.last_known_number = number;
        }
    }
}
