//! Post-call hand-off to the follow-up screen.

use std::fmt;

use thiserror::Error;

use crate::types::PhoneNumber;

/// Errors reported when the follow-up screen cannot be opened.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("follow-up screen could not be launched: {0}")]
    Launch(String),
}

/// The screen shown after a call ends.
pub trait FollowUpScreen {
    /// Opens the screen for `number`, which is empty when unknown.
    fn open(&mut self, number: &str) -> Result<(), HandoffError>;
}

/// Fires the follow-up screen once per ended call.
pub struct PostCallHandoff<F: FollowUpScreen> {
    screen: F,
    triggered: usize,
}

impl<F: FollowUpScreen> PostCallHandoff<F> {
    pub const fn new(screen: F) -> Self {
        Self {
            screen,
            triggered: 0,
        }
    }

    /// Opens the follow-up screen, forwarding an empty number when unknown.
    pub fn trigger(&mut self, number: Option<&PhoneNumber>) -> Result<(), HandoffError> {
        let number = number.map_or("", PhoneNumber::as_str);
        self.triggered += 1;
        tracing::debug!(number, "opening follow-up screen");
        self.screen.open(number)
    }

    /// Number of hand-offs fired so far.
    pub const fn triggered(&self) -> usize {
        self.triggered
    }

    pub const fn screen(&self) -> &F {
        &self.screen
    }
}

/// View model for the follow-up screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    number: String,
}

impl FollowUp {
    /// Builds the view model from the forwarded number.
    #[must_use]
    pub fn new(number: &str) -> Self {
        Self {
            number: number.trim().to_string(),
        }
    }

    /// Target for composing a text to the caller, when the number is known.
    #[must_use]
    pub fn compose_uri(&self) -> Option<String> {
        if self.number.is_empty() {
            None
        } else {
            Some(format!("smsto:{}", self.number))
        }
    }
}

impl fmt::Display for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.number.is_empty() {
            f.write_str("Call ended")
        } else {
            write!(f, "Call ended: {}", self.number)
        }
    }
}
