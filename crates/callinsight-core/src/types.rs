//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty or only whitespace.
    #[error("{field} cannot be blank")]
    Blank { field: &'static str },
}

/// A validated phone number as reported by the telephony stack.
///
/// Numbers are stored trimmed and are never blank. No further normalization
/// is applied: the history store matches on the exact string the OS reports,
/// so `+15551234` and `5551234` are different numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Creates a new number after validation.
    pub fn new(number: impl Into<String>) -> Result<Self, ValidationError> {
        let number = number.into();
        let trimmed = number.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Blank {
                field: "phone number",
            });
        }
        if trimmed.len() == number.len() {
            Ok(Self(number))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Parses an optional raw number, treating absent and blank values alike.
    #[must_use]
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|s| Self::new(s).ok())
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
