//! Hierarchical success/error aggregator
//!
//! A `Status` is created fresh for every validation pass or operation attempt
//! and collects every failure under a string key. A value is either a plain
//! message or a nested `Status`, which lets composite validators hand back
//! both a terse message and the full structured detail in a single pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome code of a `Status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Success,
    Error,
}

/// Value recorded under an error key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ErrorValue {
    Message(String),
    Nested(Box<Status>),
}

impl From<&str> for ErrorValue {
    fn from(message: &str) -> Self {
        ErrorValue::Message(message.to_string())
    }
}

impl From<String> for ErrorValue {
    fn from(message: String) -> Self {
        ErrorValue::Message(message)
    }
}

impl From<Status> for ErrorValue {
    fn from(status: Status) -> Self {
        ErrorValue::Nested(Box::new(status))
    }
}

/// Success/error aggregator shared by the client and the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawStatus")]
pub struct Status {
    code: StatusCode,
    #[serde(default)]
    errors: IndexMap<String, ErrorValue>,
}

/// Wire shape of a `Status`. The incoming code is ignored and derived from the errors.
#[derive(Deserialize)]
struct RawStatus {
    #[serde(default)]
    errors: IndexMap<String, ErrorValue>,
}

impl From<RawStatus> for Status {
    fn from(raw: RawStatus) -> Self {
        let code = if raw.errors.is_empty() {
            StatusCode::Success
        } else {
            StatusCode::Error
        };
        Self {
            code,
            errors: raw.errors,
        }
    }
}

impl Status {
    pub fn new() -> Self {
        Self {
            code: StatusCode::Success,
            errors: IndexMap::new(),
        }
    }

    /// Build a failed status carrying a single error
    pub fn with_error(key: &str, value: impl Into<ErrorValue>) -> Self {
        let mut status = Self::new();
        status.set_error(key, value);
        status
    }

    /// Record a failure under `key`. A second write to the same key replaces the first.
    pub fn set_error(&mut self, key: &str, value: impl Into<ErrorValue>) -> &mut Self {
        self.errors.insert(key.to_string(), value.into());
        self.code = StatusCode::Error;
        self
    }

    pub fn get_status(&self) -> StatusCode {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }

    pub fn get_error(&self, key: &str) -> Option<&ErrorValue> {
        self.errors.get(key)
    }

    /// Error message under `key`, if the entry is a plain message
    pub fn message(&self, key: &str) -> Option<&str> {
        match self.errors.get(key) {
            Some(ErrorValue::Message(message)) => Some(message),
            _ => None,
        }
    }

    /// Nested status under `key`, if the entry is a nested status
    pub fn nested(&self, key: &str) -> Option<&Status> {
        match self.errors.get(key) {
            Some(ErrorValue::Nested(status)) => Some(status),
            _ => None,
        }
    }

    /// Error keys in the order they were first recorded
    pub fn error_keys(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    pub fn errors(&self) -> &IndexMap<String, ErrorValue> {
        &self.errors
    }

    /// Copy every entry of `other` into this status
    pub fn merge(&mut self, other: Status) {
        for (key, value) in other.errors {
            self.set_error(&key, value);
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
