//! Core data types passed between the tailer and the forwarder
//!
//! Everything here is transient: a line is read, turned into an alert,
//! delivered, and the resulting outcome is logged. Nothing is persisted.

use crate::error::DeliveryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// One complete line read from the tracked file
///
/// The trailing newline (and a preceding carriage return, if any) is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Line content without the line terminator
    pub text: String,
    /// Byte offset of the first byte of this line in the file
    pub offset: u64,
    /// When the tailer completed the line
    pub read_at: Timestamp,
}

impl LogLine {
    pub fn new(text: impl Into<String>, offset: u64) -> Self {
        Self {
            text: text.into(),
            offset,
            read_at: Utc::now(),
        }
    }
}

/// JSON document parsed from a log line
///
/// No schema is imposed. Any JSON value is accepted and forwarded verbatim;
/// Wazuh writes one object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alert(pub serde_json::Value);

impl Alert {
    /// Parse an alert from raw line text, ignoring surrounding whitespace
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text.trim()).map(Alert)
    }

    /// Short label used in log messages (Wazuh `rule.id` when present)
    pub fn rule_id(&self) -> Option<&str> {
        self.0.get("rule")?.get("id")?.as_str()
    }
}

/// Reason a delivery attempt did not produce an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout(String),
    Connect(String),
    Request(String),
}

impl From<DeliveryError> for FailureReason {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::Timeout(msg) => FailureReason::Timeout(msg),
            DeliveryError::Connect(msg) => FailureReason::Connect(msg),
            DeliveryError::Request(msg) | DeliveryError::Encode(msg) => {
                FailureReason::Request(msg)
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout(msg) => write!(f, "timeout: {}", msg),
            FailureReason::Connect(msg) => write!(f, "connection error: {}", msg),
            FailureReason::Request(msg) => write!(f, "request error: {}", msg),
        }
    }
}

/// Result of processing one log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The collector answered; any status code counts, including non-2xx
    Delivered { status: u16 },
    /// The line was not valid JSON and was dropped without a request
    ParseError(String),
    /// No response was received
    Failed(FailureReason),
}

impl DeliveryOutcome {
    /// Whether a request was actually sent for this line
    pub fn was_attempted(&self) -> bool {
        !matches!(self, DeliveryOutcome::ParseError(_))
    }

    pub fn is_success_status(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { status } if (200..300).contains(status))
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered { status } => write!(f, "Sent alert: {}", status),
            DeliveryOutcome::ParseError(msg) => write!(f, "Push failed: invalid JSON: {}", msg),
            DeliveryOutcome::Failed(reason) => write!(f, "Push failed: {}", reason),
        }
    }
}
