//! Transcript line types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of a single diagnostic line.
///
/// Derived per line by the classifier, never merged across lines. Used by
/// the state machine to drive transitions and by views to color-code the
/// transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Progress-bar or rate output from the render backend.
    Progress,
    /// Terminal artifact-ready announcement.
    Completion,
    /// Genuine failure indicator.
    Error,
    /// Anything else: stage transitions, library warnings, chatter.
    Neutral,
}

/// One raw line of render-process output, as recorded in the transcript.
///
/// Immutable after creation. The sequence number is assigned by the
/// monitor controller in arrival order, never by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Arrival sequence number, monotonically increasing from 0.
    pub seq: u64,
    /// Raw line text, verbatim.
    pub text: String,
    /// Classification derived when the line arrived.
    pub classification: Classification,
    /// Wall-clock arrival time.
    pub received_at: DateTime<Utc>,
}
