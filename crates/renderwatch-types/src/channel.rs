//! Ingestion channel and monitor event protocol.

use crate::{JobOutcome, JobStatus, LogLine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Structured terminal message from the transport.
///
/// Wire shape: `{ "success": true, "artifact": <path> }` or
/// `{ "success": false, "error": <text> }`. When present, this is
/// authoritative and overrides heuristic text classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSignal {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TerminalSignal {
    pub fn success(artifact: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            artifact: Some(artifact.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            artifact: None,
            error: Some(error.into()),
        }
    }
}

/// One unit delivered by the ingestion channel.
///
/// Channel close (all senders dropped) is itself an event: the controller
/// treats close before a terminal state as a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Transport reports the channel is open. Moves Connecting to
    /// Processing even before the first line arrives.
    Opened,
    /// One raw text line from the render process.
    Line { text: String },
    /// Structured terminal signal; authoritative over heuristics.
    Terminal(TerminalSignal),
    /// Transport-level failure (socket dropped, pipe broke).
    Failed { reason: String },
}

/// Events emitted by a monitor to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Lifecycle status changed.
    StatusChanged { job_id: Uuid, status: JobStatus },
    /// A line was appended to the transcript.
    LineAppended { job_id: Uuid, line: LogLine },
    /// Elapsed-time sampler tick (seconds since Processing began).
    Elapsed { job_id: Uuid, seconds: u64 },
    /// Terminal notification. Emitted exactly once per job.
    Finished { job_id: Uuid, outcome: JobOutcome },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_signal_success_wire_shape() {
        let sig = TerminalSignal::success("/tmp/out.mp4");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, r#"{"success":true,"artifact":"/tmp/out.mp4"}"#);
    }

    #[test]
    fn test_terminal_signal_failure_wire_shape() {
        let sig = TerminalSignal::failure("render crashed");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"render crashed"}"#);
    }

    #[test]
    fn test_terminal_signal_success_without_artifact_deserializes() {
        // Transports may claim success without an artifact; the state
        // machine surfaces that as an error, but the wire type accepts it.
        let sig: TerminalSignal = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(sig.success);
        assert!(sig.artifact.is_none());
    }

    #[test]
    fn test_ingest_event_tagged_serialization() {
        let ev = IngestEvent::Line {
            text: "Rendering scene 1".into(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"type":"line","text":"Rendering scene 1"}"#);
    }

    #[test]
    fn test_monitor_event_finished_serialization() {
        let ev = MonitorEvent::Finished {
            job_id: Uuid::nil(),
            outcome: JobOutcome::Failed {
                message: "connection to render process lost".into(),
            },
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""type":"finished""#));
        assert!(json.contains(r#""result":"failed""#));
    }
}
