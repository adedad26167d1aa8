//! Job lifecycle types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for the ingestion channel to deliver anything.
    Connecting,
    /// Render process is producing output.
    Processing,
    /// Job finished with an artifact. Terminal.
    Completed,
    /// Job failed. Terminal.
    Error,
}

impl JobStatus {
    /// Whether this status is latched: no further input may change it.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Connecting => "connecting",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Terminal result of a job. Set exactly once, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Render finished; `artifact` points at the produced video.
    Completed { artifact: PathBuf },
    /// Render failed; `message` is human-readable (an erroring log line
    /// verbatim, a transport failure notice, or a structured error).
    Failed { message: String },
}

impl JobOutcome {
    /// Status implied by this outcome.
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Connecting.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
    }
}
