//! Job lifecycle state machine.
//!
//! One `JobRun` owns the aggregate status of a single render job. All
//! mutation goes through [`JobRun::feed`], which enforces the terminal
//! latch in one place: once Completed or Error is reached, no further
//! input changes the status, the outcome, or the captured message.

use crate::Transcript;
use chrono::{DateTime, Utc};
use renderwatch_types::{Classification, JobOutcome, JobStatus, TerminalSignal};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Fixed message for an ingestion channel that drops before a terminal
/// state is reached.
pub const TRANSPORT_LOST_MESSAGE: &str = "connection to render process lost";

/// Message for a completion that arrives without a usable artifact
/// reference. Surfaced as an error rather than a silent success.
pub const MISSING_ARTIFACT_MESSAGE: &str = "completed without artifact";

/// One unit of input to the state machine.
#[derive(Debug)]
pub enum FeedItem<'a> {
    /// Transport reports the channel opened.
    ChannelOpen,
    /// A raw line together with its classification.
    Line {
        text: &'a str,
        classification: Classification,
    },
    /// Structured terminal signal. Authoritative: drives the transition
    /// rules directly, regardless of what the text heuristics would say.
    Terminal(&'a TerminalSignal),
    /// The ingestion channel itself failed or dropped.
    TransportFailed,
}

/// What a call to [`JobRun::feed`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    /// No lifecycle change (line appended, progress tick, etc.).
    Unchanged,
    /// Entered Processing.
    Processing,
    /// Entered a terminal state with this outcome.
    Terminal(JobOutcome),
    /// Input that would have driven a transition arrived after the latch;
    /// deliberately swallowed, but distinct so it shows up in logs and
    /// tests.
    DoubleTerminal,
}

/// Mutable aggregate for one render job.
#[derive(Debug)]
pub struct JobRun {
    id: Uuid,
    status: JobStatus,
    created_at: DateTime<Utc>,
    processing_since: Option<Instant>,
    /// Elapsed time frozen at the moment the job latched.
    final_elapsed: Option<Duration>,
    /// Artifact reference known to the caller up-front (e.g. the output
    /// path returned by the synchronous render-submit call). Heuristic
    /// completion has no payload of its own and uses this.
    expected_artifact: Option<PathBuf>,
    outcome: Option<JobOutcome>,
    transcript: Transcript,
}

impl JobRun {
    pub fn new(id: Uuid, expected_artifact: Option<PathBuf>) -> Self {
        Self {
            id,
            status: JobStatus::Connecting,
            created_at: Utc::now(),
            processing_since: None,
            final_elapsed: None,
            expected_artifact,
            outcome: None,
            transcript: Transcript::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.outcome.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Time spent since entering Processing. Zero while Connecting,
    /// frozen once terminal. Non-negative and non-decreasing.
    pub fn elapsed(&self) -> Duration {
        if let Some(done) = self.final_elapsed {
            return done;
        }
        self.processing_since
            .map(|since| since.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Single mutation entry point. Applies one input unit and reports
    /// what changed. Never fails: every input resolves to a defined
    /// outcome, including input after the latch.
    pub fn feed(&mut self, item: FeedItem<'_>) -> FeedOutcome {
        match item {
            FeedItem::ChannelOpen => {
                if self.status.is_terminal() {
                    return FeedOutcome::Unchanged;
                }
                self.enter_processing()
            }
            FeedItem::Line {
                text,
                classification,
            } => {
                // The transcript is display state, independent of the
                // lifecycle: it grows even after the latch.
                self.transcript.push(text, classification);

                if self.status.is_terminal() {
                    return match classification {
                        Classification::Completion | Classification::Error => {
                            FeedOutcome::DoubleTerminal
                        }
                        _ => FeedOutcome::Unchanged,
                    };
                }

                let moved = self.enter_processing();
                match classification {
                    Classification::Error => self.latch(JobOutcome::Failed {
                        message: text.to_string(),
                    }),
                    Classification::Completion => match self.expected_artifact.clone() {
                        Some(artifact) => self.latch(JobOutcome::Completed { artifact }),
                        None => self.latch(JobOutcome::Failed {
                            message: MISSING_ARTIFACT_MESSAGE.to_string(),
                        }),
                    },
                    Classification::Progress | Classification::Neutral => moved,
                }
            }
            FeedItem::Terminal(signal) => {
                if self.status.is_terminal() {
                    return FeedOutcome::DoubleTerminal;
                }
                self.enter_processing();
                if signal.success {
                    let artifact = signal
                        .artifact
                        .clone()
                        .filter(|p| !p.as_os_str().is_empty())
                        .or_else(|| self.expected_artifact.clone());
                    match artifact {
                        Some(artifact) => self.latch(JobOutcome::Completed { artifact }),
                        None => self.latch(JobOutcome::Failed {
                            message: MISSING_ARTIFACT_MESSAGE.to_string(),
                        }),
                    }
                } else {
                    let message = signal
                        .error
                        .clone()
                        .unwrap_or_else(|| "render process reported failure".to_string());
                    self.latch(JobOutcome::Failed { message })
                }
            }
            FeedItem::TransportFailed => {
                if self.status.is_terminal() {
                    return FeedOutcome::DoubleTerminal;
                }
                // Forced transition, independent of line classification.
                // Connecting goes straight to Error without ever touching
                // Processing.
                self.latch(JobOutcome::Failed {
                    message: TRANSPORT_LOST_MESSAGE.to_string(),
                })
            }
        }
    }

    fn enter_processing(&mut self) -> FeedOutcome {
        if self.status == JobStatus::Connecting {
            self.status = JobStatus::Processing;
            self.processing_since = Some(Instant::now());
            FeedOutcome::Processing
        } else {
            FeedOutcome::Unchanged
        }
    }

    fn latch(&mut self, outcome: JobOutcome) -> FeedOutcome {
        debug_assert!(!self.status.is_terminal(), "latch called twice");
        self.status = outcome.status();
        self.final_elapsed = Some(self.elapsed());
        self.outcome = Some(outcome.clone());
        FeedOutcome::Terminal(outcome)
    }
}
