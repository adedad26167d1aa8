//! Core render-job monitoring for renderwatch.
//!
//! Consumes the unstructured diagnostic stream of an external render
//! process and derives the job's lifecycle state, final artifact, or
//! failure reason. The classifier and state machine are pure and
//! synchronous; the monitor controller wires them to an async ingestion
//! channel and an elapsed-time sampler.

mod classifier;
mod error;
mod ingest;
mod job;
mod monitor;
mod transcript;

pub use classifier::ClassifierRules;
pub use error::RenderWatchError;
pub use ingest::{ingest_channel, pump_lines, IngestSender};
pub use job::{FeedItem, FeedOutcome, JobRun, MISSING_ARTIFACT_MESSAGE, TRANSPORT_LOST_MESSAGE};
pub use monitor::{MonitorConfig, MonitorController, MonitorHandle, MonitorOptions};
pub use transcript::Transcript;

/// Result type for renderwatch operations.
pub type Result<T> = std::result::Result<T, RenderWatchError>;
