//! Monitor controller: one task per job, wiring the ingestion channel to
//! the classifier and state machine.
//!
//! All line arrivals, transport notifications, sampler ticks, and the
//! grace-delay timer are serialized into a single `select!` loop, so no
//! two mutations of a `JobRun` ever race. The `Finished` event is emitted
//! exactly once per job, on or after the moment the status latches.

use crate::{ClassifierRules, FeedItem, FeedOutcome, JobRun};
use renderwatch_types::{IngestEvent, JobOutcome, JobStatus, LogLine, MonitorEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tuning knobs for a monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Classifier phrase sets.
    pub rules: ClassifierRules,
    /// Delay between entering Completed and emitting `Finished`, so the
    /// caller's view gets one more render cycle showing the completed
    /// state before it reacts. Errors are reported without delay.
    pub grace_delay: Duration,
    /// Elapsed-time sampler period. Runs only while Processing.
    pub sample_interval: Duration,
    /// Outgoing event buffer capacity.
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rules: ClassifierRules::default(),
            grace_delay: Duration::from_millis(500),
            sample_interval: Duration::from_secs(1),
            event_capacity: 256,
        }
    }
}

/// Options for spawning a monitor.
#[derive(Debug)]
pub struct MonitorOptions {
    pub job_id: Uuid,
    /// Artifact reference already known to the caller (e.g. the output
    /// path returned when the job was submitted). Heuristic completion
    /// has no payload of its own; without this, a text-only completion
    /// resolves to a "completed without artifact" error.
    pub expected_artifact: Option<PathBuf>,
    pub config: MonitorConfig,
}

/// Spawns and owns monitor tasks.
pub struct MonitorController;

impl MonitorController {
    /// Start monitoring one job. The returned handle is the only way to
    /// observe the job; the task exclusively owns all mutation.
    pub fn spawn(opts: MonitorOptions, ingest: mpsc::Receiver<IngestEvent>) -> MonitorHandle {
        let MonitorOptions {
            job_id,
            expected_artifact,
            config,
        } = opts;

        info!(target: "renderwatch::monitor", "Starting monitor for job {}", job_id);
        let shared = Arc::new(RwLock::new(JobRun::new(job_id, expected_artifact)));
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let task = tokio::spawn(run(shared.clone(), config, ingest, event_tx));

        MonitorHandle {
            job_id,
            events: event_rx,
            shared,
            task,
        }
    }
}

/// Caller-side handle for one monitored job.
pub struct MonitorHandle {
    job_id: Uuid,
    events: mpsc::Receiver<MonitorEvent>,
    shared: Arc<RwLock<JobRun>>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Receive the next monitor event. Returns `None` once the monitor
    /// task has finished and the buffer is drained.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        self.events.recv().await
    }

    /// Current lifecycle status snapshot.
    pub async fn status(&self) -> JobStatus {
        self.shared.read().await.status()
    }

    /// Elapsed Processing time snapshot.
    pub async fn elapsed(&self) -> Duration {
        self.shared.read().await.elapsed()
    }

    /// Terminal outcome, if latched.
    pub async fn outcome(&self) -> Option<JobOutcome> {
        self.shared.read().await.outcome().cloned()
    }

    /// Ordered transcript snapshot.
    pub async fn transcript(&self) -> Vec<LogLine> {
        self.shared.read().await.transcript().lines().to_vec()
    }

    /// Turn the handle into a plain event stream, detaching the monitor
    /// task (it keeps running until its ingest channel closes).
    pub fn into_event_stream(self) -> ReceiverStream<MonitorEvent> {
        let MonitorHandle { events, .. } = self;
        ReceiverStream::new(events)
    }

    /// Cancel the job watch. Aborts the monitor task and drops the ingest
    /// receiver, so transports see a closed channel; no further events are
    /// emitted.
    pub fn cancel(self) {
        info!(target: "renderwatch::monitor", "Cancelling monitor for job {}", self.job_id);
        self.task.abort();
    }
}

async fn run(
    shared: Arc<RwLock<JobRun>>,
    config: MonitorConfig,
    mut ingest: mpsc::Receiver<IngestEvent>,
    events: mpsc::Sender<MonitorEvent>,
) {
    let job_id = shared.read().await.id();
    // Mirror of the run's status, so the sampler guard needs no lock.
    let mut status = JobStatus::Connecting;
    let mut ticker = interval(config.sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Armed when the status latches; fires the single Finished event
    // after the grace delay.
    let finish_timer = sleep(Duration::ZERO);
    tokio::pin!(finish_timer);
    let mut finish_armed = false;
    let mut pending_outcome: Option<JobOutcome> = None;
    let mut finished_sent = false;

    loop {
        tokio::select! {
            item = ingest.recv() => match item {
                Some(event) => {
                    let mut run = shared.write().await;
                    let prev = run.status();
                    let mut appended: Option<LogLine> = None;

                    let feed_outcome = match event {
                        IngestEvent::Opened => run.feed(FeedItem::ChannelOpen),
                        IngestEvent::Line { text } => {
                            let classification = config.rules.classify(&text);
                            let out = run.feed(FeedItem::Line {
                                text: &text,
                                classification,
                            });
                            appended = run.transcript().last().cloned();
                            out
                        }
                        IngestEvent::Terminal(signal) => run.feed(FeedItem::Terminal(&signal)),
                        IngestEvent::Failed { reason } => {
                            warn!(
                                target: "renderwatch::monitor",
                                "Transport failure for job {}: {}", job_id, reason
                            );
                            run.feed(FeedItem::TransportFailed)
                        }
                    };

                    let new_status = run.status();
                    drop(run);

                    if let Some(line) = appended {
                        let _ = events.send(MonitorEvent::LineAppended { job_id, line }).await;
                    }
                    if new_status != prev {
                        status = new_status;
                        debug!(
                            target: "renderwatch::monitor",
                            "Job {} status: {} -> {}", job_id, prev, new_status
                        );
                        let _ = events
                            .send(MonitorEvent::StatusChanged { job_id, status: new_status })
                            .await;
                    }

                    match feed_outcome {
                        FeedOutcome::Terminal(outcome) => {
                            let delay = match outcome {
                                JobOutcome::Completed { .. } => config.grace_delay,
                                JobOutcome::Failed { .. } => Duration::ZERO,
                            };
                            pending_outcome = Some(outcome);
                            finish_timer.as_mut().reset(Instant::now() + delay);
                            finish_armed = true;
                        }
                        FeedOutcome::DoubleTerminal => {
                            debug!(
                                target: "renderwatch::monitor",
                                "Job {} input after terminal state ignored", job_id
                            );
                        }
                        FeedOutcome::Processing | FeedOutcome::Unchanged => {}
                    }
                }
                None => {
                    // Channel closed. Close before a terminal state is a
                    // transport failure with the fixed message.
                    let mut run = shared.write().await;
                    if !run.status().is_terminal() {
                        let feed_outcome = run.feed(FeedItem::TransportFailed);
                        let new_status = run.status();
                        drop(run);
                        warn!(
                            target: "renderwatch::monitor",
                            "Ingestion channel for job {} closed before terminal state", job_id
                        );
                        let _ = events
                            .send(MonitorEvent::StatusChanged { job_id, status: new_status })
                            .await;
                        if let FeedOutcome::Terminal(outcome) = feed_outcome {
                            pending_outcome = Some(outcome);
                            finish_timer.as_mut().reset(Instant::now());
                            finish_armed = true;
                        }
                    }
                    break;
                }
            },
            _ = ticker.tick(), if status == JobStatus::Processing => {
                let seconds = shared.read().await.elapsed().as_secs();
                let _ = events.send(MonitorEvent::Elapsed { job_id, seconds }).await;
            }
            _ = &mut finish_timer, if finish_armed && !finished_sent => {
                finished_sent = true;
                if let Some(outcome) = pending_outcome.take() {
                    info!(
                        target: "renderwatch::monitor",
                        "Job {} finished: {}", job_id, outcome.status()
                    );
                    let _ = events.send(MonitorEvent::Finished { job_id, outcome }).await;
                }
            }
        }
    }

    // The channel closed while a terminal notification was still pending;
    // honor the remaining grace delay, then emit it.
    if !finished_sent && finish_armed {
        finish_timer.as_mut().await;
        if let Some(outcome) = pending_outcome.take() {
            info!(
                target: "renderwatch::monitor",
                "Job {} finished: {}", job_id, outcome.status()
            );
            let _ = events.send(MonitorEvent::Finished { job_id, outcome }).await;
        }
    }

    debug!(target: "renderwatch::monitor", "Monitor task for job {} exiting", job_id);
}
