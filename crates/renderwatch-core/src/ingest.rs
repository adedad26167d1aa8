//! Ingestion channel and transport adapters.
//!
//! The monitor consumes an ordered sequence of [`IngestEvent`]s over an
//! mpsc channel; dropping every sender is the channel-close signal. The
//! adapters here are boundary glue for transports that deliver plain
//! text, such as the piped stdout/stderr of a render subprocess.

use crate::{RenderWatchError, Result};
use renderwatch_types::{IngestEvent, TerminalSignal};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sending half of an ingestion channel.
#[derive(Debug, Clone)]
pub struct IngestSender {
    tx: mpsc::Sender<IngestEvent>,
}

/// Create an ingestion channel. The receiver goes to
/// [`MonitorController::spawn`](crate::MonitorController::spawn); the
/// sender (cloneable) goes to the transport.
pub fn ingest_channel(capacity: usize) -> (IngestSender, mpsc::Receiver<IngestEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (IngestSender { tx }, rx)
}

impl IngestSender {
    /// Signal that the transport is connected.
    pub async fn opened(&self) -> Result<()> {
        self.send(IngestEvent::Opened).await
    }

    /// Deliver one raw text line.
    pub async fn line(&self, text: impl Into<String>) -> Result<()> {
        self.send(IngestEvent::Line { text: text.into() }).await
    }

    /// Deliver a structured terminal signal.
    pub async fn terminal(&self, signal: TerminalSignal) -> Result<()> {
        self.send(IngestEvent::Terminal(signal)).await
    }

    /// Report a transport-level failure.
    pub async fn failed(&self, reason: impl Into<String>) -> Result<()> {
        self.send(IngestEvent::Failed {
            reason: reason.into(),
        })
        .await
    }

    /// Whether the monitor has gone away (cancelled or finished draining).
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, event: IngestEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RenderWatchError::ChannelClosed)
    }
}

/// Pump a byte stream into the channel line by line.
///
/// Sends `Failed` on a read error and closes its sender clone on EOF; it
/// does not send `Opened`, since several pumps (stdout and stderr of one
/// process) usually share a channel and the transport signals open once.
pub fn pump_lines<R>(reader: R, tx: IngestSender) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.line(line).await.is_err() {
                        debug!(target: "renderwatch::ingest", "monitor gone, stopping line pump");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(target: "renderwatch::ingest", "line pump reached EOF");
                    break;
                }
                Err(e) => {
                    warn!(target: "renderwatch::ingest", "read error in line pump: {}", e);
                    let _ = tx.failed(e.to_string()).await;
                    break;
                }
            }
        }
    })
}
