//! Render subprocess management.
//!
//! The spawned child is owned by a background reaper task, so the event
//! loop in main never blocks on it. Shutdown goes through the reaper: it
//! kills the process if it is still running and always reaps it, so a
//! failed job cannot leave a render subprocess behind.

use anyhow::{Context, Result};
use renderwatch_core::{pump_lines, IngestSender};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// A render process wired into an ingestion channel.
///
/// Both output pipes are pumped into the channel line by line. Once they
/// reach EOF the reaper waits for the exit status and synthesizes the
/// `process exited with code N` line the classifier knows about, then
/// drops the last sender, closing the channel.
pub struct RenderProcess {
    kill: oneshot::Sender<()>,
    reaper: JoinHandle<()>,
}

impl RenderProcess {
    /// Spawn `program args..` with piped stdio and start pumping.
    pub fn spawn(program: &str, args: &[String], tx: IngestSender) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn render command '{}'", program))?;

        let stdout = child
            .stdout
            .take()
            .context("render process stdout not captured")?;
        let stderr = child
            .stderr
            .take()
            .context("render process stderr not captured")?;

        let out_pump = pump_lines(stdout, tx.clone());
        let err_pump = pump_lines(stderr, tx.clone());

        let (kill, kill_rx) = oneshot::channel();
        let reaper = tokio::spawn(reap(child, out_pump, err_pump, kill_rx, tx));
        Ok(Self { kill, reaper })
    }

    /// Kill the process if it is still running, then reap it. Returns
    /// once the process is gone; a no-op when it already exited.
    pub async fn shutdown(self) {
        let _ = self.kill.send(());
        let _ = self.reaper.await;
    }
}

async fn reap(
    mut child: Child,
    out_pump: JoinHandle<()>,
    err_pump: JoinHandle<()>,
    kill_rx: oneshot::Receiver<()>,
    tx: IngestSender,
) {
    let pumps = async {
        let _ = out_pump.await;
        let _ = err_pump.await;
    };
    tokio::select! {
        _ = pumps => match child.wait().await {
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                debug!(target: "renderwatch::cli", "Render process exited with code {}", code);
                let _ = tx.line(format!("process exited with code {}", code)).await;
            }
            Err(e) => {
                let _ = tx.failed(e.to_string()).await;
            }
        },
        _ = kill_rx => {
            debug!(target: "renderwatch::cli", "Stopping render process");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderwatch_core::ingest_channel;
    use renderwatch_types::IngestEvent;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_exit_line_synthesized_after_pipes_close() {
        let (tx, mut rx) = ingest_channel(16);
        let process = RenderProcess::spawn("sh", &sh("echo hello; exit 3"), tx).unwrap();

        let mut lines = Vec::new();
        while let Some(event) = rx.recv().await {
            if let IngestEvent::Line { text } = event {
                lines.push(text);
            }
        }
        assert_eq!(
            lines,
            vec!["hello".to_string(), "process exited with code 3".to_string()]
        );
        // Shutdown after a natural exit is a no-op.
        timeout(Duration::from_secs(5), process.shutdown())
            .await
            .expect("shutdown hung after natural exit");
    }

    #[tokio::test]
    async fn test_shutdown_kills_a_running_process() {
        let (tx, mut rx) = ingest_channel(16);
        let process = RenderProcess::spawn("sh", &sh("echo started; sleep 30"), tx).unwrap();

        // The process is alive and producing output.
        assert_eq!(
            rx.recv().await,
            Some(IngestEvent::Line {
                text: "started".into()
            })
        );

        // Must return once the process is dead, not after the sleep.
        timeout(Duration::from_secs(5), process.shutdown())
            .await
            .expect("shutdown did not stop the render process");

        // All senders are gone once the reaper and the pumps wind down.
        timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await
        .expect("ingest channel never closed after shutdown");
    }
}
