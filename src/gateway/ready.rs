use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::Error;

/// How long a tool call will wait for the connection before giving up.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Process-wide readiness flag for the Discord connection. Starts closed,
/// opens exactly once when login completes, and never reverts; there is no
/// reconnect state machine in this design.
///
/// Waiting is a single-fire watch subscription with a timeout; once issued,
/// a wait always resolves or times out on its own (no cancellation).
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn mark_ready(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve immediately when already ready, otherwise wait up to
    /// `timeout` for the gate to open.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), Error> {
        let mut rx = self.rx.clone();
        tokio::time::timeout(timeout, async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Sender gone without ever opening the gate; keep the
                    // wait pending until the timeout fires.
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
        .map_err(|_| Error::ReadinessTimeout)
    }
}
