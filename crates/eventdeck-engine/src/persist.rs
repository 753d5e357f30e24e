//! Coalescing writer for the triggers document.
//!
//! Every counter update or edit hands the whole trigger list to a single
//! writer task. Snapshots queued behind a slow write are collapsed to the
//! latest one, so the store only ever sees full, ordered states.
//!
//! On failure the writer retries once after a short delay. If that also
//! fails the snapshot stays pending and is retried on every interval tick,
//! or replaced by a newer snapshot when one arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::store::save_triggers;
use crate::traits::DocumentStore;
use crate::types::Trigger;

/// Configuration for the [`TriggerPersister`].
#[derive(Debug, Clone)]
pub struct PersisterConfig {
    pub key: String,
    pub retry_delay: Duration,
    pub retry_interval: Duration,
}

/// Sending half of the writer. Cloneable; dropping every clone lets the
/// writer task finish after a final flush.
#[derive(Clone)]
pub struct TriggerPersister {
    tx: mpsc::UnboundedSender<Vec<Trigger>>,
}

/// Handle to the running writer task. Allows graceful shutdown.
pub struct PersisterHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl TriggerPersister {
    /// Spawn the writer loop as a tokio task.
    pub fn spawn(store: Arc<dyn DocumentStore>, config: PersisterConfig) -> (Self, PersisterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(write_loop(store, config, rx, shutdown_rx));
        (
            Self { tx },
            PersisterHandle {
                shutdown_tx: Some(shutdown_tx),
                join,
            },
        )
    }

    /// Queue a snapshot. Never blocks.
    pub fn submit(&self, snapshot: Vec<Trigger>) {
        if self.tx.send(snapshot).is_err() {
            tracing::warn!("trigger persister stopped, snapshot dropped");
        }
    }
}

impl PersisterHandle {
    /// Flush any pending snapshot and stop the writer.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

async fn write_loop(
    store: Arc<dyn DocumentStore>,
    config: PersisterConfig,
    mut rx: mpsc::UnboundedReceiver<Vec<Trigger>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut pending: Option<Vec<Trigger>> = None;
    let mut interval = tokio::time::interval(config.retry_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Don't fire immediately on creation.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                drain_latest(&mut rx, &mut pending);
                if let Some(snapshot) = pending.take() {
                    if let Err(snapshot) = flush(&*store, &config, snapshot).await {
                        tracing::error!(
                            triggers = snapshot.len(),
                            "trigger persister shut down with an unsaved snapshot"
                        );
                    }
                }
                return;
            }

            snapshot = rx.recv() => {
                match snapshot {
                    Some(snapshot) => {
                        pending = Some(snapshot);
                        drain_latest(&mut rx, &mut pending);
                    }
                    None => {
                        if let Some(snapshot) = pending.take() {
                            let _ = flush(&*store, &config, snapshot).await;
                        }
                        return;
                    }
                }
            }

            _ = interval.tick(), if pending.is_some() => {}
        }

        if let Some(snapshot) = pending.take() {
            pending = flush(&*store, &config, snapshot).await.err();
        }
    }
}

/// Keep only the newest of the immediately available snapshots.
fn drain_latest(rx: &mut mpsc::UnboundedReceiver<Vec<Trigger>>, pending: &mut Option<Vec<Trigger>>) {
    while let Ok(snapshot) = rx.try_recv() {
        *pending = Some(snapshot);
    }
}

/// Write a snapshot, retrying once after `retry_delay`. Hands the snapshot
/// back when both attempts fail.
async fn flush(
    store: &dyn DocumentStore,
    config: &PersisterConfig,
    snapshot: Vec<Trigger>,
) -> Result<(), Vec<Trigger>> {
    match save_triggers(store, &config.key, &snapshot).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(
                key = %config.key,
                "triggers write failed, retrying in {}ms: {e}",
                config.retry_delay.as_millis()
            );
            tokio::time::sleep(config.retry_delay).await;
            match save_triggers(store, &config.key, &snapshot).await {
                Ok(()) => Ok(()),
                Err(e2) => {
                    tracing::error!(key = %config.key, "triggers write retry failed: {e2}");
                    Err(snapshot)
                }
            }
        }
    }
}
