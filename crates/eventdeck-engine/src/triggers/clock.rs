//! Minute-boundary clock feeding [`Engine::handle_tick`](crate::engine::Engine::handle_tick).

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};

use super::schedule::truncate_to_minute;

/// Emits the instant of every minute boundary on a channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinuteClock;

impl MinuteClock {
    pub fn new() -> Self {
        Self
    }

    /// Run until shutdown is signalled or the receiver is dropped.
    ///
    /// Each tick carries the boundary itself, not the wake-up time, so a late
    /// wake-up still maps to the right minute. Minutes skipped entirely (host
    /// suspend, a stalled runtime) are not replayed; a warning is logged with
    /// the number of minutes lost.
    pub async fn run(
        &self,
        tx: mpsc::Sender<DateTime<Utc>>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            let now = Utc::now();
            let next = next_boundary(now);
            let delay = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_millis(100));

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let missed = missed_minutes(next, Utc::now());
                    if missed > 0 {
                        tracing::warn!(
                            boundary = %next,
                            missed,
                            "minute clock woke late; skipped minutes are not replayed"
                        );
                    }
                    if tx.send(next).await.is_err() {
                        // Receiver dropped.
                        return;
                    }
                }
                _ = shutdown.recv() => {
                    return;
                }
            }
        }
    }
}

/// The first whole minute strictly after `now`.
pub fn next_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_minute(now) + chrono::Duration::minutes(1)
}

/// Whole minute boundaries that passed between `boundary` and `woke`.
fn missed_minutes(boundary: DateTime<Utc>, woke: DateTime<Utc>) -> i64 {
    (woke - boundary).num_minutes().max(0)
}
