//! Engine lifecycle: feeds events and clock ticks into the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::clock::MinuteClock;
use crate::engine::Engine;
use crate::types::Event;

/// Drives an [`Engine`] from an event channel and a tick channel.
///
/// Events and ticks each get their own task, so a slow firing on one side
/// never delays the other. Within a side, items are handled one at a time in
/// arrival order.
pub struct EngineRunner {
    engine: Arc<Engine>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl EngineRunner {
    /// Start the event loop plus a [`MinuteClock`] driving the tick loop.
    pub fn start(engine: Arc<Engine>, events: mpsc::Receiver<Event>) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(8);
        let mut runner = Self::start_with_ticks(engine, events, tick_rx);
        let shutdown_rx = runner.shutdown_tx.subscribe();
        runner.handles.push(tokio::spawn(async move {
            MinuteClock::new().run(tick_tx, shutdown_rx).await;
        }));
        runner
    }

    /// Start with an externally supplied tick source.
    pub fn start_with_ticks(
        engine: Arc<Engine>,
        mut events: mpsc::Receiver<Event>,
        mut ticks: mpsc::Receiver<DateTime<Utc>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let event_engine = Arc::clone(&engine);
        let mut event_shutdown = shutdown_tx.subscribe();
        let event_loop = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => {
                            event_engine.handle_event(&event).await;
                        }
                        None => return,
                    },
                    _ = event_shutdown.recv() => return,
                }
            }
        });

        let tick_engine = Arc::clone(&engine);
        let mut tick_shutdown = shutdown_tx.subscribe();
        let tick_loop = tokio::spawn(async move {
            loop {
                tokio::select! {
                    tick = ticks.recv() => match tick {
                        Some(at) => {
                            let report = tick_engine.handle_tick(at).await;
                            if !report.firings.is_empty() {
                                tracing::debug!(
                                    tick = %report.at,
                                    fired = report.firings.len(),
                                    "tick handled"
                                );
                            }
                        }
                        None => return,
                    },
                    _ = tick_shutdown.recv() => return,
                }
            }
        });

        Self {
            engine,
            shutdown_tx,
            handles: vec![event_loop, tick_loop],
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Stop all loops, wait for in-flight firings, then flush persistence.
    pub async fn shutdown(self) {
        // Receivers may already be dropped.
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            let _ = handle.await;
        }
        self.engine.shutdown().await;
    }

    /// Wait for the input channels to close and drain, then flush
    /// persistence. With the built-in clock the tick side never closes, so
    /// use [`shutdown`](Self::shutdown) instead.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{InMemoryDocumentStore, RecordingSinks};
    use crate::store::{load_triggers, save_triggers};
    use crate::types::{
        Action, ActionType, EventCondition, EventMetadata, EventType, TimerCondition, Trigger,
        TriggerCondition,
    };
    use chrono::TimeZone;

    fn trigger(id: &str, condition: TriggerCondition) -> Trigger {
        Trigger {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            enabled: true,
            condition,
            actions: vec![Action {
                id: "log".into(),
                action_type: ActionType::Log,
                name: "log".into(),
                description: String::new(),
                config: Default::default(),
            }],
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            last_triggered: None,
            trigger_count: 0,
        }
    }

    #[tokio::test]
    async fn test_events_and_ticks_reach_engine() {
        let store = Arc::new(InMemoryDocumentStore::new());
        save_triggers(
            store.as_ref(),
            "triggers.json",
            &[
                trigger("on_file", TriggerCondition::Event(EventCondition {
                    event_type: Some(EventType::FileDeleted),
                    ..Default::default()
                })),
                trigger("hourly", TriggerCondition::Timer(TimerCondition {
                    cron_expression: "0 * * * *".into(),
                    description: String::new(),
                })),
            ],
        )
        .await
        .unwrap();

        let recording = RecordingSinks::new();
        let engine = Arc::new(
            Engine::builder()
                .store(store.clone())
                .sinks(recording.sinks())
                .build()
                .await
                .expect("engine build"),
        );

        let (event_tx, event_rx) = mpsc::channel(16);
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let runner = EngineRunner::start_with_ticks(engine, event_rx, tick_rx);

        event_tx
            .send(Event {
                id: "evt_1".into(),
                event_type: EventType::FileDeleted,
                title: "File deleted".into(),
                description: "notes.txt".into(),
                timestamp: Utc::now(),
                metadata: EventMetadata::default(),
            })
            .await
            .unwrap();
        tick_tx
            .send(Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap())
            .await
            .unwrap();

        // Closing both channels ends the loops once they drain.
        drop(event_tx);
        drop(tick_tx);
        runner.join().await;

        let stored = load_triggers(store.as_ref(), "triggers.json").await.unwrap();
        assert_eq!(stored[0].trigger_count, 1);
        assert_eq!(stored[1].trigger_count, 1);
        assert_eq!(recording.log().len(), 2);
    }
}
