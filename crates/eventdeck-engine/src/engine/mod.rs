//! The trigger engine: the single entry point for evaluating triggers.
//!
//! The [`Engine`] owns the in-memory trigger list, matches incoming events
//! and clock ticks against it, dispatches actions, and hands updated
//! counters to the persistence writer. Construct via [`Engine::builder()`].
//!
//! ```rust,ignore
//! let engine = Engine::builder()
//!     .store(Arc::new(FileDocumentStore::new(data_dir)?))
//!     .notification_sink(DesktopNotifier::new())
//!     .build()
//!     .await?;
//!
//! let reports = engine.handle_event(&event).await;
//! ```

mod builder;

pub use builder::EngineBuilder;
pub use crate::errors::EngineError;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::editor::TriggerSet;
use crate::errors::{ConditionError, ValidationError};
use crate::persist::{PersisterHandle, TriggerPersister};
use crate::store::load_triggers;
use crate::traits::DocumentStore;
use crate::triggers::{condition, truncate_to_minute, ActionDispatcher, FiringReport};
use crate::types::{Event, EventMetadata, EventType, TimerCondition, Trigger, TriggerCondition};

/// A timer trigger whose condition could not be evaluated on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFailure {
    pub trigger_id: String,
    pub error: ConditionError,
}

/// Everything that happened on one clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// The tick, truncated to the minute.
    pub at: DateTime<Utc>,
    pub firings: Vec<FiringReport>,
    pub condition_errors: Vec<ConditionFailure>,
}

/// Insertion-ordered set that forgets its oldest keys past `capacity`.
#[derive(Debug)]
pub(super) struct RecentKeys {
    order: VecDeque<String>,
    keys: HashSet<String>,
    capacity: usize,
}

impl RecentKeys {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            keys: HashSet::new(),
            capacity,
        }
    }

    /// Returns `false` if `key` was already present.
    fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_string());
        self.order.push_back(key.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        true
    }
}

/// State owned by the tick path.
#[derive(Debug)]
pub(super) struct TickState {
    fired: RecentKeys,
    /// Trigger id to the malformed expression already reported for it.
    warned: HashMap<String, String>,
}

impl TickState {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            fired: RecentKeys::new(capacity),
            warned: HashMap::new(),
        }
    }
}

/// The assembled, running trigger engine.
///
/// Event arrivals and clock ticks are each serialized by their own lock, so
/// an event and a tick may be processed at the same time but two events
/// never are.
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) store: Arc<dyn DocumentStore>,
    pub(super) dispatcher: Arc<ActionDispatcher>,
    pub(super) triggers: RwLock<Vec<Trigger>>,
    pub(super) seen_events: Mutex<RecentKeys>,
    pub(super) ticks: Mutex<TickState>,
    pub(super) persister: TriggerPersister,
    pub(super) persister_handle: Mutex<Option<PersisterHandle>>,
}

impl Engine {
    /// Create a new [`EngineBuilder`].
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Replace the in-memory list with the stored triggers document.
    ///
    /// A missing document loads as an empty list. Returns the number of
    /// triggers loaded.
    pub async fn load(&self) -> Result<usize, EngineError> {
        let loaded = load_triggers(self.store.as_ref(), &self.config.triggers_key).await?;
        let count = loaded.len();
        *self.triggers.write().await = loaded;
        tracing::info!(triggers = count, "triggers loaded");
        Ok(count)
    }

    /// Snapshot of the current trigger list, in stored order.
    pub async fn triggers(&self) -> Vec<Trigger> {
        self.triggers.read().await.clone()
    }

    pub async fn trigger(&self, id: &str) -> Option<Trigger> {
        self.triggers.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Apply an editor change to the trigger list and persist the result.
    ///
    /// The change is all-or-nothing: if `f` returns an error the list is
    /// left untouched.
    pub async fn edit<F, R>(&self, f: F) -> Result<R, ValidationError>
    where
        F: FnOnce(&mut TriggerSet) -> Result<R, ValidationError>,
    {
        let mut triggers = self.triggers.write().await;
        let mut set = TriggerSet::new(triggers.clone())?;
        let result = f(&mut set)?;
        *triggers = set.into_inner();
        self.persister.submit(triggers.clone());
        Ok(result)
    }

    /// Evaluate every enabled event trigger against `event` and fire the
    /// ones that match.
    ///
    /// An event id this engine has already processed is ignored.
    pub async fn handle_event(&self, event: &Event) -> Vec<FiringReport> {
        let mut seen = self.seen_events.lock().await;
        if !seen.insert(&event.id) {
            tracing::debug!(event_id = %event.id, "skipping already processed event");
            return Vec::new();
        }

        let now = Utc::now();
        let matched: Vec<Trigger> = {
            let triggers = self.triggers.read().await;
            triggers
                .iter()
                .filter(|t| t.enabled && t.condition.is_event())
                .filter(|t| match condition::matches(t, event, now) {
                    Ok(matched) => matched,
                    Err(e) => {
                        tracing::warn!(trigger_id = %t.id, error = %e, "condition failed");
                        false
                    }
                })
                .cloned()
                .collect()
        };

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            matched = matched.len(),
            "event evaluated"
        );

        let firings = matched.into_iter().map(|t| (t, event.clone())).collect();
        self.fire(firings, now).await
    }

    /// Fire every enabled timer trigger whose schedule includes `now`.
    ///
    /// A repeated tick for the same minute does not fire a trigger twice.
    pub async fn handle_tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut ticks = self.ticks.lock().await;
        let minute = truncate_to_minute(now);

        let timers: Vec<Trigger> = self
            .triggers
            .read()
            .await
            .iter()
            .filter(|t| t.enabled && t.condition.is_timer())
            .cloned()
            .collect();

        let mut firings = Vec::new();
        let mut condition_errors = Vec::new();
        for trigger in timers {
            let TriggerCondition::Timer(ref timer) = trigger.condition else {
                continue;
            };
            match condition::matches_tick(&trigger, minute) {
                Ok(true) => {
                    ticks.warned.remove(&trigger.id);
                    let key = format!("cron:{}:{}", trigger.id, minute.timestamp() / 60);
                    if !ticks.fired.insert(&key) {
                        tracing::debug!(key = %key, "skipping duplicate tick");
                        continue;
                    }
                    let event = tick_event(&trigger, timer, minute);
                    firings.push((trigger, event));
                }
                Ok(false) => {
                    ticks.warned.remove(&trigger.id);
                }
                Err(error) => {
                    let already_warned = ticks
                        .warned
                        .get(&trigger.id)
                        .is_some_and(|expr| *expr == timer.cron_expression);
                    if !already_warned {
                        tracing::warn!(trigger_id = %trigger.id, error = %error, "skipping timer trigger");
                        ticks
                            .warned
                            .insert(trigger.id.clone(), timer.cron_expression.clone());
                    }
                    condition_errors.push(ConditionFailure {
                        trigger_id: trigger.id.clone(),
                        error,
                    });
                }
            }
        }

        let firings = self.fire(firings, minute).await;
        TickReport {
            at: minute,
            firings,
            condition_errors,
        }
    }

    /// Dispatch all firings concurrently, then record the completed ones.
    async fn fire(&self, firings: Vec<(Trigger, Event)>, fired_at: DateTime<Utc>) -> Vec<FiringReport> {
        if firings.is_empty() {
            return Vec::new();
        }

        let reports = futures::future::join_all(
            firings
                .iter()
                .map(|(trigger, event)| self.dispatcher.dispatch_all(trigger, event, fired_at)),
        )
        .await;

        for report in &reports {
            tracing::info!(
                trigger_id = %report.trigger_id,
                event_id = %report.event_id,
                actions = report.results.len(),
                failed = report.failures().count(),
                faulted = report.faulted,
                "trigger fired"
            );
        }

        self.record_firings(&reports).await;
        reports
    }

    /// Bump counters for every completed firing and persist the list.
    async fn record_firings(&self, reports: &[FiringReport]) {
        let mut triggers = self.triggers.write().await;
        let mut changed = false;
        for report in reports {
            if !report.completed() {
                tracing::error!(
                    trigger_id = %report.trigger_id,
                    "every action faulted, firing not counted"
                );
                continue;
            }
            // The trigger may have been deleted while its actions ran.
            if let Some(trigger) = triggers.iter_mut().find(|t| t.id == report.trigger_id) {
                trigger.record_firing(report.fired_at);
                changed = true;
            }
        }
        if changed {
            self.persister.submit(triggers.clone());
        }
    }

    /// Flush pending writes and stop the persistence writer.
    ///
    /// The engine still evaluates triggers afterwards, but nothing more is
    /// persisted.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.persister_handle.lock().await.take() {
            handle.shutdown().await;
        }
    }
}

/// The event handed to the actions of a timer trigger.
fn tick_event(trigger: &Trigger, timer: &TimerCondition, minute: DateTime<Utc>) -> Event {
    let description = if timer.description.is_empty() {
        format!("Scheduled trigger ran ({})", timer.cron_expression)
    } else {
        timer.description.clone()
    };
    Event {
        id: format!("cron_{}_{}", trigger.id, minute.timestamp()),
        event_type: EventType::CronExecuted,
        title: format!("Cron: {}", trigger.name),
        description,
        timestamp: minute,
        metadata: EventMetadata {
            cron_expression: Some(timer.cron_expression.clone()),
            execution_time: Some(minute.to_rfc3339()),
            trigger_name: Some(trigger.name.clone()),
            ..Default::default()
        },
    }
}
