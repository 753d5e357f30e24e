//! Action dispatch.
//!
//! Runs every action of a firing in its own tokio task with a timeout, and
//! collects one [`ActionResult`] per action in declaration order. A failed,
//! timed-out or panicking action never stops its siblings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::{millis, messaging, webhook, ActionOutcome, ActionResult, Script};
use crate::errors::ActionError;
use crate::traits::{LogSink, MailSink, NotificationSink, WebhookClient};
use crate::types::{Action, ActionType, Event, Trigger};

/// The external capabilities actions deliver through.
#[derive(Clone)]
pub struct Sinks {
    pub notifications: Arc<dyn NotificationSink>,
    pub mail: Arc<dyn MailSink>,
    pub log: Arc<dyn LogSink>,
    pub webhooks: Arc<dyn WebhookClient>,
}

/// Outcome of one trigger firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringReport {
    pub trigger_id: String,
    pub event_id: String,
    pub fired_at: DateTime<Utc>,
    /// One entry per action, in the trigger's action order.
    pub results: Vec<ActionResult>,
    /// Actions whose task died (panic or abort) instead of returning.
    pub faulted: usize,
}

impl FiringReport {
    /// A firing counts when at least one action ran to a result, success
    /// or failure, without an engine-level fault.
    pub fn completed(&self) -> bool {
        self.faulted < self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

/// Executes actions against their sinks.
pub struct ActionDispatcher {
    sinks: Sinks,
    action_timeout: Duration,
    max_script_statements: usize,
}

impl ActionDispatcher {
    /// Create a new dispatcher.
    ///
    /// - `sinks`: delivery capabilities, owned by the caller
    /// - `action_timeout`: upper bound for any single action
    /// - `max_script_statements`: size limit for custom scripts
    pub fn new(sinks: Sinks, action_timeout: Duration, max_script_statements: usize) -> Self {
        Self {
            sinks,
            action_timeout,
            max_script_statements,
        }
    }

    /// Run a single action, bounded by the action timeout.
    pub async fn dispatch(
        &self,
        trigger: &Trigger,
        action: &Action,
        event: &Event,
        fired_at: DateTime<Utc>,
    ) -> ActionResult {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.action_timeout,
            self.run_action(trigger, action, event, fired_at),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ActionError::Timeout {
                elapsed_ms: millis(self.action_timeout),
            })
        });

        let outcome = match result {
            Ok(detail) => ActionOutcome::Success { detail },
            Err(e) => {
                tracing::warn!(
                    trigger_id = %trigger.id,
                    action_id = %action.id,
                    action_type = %action.action_type,
                    error = %e,
                    "action failed"
                );
                ActionOutcome::Failure {
                    error: e.to_string(),
                }
            }
        };

        ActionResult {
            action_id: action.id.clone(),
            action_type: action.action_type,
            outcome,
            elapsed_ms: millis(started.elapsed()),
        }
    }

    /// Run every action of `trigger` concurrently and wait for all of them.
    pub async fn dispatch_all(
        self: &Arc<Self>,
        trigger: &Trigger,
        event: &Event,
        fired_at: DateTime<Utc>,
    ) -> FiringReport {
        let shared_trigger = Arc::new(trigger.clone());
        let shared_event = Arc::new(event.clone());

        let handles: Vec<_> = trigger
            .actions
            .iter()
            .cloned()
            .map(|action| {
                let dispatcher = Arc::clone(self);
                let trigger = Arc::clone(&shared_trigger);
                let event = Arc::clone(&shared_event);
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(&trigger, &action, &event, fired_at)
                        .await
                })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let mut faulted = 0;
        let results: Vec<ActionResult> = joined
            .into_iter()
            .zip(&trigger.actions)
            .map(|(joined, action)| match joined {
                Ok(result) => result,
                Err(e) => {
                    faulted += 1;
                    tracing::error!(
                        trigger_id = %trigger.id,
                        action_id = %action.id,
                        "action task aborted: {e}"
                    );
                    ActionResult {
                        action_id: action.id.clone(),
                        action_type: action.action_type,
                        outcome: ActionOutcome::Failure {
                            error: format!("action task aborted: {e}"),
                        },
                        elapsed_ms: 0,
                    }
                }
            })
            .collect();

        FiringReport {
            trigger_id: trigger.id.clone(),
            event_id: event.id.clone(),
            fired_at,
            results,
            faulted,
        }
    }

    async fn run_action(
        &self,
        trigger: &Trigger,
        action: &Action,
        event: &Event,
        fired_at: DateTime<Utc>,
    ) -> Result<String, ActionError> {
        match action.action_type {
            ActionType::Notification => {
                let notification = messaging::notification(trigger, action, event)?;
                let message = notification.message.clone();
                self.sinks
                    .notifications
                    .notify(notification)
                    .await
                    .map_err(messaging::sink_err)?;
                Ok(format!("notified: {message}"))
            }
            ActionType::Webhook => {
                let request = webhook::build_request(trigger, action, event)?;
                webhook::deliver(self.sinks.webhooks.as_ref(), request).await
            }
            ActionType::Email => {
                let mail = messaging::mail(trigger, action, event)?;
                let to = mail.to.clone();
                self.sinks.mail.send(mail).await.map_err(messaging::sink_err)?;
                Ok(format!("mail queued for {to}"))
            }
            ActionType::Log => {
                let record = messaging::firing_record(trigger, action, event, fired_at);
                self.sinks.log.append(record).await.map_err(messaging::sink_err)?;
                Ok("logged".to_string())
            }
            ActionType::Custom => {
                let source = action.config_str("script").ok_or_else(|| ActionError::Config {
                    message: "missing required config field: script".into(),
                })?;
                let script = Script::parse(source, self.max_script_statements)?;
                let output = script.run(event)?;
                Ok(output.join("\n"))
            }
        }
    }
}
