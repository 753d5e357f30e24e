//! Notification, email and log actions: render templates, hand off to a sink.

use chrono::{DateTime, Utc};

use crate::errors::{ActionError, SinkError};
use crate::template;
use crate::traits::{FiringRecord, Notification, OutgoingMail};
use crate::types::{Action, Event, Trigger};

fn required<'a>(action: &'a Action, key: &str) -> Result<&'a str, ActionError> {
    action.config_str(key).ok_or_else(|| ActionError::Config {
        message: format!("missing required config field: {key}"),
    })
}

pub(crate) fn sink_err(e: SinkError) -> ActionError {
    ActionError::Sink { message: e.message }
}

/// Render `config.message` into a [`Notification`].
pub fn notification(
    trigger: &Trigger,
    action: &Action,
    event: &Event,
) -> Result<Notification, ActionError> {
    let message = template::render(required(action, "message")?, event);
    Ok(Notification {
        trigger_id: trigger.id.clone(),
        action_id: action.id.clone(),
        event_id: event.id.clone(),
        message,
    })
}

/// Render `config.to`, `config.subject` and `config.body` into an
/// [`OutgoingMail`]. The body falls back to the event description.
pub fn mail(trigger: &Trigger, action: &Action, event: &Event) -> Result<OutgoingMail, ActionError> {
    let to = template::render(required(action, "to")?, event);
    if to.trim().is_empty() {
        return Err(ActionError::Config {
            message: "email recipient rendered empty".into(),
        });
    }
    let subject = template::render(action.config_str("subject").unwrap_or("{{event.title}}"), event);
    let body = template::render(
        action.config_str("body").unwrap_or("{{event.description}}"),
        event,
    );
    Ok(OutgoingMail {
        trigger_id: trigger.id.clone(),
        action_id: action.id.clone(),
        event_id: event.id.clone(),
        to,
        subject,
        body,
    })
}

/// Build the structured log record for a firing.
pub fn firing_record(
    trigger: &Trigger,
    action: &Action,
    event: &Event,
    fired_at: DateTime<Utc>,
) -> FiringRecord {
    FiringRecord {
        trigger_id: trigger.id.clone(),
        trigger_name: trigger.name.clone(),
        action_id: action.id.clone(),
        action_name: action.name.clone(),
        event_id: event.id.clone(),
        event_type: event.event_type,
        event_title: event.title.clone(),
        fired_at,
        message: action
            .config_str("message")
            .map(|m| template::render(m, event)),
    }
}
