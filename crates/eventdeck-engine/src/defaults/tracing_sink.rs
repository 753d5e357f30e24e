//! Sinks backed by the `tracing` crate.
//!
//! The default when no real transport is configured: notifications, mail
//! and firing records all become structured `tracing` events under the
//! `eventdeck::activity` target.

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::traits::{FiringRecord, LogSink, MailSink, Notification, NotificationSink, OutgoingMail};

/// Emits every delivery as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, notification: Notification) -> Result<(), SinkError> {
        tracing::info!(
            target: "eventdeck::activity",
            trigger_id = %notification.trigger_id,
            action_id = %notification.action_id,
            event_id = %notification.event_id,
            message = %notification.message,
            "notification"
        );
        Ok(())
    }
}

#[async_trait]
impl MailSink for TracingSink {
    async fn send(&self, mail: OutgoingMail) -> Result<(), SinkError> {
        tracing::info!(
            target: "eventdeck::activity",
            trigger_id = %mail.trigger_id,
            action_id = %mail.action_id,
            event_id = %mail.event_id,
            to = %mail.to,
            subject = %mail.subject,
            "email"
        );
        Ok(())
    }
}

#[async_trait]
impl LogSink for TracingSink {
    async fn append(&self, record: FiringRecord) -> Result<(), SinkError> {
        tracing::info!(
            target: "eventdeck::activity",
            trigger_id = %record.trigger_id,
            trigger_name = %record.trigger_name,
            action_id = %record.action_id,
            event_id = %record.event_id,
            event_type = %record.event_type,
            fired_at = %record.fired_at.to_rfc3339(),
            message = record.message.as_deref().unwrap_or_default(),
            "trigger fired"
        );
        Ok(())
    }
}
