//! Recording sinks and a canned webhook client for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{ActionError, SinkError};
use crate::traits::{
    FiringRecord, LogSink, MailSink, Notification, NotificationSink, OutgoingMail, WebhookClient,
    WebhookRequest, WebhookResponse,
};
use crate::triggers::Sinks;

#[derive(Default)]
struct Recorded {
    notifications: Vec<Notification>,
    mail: Vec<OutgoingMail>,
    log: Vec<FiringRecord>,
    fail_notifications: Option<String>,
    fail_mail: Option<String>,
    fail_log: Option<String>,
    panic_log: bool,
}

/// Captures everything delivered to it. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct RecordingSinks {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Sinks`] bundle delivering into this recorder, with a webhook
    /// client that always answers `200`.
    pub fn sinks(&self) -> Sinks {
        Sinks {
            notifications: Arc::new(self.clone()),
            mail: Arc::new(self.clone()),
            log: Arc::new(self.clone()),
            webhooks: Arc::new(StaticWebhookClient::status(200)),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().notifications.clone()
    }

    pub fn mail(&self) -> Vec<OutgoingMail> {
        self.inner.lock().mail.clone()
    }

    pub fn log(&self) -> Vec<FiringRecord> {
        self.inner.lock().log.clone()
    }

    /// Make every later notification fail with `message`.
    pub fn fail_notifications(&self, message: &str) {
        self.inner.lock().fail_notifications = Some(message.to_string());
    }

    pub fn fail_mail(&self, message: &str) {
        self.inner.lock().fail_mail = Some(message.to_string());
    }

    pub fn fail_log(&self, message: &str) {
        self.inner.lock().fail_log = Some(message.to_string());
    }

    /// Make the log sink panic, killing the action task that calls it.
    pub fn panic_on_log(&self) {
        self.inner.lock().panic_log = true;
    }
}

#[async_trait]
impl NotificationSink for RecordingSinks {
    async fn notify(&self, notification: Notification) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if let Some(msg) = &inner.fail_notifications {
            return Err(SinkError::new(msg.clone()));
        }
        inner.notifications.push(notification);
        Ok(())
    }
}

#[async_trait]
impl MailSink for RecordingSinks {
    async fn send(&self, mail: OutgoingMail) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        if let Some(msg) = &inner.fail_mail {
            return Err(SinkError::new(msg.clone()));
        }
        inner.mail.push(mail);
        Ok(())
    }
}

#[async_trait]
impl LogSink for RecordingSinks {
    async fn append(&self, record: FiringRecord) -> Result<(), SinkError> {
        let panic_log = self.inner.lock().panic_log;
        if panic_log {
            panic!("log sink panicked");
        }
        let mut inner = self.inner.lock();
        if let Some(msg) = &inner.fail_log {
            return Err(SinkError::new(msg.clone()));
        }
        inner.log.push(record);
        Ok(())
    }
}

/// Answers every webhook with a fixed status, optionally after a delay.
#[derive(Clone)]
pub struct StaticWebhookClient {
    status: u16,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<WebhookRequest>>>,
}

impl StaticWebhookClient {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests seen so far, including ones still sleeping.
    pub fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl WebhookClient for StaticWebhookClient {
    async fn send(&self, request: WebhookRequest) -> Result<WebhookResponse, ActionError> {
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(WebhookResponse {
            status: self.status,
            body: String::new(),
        })
    }
}
