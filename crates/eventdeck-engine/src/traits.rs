//! Port interfaces for everything the engine does not own.
//!
//! The engine only calls these; their lifecycle belongs to whoever builds
//! the [`Engine`](crate::engine::Engine). Default implementations live in
//! [`defaults`](crate::defaults).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::*;
use super::types::EventType;

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Whole-document storage shared with the dashboard.
///
/// Reads and writes always cover an entire JSON document. A `write` is
/// expected to be atomic at that granularity; there are no partial updates.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a document exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Read a document. Returns `None` if it doesn't exist.
    async fn read(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite a document. `Ok` is the commit acknowledgement.
    async fn write(&self, key: &str, document: &Value) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub trigger_id: String,
    pub action_id: String,
    pub event_id: String,
    pub message: String,
}

/// Where notifications go (desktop toast, push service, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// MailSink
// ---------------------------------------------------------------------------

/// A rendered email handed off for sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub trigger_id: String,
    pub action_id: String,
    pub event_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport.
#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Structured record of one action firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringRecord {
    pub trigger_id: String,
    pub trigger_name: String,
    pub action_id: String,
    pub action_name: String,
    pub event_id: String,
    pub event_type: EventType,
    pub event_title: String,
    pub fired_at: DateTime<Utc>,
    /// Rendered `config.message`, when the log action has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only activity log.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, record: FiringRecord) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// WebhookClient
// ---------------------------------------------------------------------------

/// An outbound webhook call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    /// Upper-case HTTP method.
    pub method: String,
    pub headers: Vec<(String, String)>,
    /// JSON body; `None` for methods that don't carry one.
    pub body: Option<Value>,
}

/// What came back from a webhook call that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP transport for webhook actions.
///
/// Implementations return `Ok` for any response that arrived, whatever the
/// status; the dispatcher decides what counts as success.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn send(&self, request: WebhookRequest) -> Result<WebhookResponse, ActionError>;
}
