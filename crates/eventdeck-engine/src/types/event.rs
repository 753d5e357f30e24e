//! Events: immutable records of something that happened.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of event kinds produced by the dashboard's sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MessageReceived,
    ThreadStarted,
    FileAltered,
    FileDeleted,
    AppInstalled,
    ContactRequest,
    EmailReceived,
    CronExecuted,
}

impl EventType {
    /// Every event type, in dashboard display order.
    pub const ALL: [EventType; 8] = [
        EventType::MessageReceived,
        EventType::ThreadStarted,
        EventType::FileAltered,
        EventType::FileDeleted,
        EventType::AppInstalled,
        EventType::ContactRequest,
        EventType::EmailReceived,
        EventType::CronExecuted,
    ];

    /// Wire name, e.g. `message_received`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MessageReceived => "message_received",
            EventType::ThreadStarted => "thread_started",
            EventType::FileAltered => "file_altered",
            EventType::FileDeleted => "file_deleted",
            EventType::AppInstalled => "app_installed",
            EventType::ContactRequest => "contact_request",
            EventType::EmailReceived => "email_received",
            EventType::CronExecuted => "cron_executed",
        }
    }

    /// Human label used by the dashboard's filter chips.
    pub fn label(&self) -> &'static str {
        match self {
            EventType::MessageReceived => "Messages",
            EventType::ThreadStarted => "New Threads",
            EventType::FileAltered => "File Changes",
            EventType::FileDeleted => "File Deletions",
            EventType::AppInstalled => "App Installs",
            EventType::ContactRequest => "Contact Requests",
            EventType::EmailReceived => "Emails",
            EventType::CronExecuted => "Scheduled Jobs",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional string fields attached to an event. Which ones are set depends
/// on the event type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,
}

impl EventMetadata {
    /// Look up a field by its wire name (`contact`, `fileName`, ...).
    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "contact" => &self.contact,
            "threadId" => &self.thread_id,
            "fileName" => &self.file_name,
            "filePath" => &self.file_path,
            "appName" => &self.app_name,
            "appVersion" => &self.app_version,
            "sender" => &self.sender,
            "subject" => &self.subject,
            "cronExpression" => &self.cron_expression,
            "executionTime" => &self.execution_time,
            "triggerName" => &self.trigger_name,
            _ => return None,
        };
        value.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Something that happened. Created by producers outside the engine and
/// never modified by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "EventMetadata::is_empty")]
    pub metadata: EventMetadata,
}
