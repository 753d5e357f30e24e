//! Trigger types: rules pairing a condition with the actions it fires.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventType;

/// What a trigger waits for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// Match incoming events by field predicates.
    Event(EventCondition),
    /// Match clock ticks against a five-field cron schedule.
    Timer(TimerCondition),
}

/// Event-match predicate. Present fields must all hold; absent fields are
/// wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_equals: Option<String>,
}

/// Schedule predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCondition {
    pub cron_expression: String,
    #[serde(default)]
    pub description: String,
}

impl TriggerCondition {
    pub fn is_event(&self) -> bool {
        matches!(self, TriggerCondition::Event(_))
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, TriggerCondition::Timer(_))
    }

    /// Human-readable summary, e.g. `Event type: message_received AND
    /// Contact equals: "Sarah Chen"`.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TriggerCondition {
    /// One-line summary as shown in the trigger list.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCondition::Event(cond) => {
                let mut parts = Vec::new();
                if let Some(ty) = cond.event_type {
                    parts.push(format!("Event type: {ty}"));
                }
                if let Some(ref s) = cond.title_contains {
                    parts.push(format!("Title contains: \"{s}\""));
                }
                if let Some(ref s) = cond.description_contains {
                    parts.push(format!("Description contains: \"{s}\""));
                }
                if let Some(ref s) = cond.contact_equals {
                    parts.push(format!("Contact equals: \"{s}\""));
                }
                if parts.is_empty() {
                    f.write_str("Any event")
                } else {
                    f.write_str(&parts.join(" AND "))
                }
            }
            TriggerCondition::Timer(cond) => write!(f, "Cron: {}", cond.cron_expression),
        }
    }
}

/// Kind of side effect an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Notification,
    Webhook,
    Email,
    Log,
    Custom,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Notification => "notification",
            ActionType::Webhook => "webhook",
            ActionType::Email => "email",
            ActionType::Log => "log",
            ActionType::Custom => "custom",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single side-effecting step of a trigger. The shape of `config`
/// depends on `action_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
}

impl Action {
    /// String-valued config entry, if present.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

/// A stored rule: one condition, one or more actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub condition: TriggerCondition,
    pub actions: Vec<Action>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_count: u64,
}

impl Trigger {
    /// Record a completed firing. `last_triggered` never moves backwards.
    pub fn record_firing(&mut self, at: DateTime<Utc>) {
        self.trigger_count += 1;
        self.last_triggered = Some(match self.last_triggered {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }
}
