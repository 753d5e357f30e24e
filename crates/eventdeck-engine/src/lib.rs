//! EventDeck trigger engine: user-defined rules over the activity feed.
//!
//! A trigger pairs a condition (an event predicate or a cron schedule) with
//! actions: notifications, webhooks, email, log entries and small custom
//! scripts. The [`Engine`] evaluates incoming events and minute ticks,
//! dispatches the actions of every match concurrently, and keeps each
//! trigger's firing counters persisted in the shared triggers document.
//!
//! The engine is designed to be embedded and has no dependencies on UI,
//! web servers or mail transports; those are injected as ports.

pub mod actions;
pub mod config;
pub mod defaults;
pub mod editor;
pub mod engine;
pub mod errors;
pub(crate) mod expression;
pub mod feed;
pub mod persist;
pub mod store;
pub mod template;
pub mod traits;
pub mod triggers;
pub mod types;

// Re-export public types at the crate level.

// actions
pub use actions::{validate_action_config, ActionOutcome, ActionResult, ReqwestWebhookClient};

// config
pub use config::EngineConfig;

// defaults
#[cfg(any(test, feature = "test-support"))]
pub use defaults::{RecordingSinks, StaticWebhookClient};
pub use defaults::{FileDocumentStore, InMemoryDocumentStore, TracingSink};

// editor
pub use editor::{validate_trigger, CronPreset, TriggerDraft, TriggerSet, CRON_PRESETS};

// engine
pub use engine::{ConditionFailure, Engine, EngineBuilder, TickReport};

// errors
pub use errors::{
    ActionError, ConditionError, EngineError, SinkError, StoreError, ValidationError,
};

// feed
pub use feed::{filter_events, EventFilter};

// store
pub use store::{load_events, load_triggers, save_triggers};

// traits
pub use traits::{
    DocumentStore, FiringRecord, LogSink, MailSink, Notification, NotificationSink, OutgoingMail,
    WebhookClient, WebhookRequest, WebhookResponse,
};

// triggers
pub use triggers::{
    ActionDispatcher, CronSchedule, EngineRunner, FiringReport, MinuteClock, Sinks,
};

// types
pub use types::{
    Action, ActionType, Event, EventCondition, EventMetadata, EventType, EventsDocument,
    TimerCondition, Trigger, TriggerCondition, TriggersDocument,
};
