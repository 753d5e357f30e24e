//! Error types for the trigger engine and its ports.

use thiserror::Error;

/// A trigger, action or document failed shape or policy checks. Raised at
/// the boundary, before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("invalid trigger '{trigger_id}': {}", .errors.join("; "))]
    Trigger {
        trigger_id: String,
        errors: Vec<String>,
    },
    #[error("duplicate trigger id: {id}")]
    DuplicateTrigger { id: String },
    #[error("unknown trigger: {id}")]
    UnknownTrigger { id: String },
    #[error("malformed document '{key}': {message}")]
    Document { key: String, message: String },
}

/// A trigger condition could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConditionError {
    #[error("invalid cron expression '{expression}': {message}")]
    Cron { expression: String, message: String },
}

/// A single action failed. Recoverable: recorded in the firing report and
/// never propagated to sibling actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ActionError {
    #[error("action config error: {message}")]
    Config { message: String },
    #[error("action timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("webhook error: {message}")]
    Webhook { message: String },
    #[error("sink error: {message}")]
    Sink { message: String },
    #[error("script error: {message}")]
    Script { message: String },
}

/// Errors from [`DocumentStore`](super::traits::DocumentStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("document not found: {key}")]
    NotFound { key: String },
    #[error("document store error: {message}")]
    Store { message: String },
}

/// Errors from the sink ports ([`NotificationSink`](super::traits::NotificationSink),
/// [`MailSink`](super::traits::MailSink), [`LogSink`](super::traits::LogSink)).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from [`Engine`](super::engine::Engine) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("build error: {message}")]
    Build { message: String },
}
