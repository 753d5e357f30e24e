//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tunables for the [`Engine`](crate::engine::Engine).
///
/// All fields have sensible defaults via the [`Default`] impl, and missing
/// fields fall back to them when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound for a single action. Default: 10000.
    pub action_timeout_ms: u64,
    /// Delay before the one immediate retry of a failed write. Default: 50.
    pub persist_retry_delay_ms: u64,
    /// How often a still-failing write is retried. Default: 1000.
    pub persist_interval_ms: u64,
    /// Default: `events.json`.
    pub events_key: String,
    /// Default: `triggers.json`.
    pub triggers_key: String,
    /// How many processed event ids are remembered for dedup. Default: 4096.
    pub seen_event_capacity: usize,
    /// Statement limit for custom action scripts. Default: 256.
    pub max_script_statements: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            persist_retry_delay_ms: 50,
            persist_interval_ms: 1_000,
            events_key: "events.json".to_string(),
            triggers_key: "triggers.json".to_string(),
            seen_event_capacity: 4096,
            max_script_statements: 256,
        }
    }
}

impl EngineConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn persist_retry_delay(&self) -> Duration {
        Duration::from_millis(self.persist_retry_delay_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }
}
