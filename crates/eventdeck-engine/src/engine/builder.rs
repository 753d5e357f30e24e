//! Engine builder: assembles stores, sinks and config into a running engine.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::{Engine, EngineError, RecentKeys, TickState};
use crate::actions::ReqwestWebhookClient;
use crate::config::EngineConfig;
use crate::defaults::{InMemoryDocumentStore, TracingSink};
use crate::persist::{PersisterConfig, TriggerPersister};
use crate::traits::{DocumentStore, LogSink, MailSink, NotificationSink, WebhookClient};
use crate::triggers::{ActionDispatcher, Sinks};

/// Builder for assembling the [`Engine`].
///
/// All fields are optional; sensible defaults are applied during
/// [`build()`](EngineBuilder::build).
pub struct EngineBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    notifications: Option<Arc<dyn NotificationSink>>,
    mail: Option<Arc<dyn MailSink>>,
    log: Option<Arc<dyn LogSink>>,
    webhooks: Option<Arc<dyn WebhookClient>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(super) fn new() -> Self {
        Self {
            store: None,
            notifications: None,
            mail: None,
            log: None,
            webhooks: None,
            config: EngineConfig::default(),
        }
    }

    /// Set the document store. Default: [`InMemoryDocumentStore`].
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the notification sink. Default: [`TracingSink`].
    pub fn notification_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.notifications = Some(Arc::new(sink));
        self
    }

    /// Set the mail sink. Default: [`TracingSink`].
    pub fn mail_sink(mut self, sink: impl MailSink + 'static) -> Self {
        self.mail = Some(Arc::new(sink));
        self
    }

    /// Set the activity log sink. Default: [`TracingSink`].
    pub fn log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log = Some(Arc::new(sink));
        self
    }

    /// Set the webhook transport. Default: [`ReqwestWebhookClient`] bounded
    /// by the action timeout.
    pub fn webhook_client(mut self, client: impl WebhookClient + 'static) -> Self {
        self.webhooks = Some(Arc::new(client));
        self
    }

    /// Set every sink at once.
    pub fn sinks(mut self, sinks: Sinks) -> Self {
        self.notifications = Some(sinks.notifications);
        self.mail = Some(sinks.mail);
        self.log = Some(sinks.log);
        self.webhooks = Some(sinks.webhooks);
        self
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine: start the persistence writer and load triggers
    /// from the store.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<Engine, EngineError> {
        let config = self.config;
        validate_config(&config)?;

        let store: Arc<dyn DocumentStore> = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let sinks = Sinks {
            notifications: self.notifications.unwrap_or_else(|| Arc::new(TracingSink::new())),
            mail: self.mail.unwrap_or_else(|| Arc::new(TracingSink::new())),
            log: self.log.unwrap_or_else(|| Arc::new(TracingSink::new())),
            webhooks: self
                .webhooks
                .unwrap_or_else(|| Arc::new(ReqwestWebhookClient::new(config.action_timeout()))),
        };

        let dispatcher = Arc::new(ActionDispatcher::new(
            sinks,
            config.action_timeout(),
            config.max_script_statements,
        ));

        let (persister, persister_handle) = TriggerPersister::spawn(
            Arc::clone(&store),
            PersisterConfig {
                key: config.triggers_key.clone(),
                retry_delay: config.persist_retry_delay(),
                retry_interval: config.persist_interval(),
            },
        );

        let engine = Engine {
            store,
            dispatcher,
            triggers: RwLock::new(Vec::new()),
            seen_events: Mutex::new(RecentKeys::new(config.seen_event_capacity)),
            ticks: Mutex::new(TickState::new(config.seen_event_capacity)),
            persister,
            persister_handle: Mutex::new(Some(persister_handle)),
            config,
        };

        if let Err(e) = engine.load().await {
            engine.shutdown().await;
            return Err(e);
        }

        Ok(engine)
    }
}

fn validate_config(config: &EngineConfig) -> Result<(), EngineError> {
    let mut problems = Vec::new();
    if config.action_timeout_ms == 0 {
        problems.push("actionTimeoutMs must be greater than 0");
    }
    if config.persist_interval_ms == 0 {
        problems.push("persistIntervalMs must be greater than 0");
    }
    if config.seen_event_capacity == 0 {
        problems.push("seenEventCapacity must be greater than 0");
    }
    if config.max_script_statements == 0 {
        problems.push("maxScriptStatements must be greater than 0");
    }
    if config.triggers_key.is_empty() || config.events_key.is_empty() {
        problems.push("document keys must not be empty");
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Build {
            message: problems.join("; "),
        })
    }
}
