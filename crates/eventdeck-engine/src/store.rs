//! Typed access to the events and triggers documents.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{EngineError, StoreError, ValidationError};
use crate::traits::DocumentStore;
use crate::types::{Event, EventsDocument, Trigger, TriggersDocument};

async fn load_document<T>(store: &dyn DocumentStore, key: &str) -> Result<T, EngineError>
where
    T: DeserializeOwned + Default,
{
    let Some(value) = store.read(key).await? else {
        return Ok(T::default());
    };
    serde_json::from_value(value).map_err(|e| {
        ValidationError::Document {
            key: key.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

async fn save_document<T: Serialize>(
    store: &dyn DocumentStore,
    key: &str,
    doc: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(doc).map_err(|e| StoreError::Store {
        message: format!("failed to serialize {key}: {e}"),
    })?;
    store.write(key, &value).await
}

/// Read the triggers document. A missing document is an empty list.
///
/// Trigger ids must be unique across the document.
pub async fn load_triggers(
    store: &dyn DocumentStore,
    key: &str,
) -> Result<Vec<Trigger>, EngineError> {
    let doc: TriggersDocument = load_document(store, key).await?;
    crate::editor::ensure_unique_ids(&doc.triggers)?;
    Ok(doc.triggers)
}

/// Overwrite the triggers document with `triggers`.
pub async fn save_triggers(
    store: &dyn DocumentStore,
    key: &str,
    triggers: &[Trigger],
) -> Result<(), StoreError> {
    save_document(
        store,
        key,
        &TriggersDocument {
            triggers: triggers.to_vec(),
        },
    )
    .await
}

/// Read the events document. A missing document is an empty list.
pub async fn load_events(store: &dyn DocumentStore, key: &str) -> Result<Vec<Event>, EngineError> {
    let doc: EventsDocument = load_document(store, key).await?;
    Ok(doc.events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::InMemoryDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_documents_are_empty() {
        let store = InMemoryDocumentStore::new();
        assert!(load_triggers(&store, "triggers.json").await.unwrap().is_empty());
        assert!(load_events(&store, "events.json").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_events_document() {
        let store = InMemoryDocumentStore::with_documents([(
            "events.json".to_string(),
            json!({"events": [{
                "id": "evt_1",
                "type": "file_deleted",
                "title": "File deleted",
                "description": "report.pdf was removed",
                "timestamp": "2024-01-15T10:30:00Z",
                "metadata": {"fileName": "report.pdf"}
            }]}),
        )]);
        let events = load_events(&store, "events.json").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metadata.file_name.as_deref(), Some("report.pdf"));
    }

    #[tokio::test]
    async fn test_malformed_document_is_validation_error() {
        let store = InMemoryDocumentStore::with_documents([(
            "triggers.json".to_string(),
            json!({"triggers": [{"id": "t"}]}),
        )]);
        let err = load_triggers(&store, "triggers.json").await.unwrap_err();
        assert!(
            matches!(err, EngineError::Validation(ValidationError::Document { .. })),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let trigger = json!({
            "id": "trigger_1",
            "name": "t",
            "enabled": true,
            "condition": {"type": "event"},
            "actions": [{"id": "a", "type": "log", "name": "log"}],
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let store = InMemoryDocumentStore::with_documents([(
            "triggers.json".to_string(),
            json!({"triggers": [trigger.clone(), trigger]}),
        )]);
        let err = load_triggers(&store, "triggers.json").await.unwrap_err();
        assert!(err.to_string().contains("duplicate trigger id: trigger_1"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryDocumentStore::new();
        let trigger: Trigger = serde_json::from_value(json!({
            "id": "trigger_1",
            "name": "t",
            "enabled": false,
            "condition": {"type": "timer", "cronExpression": "0 9 * * *"},
            "actions": [{"id": "a", "type": "log", "name": "log"}],
            "createdAt": "2024-01-01T00:00:00Z",
            "triggerCount": 4
        }))
        .unwrap();
        save_triggers(&store, "triggers.json", std::slice::from_ref(&trigger))
            .await
            .unwrap();
        let loaded = load_triggers(&store, "triggers.json").await.unwrap();
        assert_eq!(loaded, vec![trigger]);
    }
}
