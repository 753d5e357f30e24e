//! Data model shared with the activity dashboard.
//!
//! Every type here is `Serialize + Deserialize + Debug + Clone + PartialEq`.
//! Field names on the wire are camelCase because the events and triggers
//! documents are written by the dashboard as well as by the engine. Optional
//! fields are omitted rather than serialized as `null`, so a document parsed
//! and written back keeps the absent-vs-present distinction.

pub mod event;
pub mod triggers;

pub use event::*;
pub use triggers::*;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The events document: `{ "events": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsDocument {
    pub events: Vec<Event>,
}

/// The triggers document: `{ "triggers": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggersDocument {
    pub triggers: Vec<Trigger>,
}
