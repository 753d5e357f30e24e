//! Default implementations for the engine's ports.
//!
//! These let the engine start with zero external configuration. Each can
//! be replaced via the [`EngineBuilder`](crate::engine::EngineBuilder).

pub mod file_store;
pub mod in_memory_store;
#[cfg(any(test, feature = "test-support"))]
pub mod recording;
pub mod tracing_sink;

pub use file_store::FileDocumentStore;
pub use in_memory_store::InMemoryDocumentStore;
#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordingSinks, StaticWebhookClient};
pub use tracing_sink::TracingSink;
