//! SQLite adapters for the durable stores and the task queue.
//!
//! Conventions: timestamps are RFC 3339 strings, structured fields are JSON
//! text, booleans are integers. Row structs derive `FromRow` and convert to
//! domain models through `row_to_*` helpers.

mod chunk_store;
mod connection;
mod document_store;
mod installation_store;
mod migrations;
mod schedule_store;
mod session_store;
mod source_store;
mod sync_state_store;
mod task_queue;
mod user_store;

pub use chunk_store::SqliteChunkStore;
pub use connection::DatabaseConnection;
pub use document_store::SqliteDocumentStore;
pub use installation_store::SqliteInstallationStore;
pub use schedule_store::SqliteScheduleStore;
pub use session_store::SqliteSessionStore;
pub use source_store::SqliteSourceStore;
pub use sync_state_store::SqliteSyncStateStore;
pub use task_queue::SqliteTaskQueue;
pub use user_store::SqliteUserStore;

use chrono::{DateTime, Utc};

use crate::domain::errors::{CoreError, CoreResult};

pub(crate) fn parse_datetime(raw: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| CoreError::Serialization(format!("bad timestamp {raw:?}: {err}")))
}

pub(crate) fn parse_optional_datetime(raw: Option<String>) -> CoreResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_datetime).transpose()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> CoreResult<String> {
    serde_json::to_string(value).map_err(CoreError::from)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> CoreResult<T> {
    serde_json::from_str(raw).map_err(CoreError::from)
}
