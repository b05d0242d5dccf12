//! Per-source sync state and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a source's sync lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Counters accumulated over one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub documents_added: u64,
    pub documents_updated: u64,
    pub documents_deleted: u64,
    pub chunks_indexed: u64,
    pub errors: u64,
}

impl SyncStats {
    /// Fold another run's counters into this one.
    pub fn merge(&mut self, other: &SyncStats) {
        self.documents_added += other.documents_added;
        self.documents_updated += other.documents_updated;
        self.documents_deleted += other.documents_deleted;
        self.chunks_indexed += other.chunks_indexed;
        self.errors += other.errors;
    }

    pub fn total_documents(&self) -> u64 {
        self.documents_added + self.documents_updated + self.documents_deleted
    }
}

/// Durable cursor and status for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub source_id: String,
    pub status: SyncStatus,
    /// Opaque provider-defined pagination token, persisted between runs.
    pub cursor: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: SyncStats,
    pub error: Option<String>,
}

impl SyncState {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: SyncStatus::Idle,
            cursor: None,
            started_at: None,
            completed_at: None,
            last_sync_at: None,
            stats: SyncStats::default(),
            error: None,
        }
    }

    /// Transition into the running state at the start of a sync.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.status = SyncStatus::Running;
        self.started_at = Some(now);
        self.completed_at = None;
        self.error = None;
    }

    /// Record a finished run, successful or not.
    pub fn finish(
        &mut self,
        status: SyncStatus,
        stats: SyncStats,
        cursor: Option<String>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.stats = stats;
        if cursor.as_deref().is_some_and(|c| !c.is_empty()) {
            self.cursor = cursor;
        }
        self.error = error;
        self.completed_at = Some(now);
        self.last_sync_at = Some(now);
    }
}

/// Outcome of one `sync_source` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub source_id: String,
    pub success: bool,
    pub stats: SyncStats,
    pub error: Option<String>,
}

impl SyncResult {
    pub fn success(source_id: impl Into<String>, stats: SyncStats) -> Self {
        Self {
            source_id: source_id.into(),
            success: true,
            stats,
            error: None,
        }
    }

    pub fn failure(source_id: impl Into<String>, stats: SyncStats, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            success: false,
            stats,
            error: Some(error.into()),
        }
    }
}
