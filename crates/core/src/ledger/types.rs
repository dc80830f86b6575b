//! Ledger data types and the task status state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database unreachable or statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The requested status change is not part of the lifecycle graph.
    #[error("Cannot move task {task_id} from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Lifecycle status of a task.
///
/// ```text
/// pending ──> uploading ──> success ──> archived
///                 │  ^
///                 v  │
///               failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Uploading,
    Success,
    Failed,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Uploading => "uploading",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Archived => "archived",
        }
    }

    /// Whether `self -> next` is a legal lifecycle step.
    ///
    /// `uploading -> uploading` is allowed so an upload interrupted by a
    /// process exit can be restarted.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        match self {
            Pending => matches!(next, Uploading),
            Uploading => matches!(next, Uploading | Success | Failed),
            Failed => matches!(next, Uploading),
            Success => matches!(next, Archived),
            Archived => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "uploading" => Ok(TaskStatus::Uploading),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            "archived" => Ok(TaskStatus::Archived),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// One tracked torrent payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Info hash; never reused for a different payload.
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every status write; governs retention of archived rows.
    pub updated_at: DateTime<Utc>,
}
