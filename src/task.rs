// Task record

use crate::filter::Filter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task as stored in the persisted document
///
/// Field names follow the stored JSON layout (`dueTime`, `createdAt`, ...).
/// Optional fields are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    pub filter: Filter,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order: i64,
}

impl Task {
    /// Build a fresh active task at the head of its bucket
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due_time: Option<String>,
        filter: Filter,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            due_time,
            filter,
            status: TaskStatus::Active,
            created_at: now,
            completed_at: None,
            deleted_at: None,
            order: 0,
        }
    }

    pub fn is_active_in(&self, filter: Filter) -> bool {
        self.status == TaskStatus::Active && self.filter == filter
    }

    /// Drop a `completedAt`/`deletedAt` that doesn't match `status`
    ///
    /// Returns true if anything was cleared.
    pub fn clear_stale_timestamps(&mut self) -> bool {
        let mut cleared = false;
        if self.status != TaskStatus::Completed && self.completed_at.take().is_some() {
            cleared = true;
        }
        if self.status != TaskStatus::Deleted && self.deleted_at.take().is_some() {
            cleared = true;
        }
        cleared
    }
}

/// Fresh task id (UUIDv7, so ids also sort by creation time)
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
