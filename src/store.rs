// Task store: the canonical task collection, its transitions and views

use crate::backend::{Backend, validate_key};
use crate::filter::{Filter, Scope};
use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use eyre::{Context, Result, eyre};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Key the task collection is stored under unless configured otherwise
pub const DEFAULT_STORAGE_KEY: &str = "momentum_tasks";

/// A committed mutation, as seen by listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(String),
    Completed(String),
    Deleted(String),
    Recovered(String),
    Reordered(Filter),
    Moved { id: String, filter: Filter },
    Reset,
}

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Change)>;
type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Owns the task collection and writes it through to a [`Backend`]
///
/// Every mutation re-serializes the whole collection and saves it under the
/// store's key. A failed save is logged and leaves the in-memory collection
/// authoritative; [`TaskStore::flush`] retries it.
///
/// Mutations addressed at an unknown id do nothing and return `false`.
pub struct TaskStore<B: Backend> {
    backend: B,
    key: String,
    tasks: Vec<Task>,
    clock: Clock,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    dirty: bool,
    pending_remove: bool,
}

impl<B: Backend> TaskStore<B> {
    /// Load the collection stored under `key`
    ///
    /// A missing, unreadable or malformed blob yields an empty store. Only an
    /// invalid key is an error.
    pub fn open(backend: B, key: &str) -> Result<Self> {
        validate_key(key)?;

        let tasks = match backend.load(key) {
            Ok(Some(blob)) => decode_tasks(&blob),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, error = ?e, "Failed to load tasks, starting empty");
                Vec::new()
            }
        };

        info!(key, count = tasks.len(), "Loaded tasks");

        Ok(Self {
            backend,
            key: key.to_string(),
            tasks,
            clock: Box::new(Utc::now),
            listeners: Vec::new(),
            next_subscription: 0,
            dirty: false,
            pending_remove: false,
        })
    }

    /// Replace the time source used for `createdAt`/`completedAt`/`deletedAt`
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The whole collection, in storage order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// True while the last save failed and has not been retried successfully
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create an active task at the head of `filter`'s list
    ///
    /// Every other active task in the same bucket moves down one place.
    pub fn add(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        due_time: Option<String>,
        filter: Filter,
    ) -> Task {
        for task in self.tasks.iter_mut().filter(|t| t.is_active_in(filter)) {
            task.order += 1;
        }

        let task = Task::new(title, description, due_time, filter, (self.clock)());
        debug!(id = %task.id, %filter, "add: created task");
        self.tasks.push(task.clone());

        self.commit(Change::Added(task.id.clone()));
        task
    }

    /// Mark a task completed, stamping `completedAt` with the current time
    ///
    /// Completing an already completed task refreshes `completedAt`.
    pub fn complete(&mut self, id: &str) -> bool {
        let now = (self.clock)();
        let Some(task) = self.find_mut(id) else {
            debug!(id, "complete: no such task");
            return false;
        };

        task.status = TaskStatus::Completed;
        task.completed_at = Some(now);
        task.deleted_at = None;

        self.commit(Change::Completed(id.to_string()));
        true
    }

    /// Soft-delete a task; its bucket and order are kept for recovery
    pub fn delete(&mut self, id: &str) -> bool {
        let now = (self.clock)();
        let Some(task) = self.find_mut(id) else {
            debug!(id, "delete: no such task");
            return false;
        };

        task.status = TaskStatus::Deleted;
        task.deleted_at = Some(now);
        task.completed_at = None;

        self.commit(Change::Deleted(id.to_string()));
        true
    }

    /// Bring a deleted task back into the bucket it had before deletion
    ///
    /// Only tasks currently `deleted` are recovered.
    pub fn recover(&mut self, id: &str) -> bool {
        let Some(task) = self.find_mut(id) else {
            debug!(id, "recover: no such task");
            return false;
        };
        if task.status != TaskStatus::Deleted {
            debug!(id, status = %task.status, "recover: task is not deleted");
            return false;
        }

        task.status = TaskStatus::Active;
        task.deleted_at = None;

        self.commit(Change::Recovered(id.to_string()));
        true
    }

    /// Set each listed task's `order` to its position in `ordered_ids`
    ///
    /// Unknown ids are skipped. Ids are not checked against `filter`; the
    /// caller passes the ids of that bucket. Returns how many tasks were
    /// updated.
    pub fn reorder<S: AsRef<str>>(&mut self, filter: Filter, ordered_ids: &[S]) -> usize {
        let positions: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        let updates: Vec<(usize, i64)> = ordered_ids
            .iter()
            .enumerate()
            .filter_map(|(order, id)| positions.get(id.as_ref()).map(|&idx| (idx, order as i64)))
            .collect();

        if updates.is_empty() {
            debug!(%filter, "reorder: no known ids");
            return 0;
        }

        for &(idx, order) in &updates {
            self.tasks[idx].order = order;
        }

        self.commit(Change::Reordered(filter));
        updates.len()
    }

    /// Reassign a task's bucket, leaving `order` and `status` alone
    ///
    /// The moved task keeps its old `order`, which may collide with orders
    /// already present in the target bucket.
    pub fn move_to_filter(&mut self, id: &str, filter: Filter) -> bool {
        let Some(task) = self.find_mut(id) else {
            debug!(id, "move_to_filter: no such task");
            return false;
        };

        task.filter = filter;

        self.commit(Change::Moved {
            id: id.to_string(),
            filter,
        });
        true
    }

    /// Drop every task and the persisted blob
    pub fn reset_all(&mut self) {
        self.tasks.clear();

        match self.backend.remove(&self.key) {
            Ok(()) => {
                self.dirty = false;
                self.pending_remove = false;
            }
            Err(e) => {
                warn!(key = %self.key, error = ?e, "Failed to remove stored tasks");
                self.dirty = true;
                self.pending_remove = true;
            }
        }

        info!(key = %self.key, "Reset all tasks");
        self.notify(&Change::Reset);
    }

    /// Retry a failed save, or a failed removal left by `reset_all`
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if self.pending_remove {
            self.backend.remove(&self.key)?;
        } else {
            self.save()?;
        }
        self.dirty = false;
        self.pending_remove = false;
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Active tasks of one bucket, in manual order
    pub fn active_tasks_for(&self, filter: Filter) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.is_active_in(filter)).collect();
        tasks.sort_by_key(|t| t.order);
        tasks
    }

    /// Completed tasks, most recently completed first
    pub fn completed_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .collect();
        tasks.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        tasks
    }

    /// Deleted tasks, most recently deleted first
    pub fn deleted_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Deleted)
            .collect();
        tasks.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        tasks
    }

    /// The task focus mode works on: head of the tomorrow list
    pub fn first_active_tomorrow_task(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_active_in(Filter::Tomorrow))
            .min_by_key(|t| t.order)
    }

    /// Tasks selected by `scope`, in the order the matching view shows them
    pub fn tasks_in(&self, scope: Scope) -> Vec<&Task> {
        match scope {
            Scope::All => self.tasks.iter().collect(),
            Scope::Tomorrow => self.active_tasks_for(Filter::Tomorrow),
            Scope::Later => self.active_tasks_for(Filter::Later),
            Scope::Completed => self.completed_tasks(),
            Scope::Deleted => self.deleted_tasks(),
        }
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener called after every committed mutation
    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Look a task up by full id or by a unique id prefix
    ///
    /// `Ok(None)` when nothing matches. An empty id, or a prefix shared by
    /// several tasks, is an error.
    pub fn find_by_prefix(&self, wanted: &str) -> Result<Option<&Task>> {
        let wanted = wanted.trim();
        if wanted.is_empty() {
            return Err(eyre!("Task id cannot be empty"));
        }
        if let Some(task) = self.get(wanted) {
            return Ok(Some(task));
        }

        let matches: Vec<&Task> = self.tasks.iter().filter(|t| t.id.starts_with(wanted)).collect();
        match matches.as_slice() {
            [] => Ok(None),
            [task] => Ok(Some(*task)),
            _ => Err(eyre!("Id prefix {} matches {} tasks", wanted, matches.len())),
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn commit(&mut self, change: Change) {
        if let Err(e) = self.save() {
            warn!(key = %self.key, error = ?e, "Failed to save tasks, keeping in-memory state");
            self.dirty = true;
        } else {
            self.dirty = false;
            self.pending_remove = false;
        }
        self.notify(&change);
    }

    fn save(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.tasks).context("Failed to serialize tasks")?;
        self.backend.save(&self.key, &blob)
    }

    fn notify(&mut self, change: &Change) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change);
        }
    }
}

/// Decode a stored collection
///
/// Anything other than a JSON array gives an empty collection. Entries that
/// don't decode as tasks, and repeats of an id already seen, are skipped.
/// A `completedAt`/`deletedAt` that contradicts the entry's status is dropped.
pub fn decode_tasks(blob: &str) -> Vec<Task> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(blob) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = ?e, "Stored tasks are not a JSON array, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        let mut task: Task = match serde_json::from_value(value) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse stored task, skipping");
                continue;
            }
        };

        if !seen.insert(task.id.clone()) {
            warn!(index, id = %task.id, "Duplicate task id, skipping");
            continue;
        }

        if task.clear_stale_timestamps() {
            warn!(index, id = %task.id, status = %task.status, "Cleared timestamp not matching status");
        }

        tasks.push(task);
    }

    tasks
}
