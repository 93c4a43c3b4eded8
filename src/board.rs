//! The task board: authoritative task collection plus its history ledger.
//!
//! One `RwLock` covers both collections. Mutations take the write lock for
//! the whole read-diff-append-persist sequence, so concurrent updates never
//! interleave and readers never see a half-applied update.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::history::{HistoryEntry, HistoryLedger};
use crate::storage::Storage;
use crate::task::{self, FieldChange, NewTask, Task, TaskPatch};

#[derive(Debug)]
struct BoardState {
    tasks: Vec<Task>,
    history: HistoryLedger,
    /// Never decreases while the process runs
    next_id: u64,
}

impl BoardState {
    fn position(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }
}

#[derive(Debug)]
pub struct TaskBoard {
    storage: Storage,
    state: RwLock<BoardState>,
}

impl TaskBoard {
    /// Load both documents from `storage`.
    ///
    /// Missing documents start empty; unreadable or corrupt ones are an error.
    pub fn open(storage: Storage) -> Result<Self> {
        let tasks = storage.load_tasks()?;
        let history = HistoryLedger::from_entries(storage.load_history()?);

        let max_task = tasks.iter().map(|task| task.id).max().unwrap_or(0);
        let max_history = history.max_task_id().unwrap_or(0);
        let next_id = max_task.max(max_history) + 1;

        info!(
            tasks = tasks.len(),
            history = history.len(),
            next_id,
            "opened task board at {}",
            storage.data_dir().display()
        );

        Ok(Self {
            storage,
            state: RwLock::new(BoardState {
                tasks,
                history,
                next_id,
            }),
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BoardState>> {
        self.state
            .read()
            .map_err(|_| Error::OperationFailed("task board lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BoardState>> {
        self.state
            .write()
            .map_err(|_| Error::OperationFailed("task board lock poisoned".to_string()))
    }

    /// All tasks in insertion order
    pub fn list(&self) -> Result<Vec<Task>> {
        Ok(self.read()?.tasks.clone())
    }

    pub fn get(&self, id: u64) -> Result<Task> {
        let state = self.read()?;
        state
            .position(id)
            .map(|idx| state.tasks[idx].clone())
            .ok_or(Error::TaskNotFound(id))
    }

    /// Create a task with the next identifier and today's start date
    pub fn create(&self, new: NewTask) -> Result<Task> {
        self.create_with_start(new, task::today())
    }

    fn create_with_start(&self, new: NewTask, start_time: String) -> Result<Task> {
        let mut state = self.write()?;
        let id = state.next_id;
        state.next_id += 1;

        let task = Task::from_new(id, new, start_time);
        state.tasks.push(task.clone());
        debug!(id, title = %task.title, "created task");

        self.persist_tasks(&state.tasks)?;
        Ok(task)
    }

    /// Apply the fields of `patch` that differ from the task's current values.
    ///
    /// Each change is recorded in the ledger and applied to the task before
    /// the next one is diffed in. Both documents are written once at the end;
    /// a failed write leaves the ledger and the task in step in memory.
    pub fn update(&self, id: u64, patch: &TaskPatch) -> Result<Task> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let idx = state.position(id).ok_or(Error::TaskNotFound(id))?;

        let changes = state.tasks[idx].diff(patch);
        if changes.is_empty() {
            return Ok(state.tasks[idx].clone());
        }

        let now = Utc::now();
        for change in changes {
            let entry = HistoryEntry::new(id, Some(&state.tasks[idx]), &change, now);
            debug!(
                task_id = id,
                field = %change.field,
                old = %change.old_value,
                new = %change.new_value,
                "recorded change"
            );
            state.history.append(entry);

            let FieldChange {
                field, new_value, ..
            } = change;
            state.tasks[idx].set_field(field, new_value);
        }

        let history_saved = self
            .storage
            .save_history(state.history.entries())
            .inspect_err(|err| error!("failed to persist history: {err}"));
        let tasks_saved = self.persist_tasks(&state.tasks);
        history_saved.and(tasks_saved)?;
        Ok(state.tasks[idx].clone())
    }

    /// Remove a task. Its history stays in the ledger.
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut state = self.write()?;
        let idx = state.position(id).ok_or(Error::TaskNotFound(id))?;
        state.tasks.remove(idx);
        debug!(id, "deleted task");

        self.persist_tasks(&state.tasks)
    }

    /// Ledger entries for one task identifier, oldest first.
    ///
    /// Works for deleted and never-existing identifiers alike.
    pub fn history_for_task(&self, id: u64) -> Result<Vec<HistoryEntry>> {
        Ok(self.read()?.history.for_task(id))
    }

    /// The whole ledger, oldest first
    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.read()?.history.entries().to_vec())
    }

    fn persist_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.storage
            .save_tasks(tasks)
            .inspect_err(|err| error!("failed to persist tasks: {err}"))
    }
}
