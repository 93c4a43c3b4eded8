//! Storage layer for taskboard
//!
//! Two independently flushed JSON documents live in the data directory:
//!
//! ```text
//! <data_dir>/
//!   tasks.json          # task collection, insertion order
//!   task_history.json   # history ledger, chronological
//!   taskboard.lock      # held while a process owns the directory
//! ```
//!
//! Both are pretty-printed arrays so they diff cleanly. A missing document
//! loads as an empty collection; any other read failure is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::history::HistoryEntry;
use crate::lock;
use crate::task::Task;

/// File-backed codec for the task and history documents
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
    tasks_path: PathBuf,
    history_path: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf, tasks_path: PathBuf, history_path: PathBuf) -> Self {
        Self {
            data_dir,
            tasks_path,
            history_path,
        }
    }

    /// Storage using the default file names inside `data_dir`
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&StorageConfig {
            data_dir: data_dir.into(),
            ..StorageConfig::default()
        })
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.data_dir.clone(),
            config.tasks_path(),
            config.history_path(),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        load_collection(&self.tasks_path)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        save_collection(&self.tasks_path, tasks)
    }

    pub fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        load_collection(&self.history_path)
    }

    pub fn save_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        save_collection(&self.history_path, entries)
    }
}

/// Read a JSON array from `path`.
///
/// A missing or blank file yields an empty collection.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<T>> = serde_json::from_str(&content)?;
    Ok(records.unwrap_or_default())
}

/// Overwrite `path` with `records` as indented JSON
pub fn save_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    lock::write_atomic(path, json.as_bytes())
}
