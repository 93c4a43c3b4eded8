//! taskboard task and history command implementations
//!
//! These commands open the data directory directly. Mutating commands hold
//! the data-directory lock, so they fail fast while `serve` owns it.

use serde::Serialize;

use crate::board::TaskBoard;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryEntry;
use crate::lock::{DataDirLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;
use crate::task::{NewTask, Task, TaskField, TaskPatch};

/// Options for `taskboard task list`
pub struct ListOptions {
    pub config: Config,
    pub output: OutputOptions,
}

/// Options for `taskboard task new`
pub struct NewOptions {
    pub title: String,
    pub owner: String,
    pub status: String,
    pub end_time: String,
    pub config: Config,
    pub output: OutputOptions,
}

/// Options for `taskboard task set`
pub struct SetOptions {
    pub id: u64,
    pub status: Option<String>,
    pub owner: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub config: Config,
    pub output: OutputOptions,
}

/// Options for `taskboard task rm`
pub struct RmOptions {
    pub id: u64,
    pub config: Config,
    pub output: OutputOptions,
}

/// Options for `taskboard history`
pub struct HistoryOptions {
    pub task: Option<u64>,
    pub config: Config,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct TaskSetReport {
    task: Task,
    changes: Vec<HistoryEntry>,
}

#[derive(Serialize)]
struct TaskRmReport {
    id: u64,
}

fn open_board(config: &Config) -> Result<TaskBoard> {
    TaskBoard::open(Storage::from_config(&config.storage))
}

fn lock_data_dir(config: &Config) -> Result<DataDirLock> {
    DataDirLock::acquire(&config.storage.data_dir, DEFAULT_LOCK_TIMEOUT_MS)
}

fn describe(task: &Task) -> String {
    let mut line = format!("#{} {}", task.id, task.title);
    for (label, value) in [
        ("owner", &task.owner),
        ("status", &task.status),
        ("start", &task.start_time),
        ("end", &task.end_time),
    ] {
        if !value.is_empty() {
            line.push_str(&format!(" [{label}: {value}]"));
        }
    }
    line
}

fn describe_change(entry: &HistoryEntry) -> String {
    format!(
        "{} #{} {}: '{}' -> '{}'",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.task_id,
        entry.field,
        entry.old_value,
        entry.new_value
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let board = open_board(&options.config)?;
    let tasks = board.list()?;

    let mut human = HumanOutput::new(format!("taskboard task list: {} task(s)", tasks.len()));
    for task in &tasks {
        human.push_detail(describe(task));
    }
    if tasks.is_empty() {
        human.push_next_step("taskboard task new \"<title>\"");
    }

    emit_success(options.output, "task list", &tasks, Some(&human))
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let _lock = lock_data_dir(&options.config)?;
    let board = open_board(&options.config)?;

    let task = board.create(
        NewTask::new(options.title)
            .owner(options.owner)
            .status(options.status)
            .end_time(options.end_time),
    )?;

    let mut human = HumanOutput::new(format!("taskboard task new: #{}", task.id));
    human.push_summary("title", task.title.clone());
    human.push_summary("start", task.start_time.clone());
    if task.owner.is_empty() {
        human.push_warning("task has no owner");
    }

    emit_success(options.output, "task new", &task, Some(&human))
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let mut patch = TaskPatch::new();
    for (field, value) in [
        (TaskField::Status, options.status),
        (TaskField::Owner, options.owner),
        (TaskField::StartTime, options.start_time),
        (TaskField::EndTime, options.end_time),
    ] {
        if let Some(value) = value {
            patch = patch.set(field, value);
        }
    }

    let _lock = lock_data_dir(&options.config)?;
    let board = open_board(&options.config)?;
    let before = board.history_for_task(options.id)?.len();
    let task = board.update(options.id, &patch)?;
    let changes = board.history_for_task(options.id)?.split_off(before);

    let mut human = HumanOutput::new(format!("taskboard task set: #{}", task.id));
    human.push_summary("changes", changes.len().to_string());
    for entry in &changes {
        human.push_detail(describe_change(entry));
    }
    if patch.is_empty() {
        human.push_warning("no fields given");
    }

    let report = TaskSetReport { task, changes };
    emit_success(options.output, "task set", &report, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let _lock = lock_data_dir(&options.config)?;
    let board = open_board(&options.config)?;
    board.delete(options.id)?;

    let mut human = HumanOutput::new(format!("taskboard task rm: #{}", options.id));
    human.push_detail("history entries are kept");

    let report = TaskRmReport { id: options.id };
    emit_success(options.output, "task rm", &report, Some(&human))
}

pub fn run_history(options: HistoryOptions) -> Result<()> {
    let board = open_board(&options.config)?;
    let entries = match options.task {
        Some(id) => board.history_for_task(id)?,
        None => board.history()?,
    };

    let header = match options.task {
        Some(id) => format!("taskboard history: #{id}, {} change(s)", entries.len()),
        None => format!("taskboard history: {} change(s)", entries.len()),
    };
    let mut human = HumanOutput::new(header);
    for entry in &entries {
        human.push_detail(describe_change(entry));
    }

    emit_success(options.output, "history", &entries, Some(&human))
}
