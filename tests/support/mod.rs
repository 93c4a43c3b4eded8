#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use taskboard::board::TaskBoard;
use taskboard::storage::Storage;
use tempfile::TempDir;

/// Temporary data directory holding tasks.json and task_history.json
pub struct TestDataDir {
    dir: TempDir,
}

impl TestDataDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> Storage {
        Storage::in_dir(self.dir.path())
    }

    pub fn open_board(&self) -> TaskBoard {
        TaskBoard::open(self.storage()).expect("open board")
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.path().join("tasks.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.path().join("task_history.json")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_json(&self, rel_path: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.dir.path().join(rel_path)).expect("read file");
        serde_json::from_str(&raw).expect("parse json")
    }

    /// `taskboard` pointed at this data directory, isolated from the caller's env
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskboard").expect("binary");
        cmd.env_remove("TASKBOARD_CONFIG")
            .env_remove("TRACKER_HOST")
            .env_remove("TRACKER_ACCOUNT")
            .env_remove("TRACKER_PASSWORD")
            .env_remove("RUST_LOG")
            .env("TASKBOARD_DATA_DIR", self.dir.path());
        cmd
    }
}

/// Parse the JSON envelope printed by a `--json` invocation
pub fn json_output(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).expect("json output")
}
