//! taskboard - task tracking service library
//!
//! Provides the task store, the field-level change ledger, JSON persistence
//! and a cached snapshot of bug counters pulled from a remote tracker.
//!
//! # Core Concepts
//!
//! - **Tasks**: Records with a stable numeric identifier, created and edited over HTTP
//! - **History**: Append-only ledger with one entry per changed field
//! - **Counters**: Per-person resolved/unresolved bug counts, swapped in atomically
//!
//! # Module Organization
//!
//! - `board`: Task store and history ledger under one lock
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskboard.toml`
//! - `counters`: Counter snapshot and the shared cache
//! - `error`: Error types and result aliases
//! - `history`: History entries and the in-memory ledger
//! - `lock`: Data directory lock and atomic file writes
//! - `refresh`: Scheduled counter refresh
//! - `server`: HTTP routes
//! - `storage`: JSON documents on disk
//! - `task`: Task records and partial updates
//! - `tracker`: Remote bug tracker client

pub mod board;
pub mod cli;
pub mod config;
pub mod counters;
pub mod error;
pub mod history;
pub mod lock;
pub mod output;
pub mod refresh;
pub mod server;
pub mod storage;
pub mod task;
pub mod tracker;

pub use error::{Error, Result};
