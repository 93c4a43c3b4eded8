//! Command-line interface for taskboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;

mod bugs;
mod config;
mod serve;
mod task;

/// taskboard - task tracking with audit history
///
/// Serves tasks, their field-level change history, and bug counts pulled
/// from a remote tracker. The `task`, `history`, `bugs` and `config`
/// commands work directly against the data directory.
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to <data-dir>/taskboard.toml when present)
    #[arg(long, global = true, env = "TASKBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding tasks.json and task_history.json
    #[arg(long, global = true, env = "TASKBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service and the counter refresh schedule
    Serve {
        /// Listen host (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,

        /// Do not contact the tracker; /api/bugs answers 503
        #[arg(long)]
        no_tracker: bool,
    },

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show recorded field changes
    History {
        /// Only entries for this task identifier
        #[arg(long)]
        task: Option<u64>,
    },

    /// Fetch bug counters from the tracker once and print them
    Bugs,

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks in insertion order
    List,

    /// Create a task (start date is today)
    New {
        /// Task title
        title: String,

        #[arg(long, default_value = "")]
        owner: String,

        #[arg(long, default_value = "")]
        status: String,

        /// End date
        #[arg(long = "end", default_value = "")]
        end_time: String,
    },

    /// Change task fields; unchanged values record nothing
    Set {
        /// Task identifier
        id: u64,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        owner: Option<String>,

        /// Start date
        #[arg(long = "start")]
        start_time: Option<String>,

        /// End date
        #[arg(long = "end")]
        end_time: Option<String>,
    },

    /// Delete a task (its history is kept)
    Rm {
        /// Task identifier
        id: u64,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (password redacted)
    Show,

    /// Write a default taskboard.toml into the data directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Whether this invocation runs the long-lived service
    pub fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let config_path = self.config;
        let data_dir = self.data_dir;
        let resolve = || Config::resolve(config_path.as_deref(), data_dir.as_deref());

        match self.command {
            Commands::Serve {
                host,
                port,
                no_tracker,
            } => serve::run(serve::ServeOptions {
                config: resolve()?,
                host,
                port,
                no_tracker,
            }),
            Commands::Task(cmd) => {
                let config = resolve()?;
                match cmd {
                    TaskCommands::List => task::run_list(task::ListOptions { config, output }),
                    TaskCommands::New {
                        title,
                        owner,
                        status,
                        end_time,
                    } => task::run_new(task::NewOptions {
                        title,
                        owner,
                        status,
                        end_time,
                        config,
                        output,
                    }),
                    TaskCommands::Set {
                        id,
                        status,
                        owner,
                        start_time,
                        end_time,
                    } => task::run_set(task::SetOptions {
                        id,
                        status,
                        owner,
                        start_time,
                        end_time,
                        config,
                        output,
                    }),
                    TaskCommands::Rm { id } => {
                        task::run_rm(task::RmOptions { id, config, output })
                    }
                }
            }
            Commands::History { task } => task::run_history(task::HistoryOptions {
                task,
                config: resolve()?,
                output,
            }),
            Commands::Bugs => bugs::run(bugs::BugsOptions {
                config: resolve()?,
                output,
            }),
            Commands::Config(ConfigCommands::Show) => config::run_show(config::ShowOptions {
                config: resolve()?,
                output,
            }),
            Commands::Config(ConfigCommands::Init { force }) => {
                config::run_init(config::InitOptions {
                    config: config_path.clone(),
                    data_dir: data_dir.clone(),
                    force,
                    output,
                })
            }
        }
    }
}

/// Tokio runtime for commands that talk to the network
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
