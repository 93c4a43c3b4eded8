//! taskboard config command implementation

use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `taskboard config show`
pub struct ShowOptions {
    pub config: Config,
    pub output: OutputOptions,
}

/// Options for `taskboard config init`
pub struct InitOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub force: bool,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct ConfigInitReport {
    path: PathBuf,
}

const REDACTED: &str = "********";

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if !config.tracker.password.is_empty() {
        config.tracker.password = REDACTED.to_string();
    }
    config
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let config = redacted(&options.config);

    if options.output.json {
        return emit_success(options.output, "config show", &config, None);
    }
    if !options.output.quiet {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

pub fn run_init(options: InitOptions) -> Result<()> {
    let path = match options.config {
        Some(path) => path,
        None => options
            .data_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE),
    };

    if path.exists() && !options.force {
        return Err(Error::InvalidArgument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Config::default().save(&path)?;

    let mut human = HumanOutput::new(format!("taskboard config init: {}", path.display()));
    human.push_next_step("set tracker.host, tracker.account and tracker.password");

    let report = ConfigInitReport { path };
    emit_success(options.output, "config init", &report, Some(&human))
}
