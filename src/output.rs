//! What the CLI prints: a versioned JSON envelope under `--json`, otherwise a
//! short text report grouped into sections.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskboard.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Details,
    Warnings,
    NextSteps,
}

impl Section {
    const ORDER: [Section; 4] = [
        Section::Summary,
        Section::Details,
        Section::Warnings,
        Section::NextSteps,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::Details => "Details",
            Section::Warnings => "Warnings",
            Section::NextSteps => "Next steps",
        }
    }
}

/// Text report for one command; renders through `Display`
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    lines: Vec<(Section, String)>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        let line = if value.is_empty() {
            key
        } else {
            format!("{key}: {value}")
        };
        self.lines.push((Section::Summary, line));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.lines.push((Section::Details, value.into()));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.lines.push((Section::Warnings, value.into()));
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.lines.push((Section::NextSteps, value.into()));
    }

    fn section(&self, section: Section) -> impl Iterator<Item = &str> + '_ {
        self.lines
            .iter()
            .filter(move |(s, _)| *s == section)
            .map(|(_, line)| line.as_str())
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        for section in Section::ORDER {
            let mut lines = self.section(section).peekable();
            if lines.peek().is_none() {
                continue;
            }
            write!(f, "\n\n{}:", section.title())?;
            for line in lines {
                write!(f, "\n- {line}")?;
            }
        }
        Ok(())
    }
}

/// `{"schema_version", "command", "status", "data" | "error", ...}`
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<&'a str>,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let lines = |section: Section| -> Vec<&str> {
            human
                .map(|h| h.section(section).collect())
                .unwrap_or_default()
        };
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: lines(Section::Warnings),
            next_steps: lines(Section::NextSteps),
        }
        .print();
    }

    if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = hint(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(JsonError::from(err)),
            warnings: Vec::new(),
            next_steps: hint.into_iter().collect(),
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Command name for error envelopes, read before clap has run
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut positional = args.into_iter().filter(|arg| !arg.starts_with('-'));

    let Some(command) = positional.next() else {
        return "taskboard".to_string();
    };
    match (command.as_str(), positional.next()) {
        ("task" | "config", Some(sub)) => format!("{command} {sub}"),
        _ => command,
    }
}

fn hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::TaskNotFound(_) => Some("taskboard task list"),
        Error::InvalidConfig(_) => Some("fix taskboard.toml then retry"),
        Error::LockFailed(_) => Some("stop the other taskboard process using this data directory"),
        Error::RemoteAuth(_) => Some("check tracker.account and tracker.password"),
        Error::CountersUnavailable => Some("taskboard bugs"),
        _ => None,
    }
}
