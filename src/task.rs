//! Task records and field-level diffing.
//!
//! A task's identifier and title are fixed at creation; `status`, `owner`,
//! `startTime` and `endTime` change through [`TaskPatch`]es. Every field is a
//! free-form string and comparisons are byte-for-byte.

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Format used for `startTime` when a task is created
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's local date in [`DATE_FORMAT`]
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl Task {
    /// Build a task from a creation request.
    pub fn from_new(id: u64, new: NewTask, start_time: String) -> Self {
        Self {
            id,
            title: new.title,
            owner: new.owner,
            status: new.status,
            start_time,
            end_time: new.end_time,
        }
    }

    pub fn field(&self, field: TaskField) -> &str {
        match field {
            TaskField::Status => &self.status,
            TaskField::Owner => &self.owner,
            TaskField::StartTime => &self.start_time,
            TaskField::EndTime => &self.end_time,
        }
    }

    pub fn set_field(&mut self, field: TaskField, value: String) {
        match field {
            TaskField::Status => self.status = value,
            TaskField::Owner => self.owner = value,
            TaskField::StartTime => self.start_time = value,
            TaskField::EndTime => self.end_time = value,
        }
    }

    /// Changes `patch` would make, in the order the patch lists its fields.
    ///
    /// Fields whose new value equals the current one are left out.
    pub fn diff(&self, patch: &TaskPatch) -> Vec<FieldChange> {
        patch
            .fields()
            .filter(|(field, value)| self.field(*field) != *value)
            .map(|(field, value)| FieldChange {
                field,
                old_value: self.field(field).to_string(),
                new_value: value.to_string(),
            })
            .collect()
    }
}

/// Creation request. The identifier and start date are assigned by the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTask {
    pub title: String,
    pub owner: String,
    pub status: String,
    pub end_time: String,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = end_time.into();
        self
    }
}

/// The mutable fields of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskField {
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "owner")]
    Owner,
    #[serde(rename = "startTime")]
    StartTime,
    #[serde(rename = "endTime")]
    EndTime,
}

impl TaskField {
    pub const ALL: [TaskField; 4] = [
        TaskField::Status,
        TaskField::Owner,
        TaskField::StartTime,
        TaskField::EndTime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskField::Status => "status",
            TaskField::Owner => "owner",
            TaskField::StartTime => "startTime",
            TaskField::EndTime => "endTime",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        TaskField::ALL
            .into_iter()
            .find(|field| field.as_str() == value)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown task field '{value}'")))
    }
}

/// One field's transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: TaskField,
    pub old_value: String,
    pub new_value: String,
}

/// Sparse, ordered set of field assignments.
///
/// Deserializes from a JSON object, keeping the order keys appear in.
/// Unknown keys and non-string values are ignored; a repeated key keeps its
/// last value at its last position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    fields: Vec<(TaskField, String)>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an assignment, moving it to the end
    pub fn set(mut self, field: TaskField, value: impl Into<String>) -> Self {
        self.push(field, value.into());
        self
    }

    fn push(&mut self, field: TaskField, value: String) {
        self.fields.retain(|(existing, _)| *existing != field);
        self.fields.push((field, value));
    }

    pub fn fields(&self) -> impl Iterator<Item = (TaskField, &str)> + '_ {
        self.fields
            .iter()
            .map(|(field, value)| (*field, value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<'de> Deserialize<'de> for TaskPatch {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PatchVisitor;

        impl<'de> Visitor<'de> for PatchVisitor {
            type Value = TaskPatch;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of task field assignments")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<TaskPatch, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut patch = TaskPatch::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.parse::<TaskField>() {
                        Ok(field) => {
                            if let serde_json::Value::String(value) =
                                map.next_value::<serde_json::Value>()?
                            {
                                patch.push(field, value);
                            }
                        }
                        Err(_) => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(patch)
            }

            fn visit_unit<E>(self) -> std::result::Result<TaskPatch, E>
            where
                E: de::Error,
            {
                Ok(TaskPatch::new())
            }
        }

        deserializer.deserialize_any(PatchVisitor)
    }
}
