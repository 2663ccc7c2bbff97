use serde::{Deserialize, Deserializer, Serialize};

/// The four nested levels of the remote hierarchy, plus the unselected top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Top,
    Project,
    TaskList,
    Task,
    Entry,
}

// ---------------------------------------------------------------------------
// Tolerant deserializers
//
// The Teamwork v1 API is loose about scalar types: ids arrive as numbers or
// strings depending on the endpoint, hours/minutes arrive as strings on the
// report endpoints, and booleans arrive as 0/1 in either representation.
// ---------------------------------------------------------------------------

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(i64),
    }
    Ok(match Repr::deserialize(d)? {
        Repr::Str(s) => s,
        Repr::Num(n) => n.to_string(),
    })
}

fn de_num<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(f64),
        Str(String),
    }
    Ok(match Repr::deserialize(d)? {
        Repr::Num(n) => n,
        Repr::Str(s) => s.trim().parse().unwrap_or(0.0),
    })
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Num(i64),
        Str(String),
    }
    Ok(match Repr::deserialize(d)? {
        Repr::Bool(b) => b,
        Repr::Num(n) => n != 0,
        Repr::Str(s) => s == "1" || s.eq_ignore_ascii_case("true"),
    })
}

// ---------------------------------------------------------------------------
// Remote entities
// ---------------------------------------------------------------------------

/// Top-level container in the remote hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A task list inside a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "projectId", deserialize_with = "de_id", default)]
    pub project_id: String,
}

/// A task (Teamwork "todo-item") inside a task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "todo-list-id", deserialize_with = "de_id", default)]
    pub tasklist_id: String,
}

/// A logged time entry. The report endpoints also return display fields
/// (project and task names) which the summaries use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(deserialize_with = "de_num", default)]
    pub hours: f64,
    #[serde(deserialize_with = "de_num", default)]
    pub minutes: f64,
    #[serde(rename = "isbillable", deserialize_with = "de_flag", default)]
    pub billable: bool,
    #[serde(rename = "project-name", default)]
    pub project_name: String,
    #[serde(rename = "todo-item-name", default)]
    pub task_name: String,
    #[serde(rename = "todo-item-id", deserialize_with = "de_id", default)]
    pub task_id: String,
}

impl TimeEntry {
    /// Total logged time in fractional hours.
    pub fn total_hours(&self) -> f64 {
        self.hours + self.minutes / 60.0
    }
}

/// The authenticated user, resolved from the API key.
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
}

/// Aggregate logged time for a project, task list, or task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTotal {
    pub total: f64,
    pub billable: f64,
    pub non_billable: f64,
}

/// Fields for creating or updating a time entry.
#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub task_id: String,
    pub description: String,
    /// yyyymmdd
    pub date: String,
    pub hours: i64,
    pub minutes: i64,
    pub billable: bool,
    /// HH:MM
    pub start_time: String,
    pub tags: Vec<String>,
}

impl Default for NewTimeEntry {
    fn default() -> Self {
        NewTimeEntry {
            task_id: String::new(),
            description: String::new(),
            date: String::new(),
            hours: 0,
            minutes: 0,
            billable: true,
            start_time: "09:00".to_string(),
            tags: Vec::new(),
        }
    }
}
