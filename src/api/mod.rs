pub mod client;
pub use client::TeamworkClient;

use crate::model::hierarchy::{
    Level, NewTimeEntry, Person, Project, Task, TaskList, TimeEntry, TimeTotal,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no API key configured (run `hours config --key <KEY>` or set TEAMWORK_KEY)")]
    MissingKey,
    #[error("no base URL configured (run `hours config --url <URL>` or set TEAMWORK_URL)")]
    MissingUrl,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

/// The remote hierarchy service, as seen by the engines. Object-safe so the
/// navigation engine and the shell can be driven by a fake in tests.
pub trait HierarchyApi {
    fn me(&self) -> Result<Person, ApiError>;

    fn projects(&self) -> Result<Vec<Project>, ApiError>;
    fn tasklists(&self, project_id: &str) -> Result<Vec<TaskList>, ApiError>;
    fn tasks(&self, tasklist_id: &str) -> Result<Vec<Task>, ApiError>;
    fn task_entries(&self, task_id: &str) -> Result<Vec<TimeEntry>, ApiError>;

    fn task(&self, task_id: &str) -> Result<Task, ApiError>;
    fn tasklist(&self, tasklist_id: &str) -> Result<TaskList, ApiError>;
    fn entry(&self, entry_id: &str) -> Result<TimeEntry, ApiError>;

    /// Time entries for the authenticated user, optionally bounded by
    /// yyyymmdd dates (inclusive).
    fn entries_between(&self, from: Option<&str>, to: Option<&str>)
    -> Result<Vec<TimeEntry>, ApiError>;

    fn create_task(&self, tasklist_id: &str, content: &str) -> Result<(), ApiError>;
    fn update_task(&self, task_id: &str, content: &str) -> Result<(), ApiError>;
    fn delete_task(&self, task_id: &str) -> Result<(), ApiError>;

    fn create_entry(&self, entry: &NewTimeEntry) -> Result<(), ApiError>;
    fn update_entry(&self, entry_id: &str, entry: &NewTimeEntry) -> Result<(), ApiError>;
    fn delete_entry(&self, entry_id: &str) -> Result<(), ApiError>;

    fn search_tasks(
        &self,
        term: &str,
        project_id: Option<&str>,
        tasklist_id: Option<&str>,
    ) -> Result<Vec<Task>, ApiError>;

    /// Aggregate logged time for one project/tasklist/task.
    fn total_time(&self, level: Level, id: &str) -> Result<TimeTotal, ApiError>;
}
