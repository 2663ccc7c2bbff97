use std::env;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::{ApiError, HierarchyApi};
use crate::model::hierarchy::{
    Level, NewTimeEntry, Person, Project, Task, TaskList, TimeEntry, TimeTotal,
};
use crate::model::state::Credentials;

/// Blocking Teamwork v1 client. Authenticates with basic auth, the API key
/// as username and a throwaway password, which is all the v1 API checks.
pub struct TeamworkClient {
    http: Client,
    base_url: String,
    key: String,
}

impl TeamworkClient {
    /// Build a client from saved credentials, with TEAMWORK_KEY and
    /// TEAMWORK_URL environment overrides taking precedence.
    pub fn from_credentials(creds: &Credentials) -> Result<Self, ApiError> {
        let key = env::var("TEAMWORK_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| creds.key.clone())
            .ok_or(ApiError::MissingKey)?;
        let url = env::var("TEAMWORK_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| creds.url.clone())
            .ok_or(ApiError::MissingUrl)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Http)?;

        Ok(TeamworkClient {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            key,
        })
    }

    fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .basic_auth(&self.key, Some("xxx"))
            .header(ACCEPT, "application/json")
            .send()?;
        read_body(resp)
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, endpoint))
            .basic_auth(&self.key, Some("xxx"))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()?;
        read_body(resp)
    }

    fn put(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        let resp = self
            .http
            .put(format!("{}{}", self.base_url, endpoint))
            .basic_auth(&self.key, Some("xxx"))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()?;
        read_body(resp)
    }

    fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(format!("{}{}", self.base_url, endpoint))
            .basic_auth(&self.key, Some("xxx"))
            .send()?;
        read_body(resp).map(|_| ())
    }

    fn entry_body(&self, entry: &NewTimeEntry) -> Result<Value, ApiError> {
        let me = self.me()?;
        Ok(json!({
            "time-entry": {
                "description": entry.description,
                "date": entry.date,
                "hours": entry.hours,
                "minutes": entry.minutes,
                "isbillable": if entry.billable { "1" } else { "0" },
                "person-id": me.id,
                "time": entry.start_time,
                "tags": entry.tags.join(","),
            }
        }))
    }
}

/// Check the HTTP status and parse the body. Several write endpoints return
/// an empty body on success, which parses as null.
fn read_body(resp: Response) -> Result<Value, ApiError> {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text.chars().take(200).collect(),
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a collection out of its response envelope. Teamwork omits the key
/// entirely when the collection is empty.
fn take_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, ApiError> {
    match value.get(key) {
        None => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| ApiError::Decode(format!("{}: {}", key, e))),
    }
}

fn take_one<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, ApiError> {
    let v = value
        .get(key)
        .ok_or_else(|| ApiError::Decode(format!("missing key: {}", key)))?;
    serde_json::from_value(v.clone()).map_err(|e| ApiError::Decode(format!("{}: {}", key, e)))
}

/// Find the first "time-totals" object anywhere in the response. The totals
/// endpoints nest it differently per level.
fn find_totals(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => {
            if let Some(t) = map.get("time-totals") {
                return Some(t);
            }
            map.values().find_map(find_totals)
        }
        Value::Array(items) => items.iter().find_map(find_totals),
        _ => None,
    }
}

fn num_field(v: &Value, key: &str) -> f64 {
    match v.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

impl HierarchyApi for TeamworkClient {
    fn me(&self) -> Result<Person, ApiError> {
        take_one(self.get("/me.json")?, "person")
    }

    fn projects(&self) -> Result<Vec<Project>, ApiError> {
        take_list(self.get("/projects.json")?, "projects")
    }

    fn tasklists(&self, project_id: &str) -> Result<Vec<TaskList>, ApiError> {
        take_list(
            self.get(&format!("/projects/{}/tasklists.json", project_id))?,
            "tasklists",
        )
    }

    fn tasks(&self, tasklist_id: &str) -> Result<Vec<Task>, ApiError> {
        take_list(
            self.get(&format!("/tasklists/{}/tasks.json", tasklist_id))?,
            "todo-items",
        )
    }

    fn task_entries(&self, task_id: &str) -> Result<Vec<TimeEntry>, ApiError> {
        take_list(
            self.get(&format!("/tasks/{}/time_entries.json", task_id))?,
            "time-entries",
        )
    }

    fn task(&self, task_id: &str) -> Result<Task, ApiError> {
        take_one(self.get(&format!("/tasks/{}.json", task_id))?, "todo-item")
    }

    fn tasklist(&self, tasklist_id: &str) -> Result<TaskList, ApiError> {
        take_one(
            self.get(&format!("/tasklists/{}.json", tasklist_id))?,
            "todo-list",
        )
    }

    fn entry(&self, entry_id: &str) -> Result<TimeEntry, ApiError> {
        take_one(
            self.get(&format!("/time_entries/{}.json", entry_id))?,
            "time-entry",
        )
    }

    fn entries_between(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<TimeEntry>, ApiError> {
        let me = self.me()?;
        let mut query = format!("userId={}", me.id);
        if let Some(f) = from {
            query.push_str(&format!("&fromDate={}", f));
        }
        if let Some(t) = to {
            query.push_str(&format!("&toDate={}", t));
        }
        take_list(
            self.get(&format!("/time_entries.json?{}", query))?,
            "time-entries",
        )
    }

    fn create_task(&self, tasklist_id: &str, content: &str) -> Result<(), ApiError> {
        let body = json!({ "todo-item": { "content": content } });
        self.post(&format!("/tasklists/{}/tasks.json", tasklist_id), &body)
            .map(|_| ())
    }

    fn update_task(&self, task_id: &str, content: &str) -> Result<(), ApiError> {
        let body = json!({ "todo-item": { "content": content } });
        self.put(&format!("/tasks/{}.json", task_id), &body)
            .map(|_| ())
    }

    fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/tasks/{}.json", task_id))
    }

    fn create_entry(&self, entry: &NewTimeEntry) -> Result<(), ApiError> {
        let body = self.entry_body(entry)?;
        self.post(
            &format!("/tasks/{}/time_entries.json", entry.task_id),
            &body,
        )
        .map(|_| ())
    }

    fn update_entry(&self, entry_id: &str, entry: &NewTimeEntry) -> Result<(), ApiError> {
        let body = self.entry_body(entry)?;
        self.put(&format!("/time_entries/{}.json", entry_id), &body)
            .map(|_| ())
    }

    fn delete_entry(&self, entry_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/time_entries/{}.json", entry_id))
    }

    fn search_tasks(
        &self,
        term: &str,
        project_id: Option<&str>,
        tasklist_id: Option<&str>,
    ) -> Result<Vec<Task>, ApiError> {
        let mut query = format!("searchTerm={}", term);
        if let Some(p) = project_id {
            query.push_str(&format!("&projectId={}", p));
        }
        if let Some(t) = tasklist_id {
            query.push_str(&format!("&tasklistId={}", t));
        }
        take_list(self.get(&format!("/tasks.json?{}", query))?, "todo-items")
    }

    fn total_time(&self, level: Level, id: &str) -> Result<TimeTotal, ApiError> {
        let endpoint = match level {
            Level::Project => format!("/projects/{}/time/total.json", id),
            Level::TaskList => format!("/tasklists/{}/time/total.json", id),
            Level::Task | Level::Entry => format!("/tasks/{}/time/total.json", id),
            Level::Top => return Err(ApiError::Decode("no totals at top level".to_string())),
        };
        let value = self.get(&endpoint)?;
        let totals = find_totals(&value)
            .ok_or_else(|| ApiError::Decode("no time-totals in response".to_string()))?;
        Ok(TimeTotal {
            total: num_field(totals, "total-hours-sum"),
            billable: num_field(totals, "billable-hours-sum"),
            non_billable: num_field(totals, "non-billable-hours-sum"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_an_error() {
        // Guard against ambient credentials leaking into the test
        if env::var("TEAMWORK_KEY").is_ok() {
            return;
        }
        let err = TeamworkClient::from_credentials(&Credentials::default());
        assert!(matches!(err, Err(ApiError::MissingKey)));
    }

    #[test]
    fn take_list_tolerates_missing_key() {
        let v: Value = serde_json::from_str(r#"{"STATUS": "OK"}"#).unwrap();
        let items: Vec<Project> = take_list(v, "projects").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn find_totals_handles_nested_shapes() {
        let v: Value = serde_json::from_str(
            r#"{"projects": [{"id": "1", "tasklist": {"time-totals":
                {"total-hours-sum": "12.5", "billable-hours-sum": 10,
                 "non-billable-hours-sum": "2.5"}}}]}"#,
        )
        .unwrap();
        let totals = find_totals(&v).unwrap();
        assert_eq!(num_field(totals, "total-hours-sum"), 12.5);
        assert_eq!(num_field(totals, "billable-hours-sum"), 10.0);
        assert_eq!(num_field(totals, "non-billable-hours-sum"), 2.5);
    }
}
