use indexmap::IndexMap;

use crate::api::{ApiError, HierarchyApi};
use crate::model::hierarchy::{Level, Project, Task, TaskList, TimeEntry};
use crate::ops::favorites;

/// The selected entity at each hierarchy level. Always right-truncated: a
/// level can only be selected when all its ancestors are, and selecting a
/// level clears everything below it.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    pub project: Option<Project>,
    pub tasklist: Option<TaskList>,
    pub task: Option<Task>,
    pub entry: Option<TimeEntry>,
}

/// Cached children lists, one per level. Each list is fully replaced when
/// its parent selection changes; never merged.
#[derive(Debug, Default)]
pub struct Cache {
    pub projects: Vec<Project>,
    pub tasklists: Vec<TaskList>,
    pub tasks: Vec<Task>,
    pub entries: Vec<TimeEntry>,
}

/// The navigation engine: current position in the remote hierarchy plus the
/// children cache and a single-slot back target.
#[derive(Default)]
pub struct Browser {
    pub selection: Selection,
    pub cache: Cache,
    back_path: Option<String>,
}

/// Resolve a path segment against a children list: a numeric segment that is
/// in range is a zero-based index, anything else matches the remote id.
fn find_item<'a, T>(list: &'a [T], segment: &str, id_of: impl Fn(&T) -> &str) -> Option<&'a T> {
    if let Ok(i) = segment.parse::<usize>()
        && i < list.len()
    {
        return Some(&list[i]);
    }
    list.iter().find(|item| id_of(item) == segment)
}

impl Browser {
    pub fn new() -> Self {
        Browser::default()
    }

    /// Deepest selected level, derived from which fields are set.
    pub fn level(&self) -> Level {
        if self.selection.entry.is_some() {
            Level::Entry
        } else if self.selection.task.is_some() {
            Level::Task
        } else if self.selection.tasklist.is_some() {
            Level::TaskList
        } else if self.selection.project.is_some() {
            Level::Project
        } else {
            Level::Top
        }
    }

    /// Canonical `/id/id/id/id` form of the current selection, used for
    /// display, persistence, and the back target. `/` at top.
    pub fn path(&self) -> String {
        let mut p = String::new();
        if let Some(project) = &self.selection.project {
            p.push('/');
            p.push_str(&project.id);
            if let Some(tasklist) = &self.selection.tasklist {
                p.push('/');
                p.push_str(&tasklist.id);
                if let Some(task) = &self.selection.task {
                    p.push('/');
                    p.push_str(&task.id);
                    if let Some(entry) = &self.selection.entry {
                        p.push('/');
                        p.push_str(&entry.id);
                    }
                }
            }
        }
        if p.is_empty() { "/".to_string() } else { p }
    }

    /// Human-readable prompt, display names down to the task level.
    pub fn prompt(&self) -> String {
        let mut p = String::from("teamwork");
        if let Some(project) = &self.selection.project {
            p.push('/');
            p.push_str(&project.name);
            if let Some(tasklist) = &self.selection.tasklist {
                p.push('/');
                p.push_str(&tasklist.name);
                if let Some(task) = &self.selection.task {
                    p.push('/');
                    p.push_str(&task.content);
                }
            }
        }
        p.push_str(" > ");
        p
    }

    /// Refetch the children of the current level. Always a full replace.
    pub fn refresh(&mut self, api: &dyn HierarchyApi) -> Result<(), ApiError> {
        match self.level() {
            Level::Top => self.cache.projects = api.projects()?,
            Level::Project => {
                let id = self.selection.project.as_ref().map(|p| p.id.clone());
                if let Some(id) = id {
                    self.cache.tasklists = api.tasklists(&id)?;
                }
            }
            Level::TaskList => {
                let id = self.selection.tasklist.as_ref().map(|t| t.id.clone());
                if let Some(id) = id {
                    self.cache.tasks = api.tasks(&id)?;
                }
            }
            Level::Task => {
                let id = self.selection.task.as_ref().map(|t| t.id.clone());
                if let Some(id) = id {
                    self.cache.entries = api.task_entries(&id)?;
                }
            }
            Level::Entry => {}
        }
        Ok(())
    }

    fn reset(&mut self, api: &dyn HierarchyApi) -> Result<(), ApiError> {
        self.selection = Selection::default();
        self.refresh(api)
    }

    /// Deselect the deepest level. No-op at top; the parent's children list
    /// is still cached, so no refetch is needed.
    fn pop(&mut self) {
        let s = &mut self.selection;
        if s.entry.is_some() {
            s.entry = None;
        } else if s.task.is_some() {
            s.task = None;
        } else if s.tasklist.is_some() {
            s.tasklist = None;
        } else {
            s.project = None;
        }
    }

    /// Resolve one segment against the current level's cached children and
    /// select the match. Returns false if nothing resolved (including any
    /// attempt to descend past the time-entry leaf).
    fn descend(&mut self, segment: &str) -> bool {
        match self.level() {
            Level::Top => {
                if let Some(p) = find_item(&self.cache.projects, segment, |p| &p.id) {
                    self.selection.project = Some(p.clone());
                    return true;
                }
            }
            Level::Project => {
                if let Some(t) = find_item(&self.cache.tasklists, segment, |t| &t.id) {
                    self.selection.tasklist = Some(t.clone());
                    return true;
                }
            }
            Level::TaskList => {
                if let Some(t) = find_item(&self.cache.tasks, segment, |t| &t.id) {
                    self.selection.task = Some(t.clone());
                    return true;
                }
            }
            Level::Task => {
                if let Some(e) = find_item(&self.cache.entries, segment, |e| &e.id) {
                    self.selection.entry = Some(e.clone());
                    return true;
                }
            }
            Level::Entry => {}
        }
        false
    }

    /// Change the current position. Resolution failures are not errors: the
    /// remainder of the path is abandoned and the last successfully resolved
    /// prefix stays selected. Only remote failures surface as `Err`.
    pub fn change_dir(
        &mut self,
        api: &dyn HierarchyApi,
        favorites: &IndexMap<String, String>,
        expr: &str,
    ) -> Result<(), ApiError> {
        let expr = expr.trim();

        // Favorite shortcut: a whole, slash-free, non-numeric expression
        // issued at the top level expands to the favorite task's absolute
        // path (ancestors looked up remotely) and is re-resolved from there.
        if self.level() == Level::Top
            && !expr.contains('/')
            && expr.parse::<usize>().is_err()
            && let Some(task_id) = favorites::resolve(favorites, expr)
        {
            let task = api.task(task_id)?;
            let tasklist = api.tasklist(&task.tasklist_id)?;
            let abs = format!("/{}/{}/{}", tasklist.project_id, tasklist.id, task.id);
            return self.change_dir(api, favorites, &abs);
        }

        if expr.is_empty() || expr == "/" || expr == "~" {
            return self.reset(api);
        }

        let mut rest = expr;
        if let Some(stripped) = rest.strip_prefix('/') {
            self.reset(api)?;
            rest = stripped;
        }
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        for segment in rest.split('/') {
            if segment.is_empty() {
                continue;
            }
            if segment == ".." {
                self.pop();
                continue;
            }
            if !self.descend(segment) {
                eprintln!("hours: not found: {}", segment);
                break;
            }
            // Cache follows the new position, even when re-entering a level
            // visited earlier in the same call.
            self.refresh(api)?;
        }
        Ok(())
    }

    /// Like `change_dir`, but `-` re-issues the previous path. One back slot
    /// only: repeated `-` toggles between the last two positions.
    pub fn change_dir_reversible(
        &mut self,
        api: &dyn HierarchyApi,
        favorites: &IndexMap<String, String>,
        expr: &str,
    ) -> Result<(), ApiError> {
        let target = if expr.trim() == "-" {
            match self.back_path.clone() {
                Some(p) => p,
                None => {
                    eprintln!("hours: no previous path");
                    return Ok(());
                }
            }
        } else {
            expr.to_string()
        };
        self.back_path = Some(self.path());
        self.change_dir(api, favorites, &target)
    }

    /// Lines describing the children of the current level: `index) id: label`.
    /// Time entries are the leaf, so an entry selection lists nothing.
    pub fn listing(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.level() {
            Level::Top => {
                lines.push("Projects:".to_string());
                for (i, p) in self.cache.projects.iter().enumerate() {
                    lines.push(format!("{}) {}: {}", i, p.id, p.name));
                }
            }
            Level::Project => {
                lines.push("Task Lists:".to_string());
                for (i, t) in self.cache.tasklists.iter().enumerate() {
                    lines.push(format!("{}) {}: {}", i, t.id, t.name));
                }
            }
            Level::TaskList => {
                lines.push("Tasks:".to_string());
                for (i, t) in self.cache.tasks.iter().enumerate() {
                    lines.push(format!("{}) {}: {}", i, t.id, t.content));
                }
            }
            Level::Task => {
                lines.push("Time Entries:".to_string());
                for (i, e) in self.cache.entries.iter().enumerate() {
                    lines.push(format!(
                        "{}) {}: {} ({}h {}m)",
                        i, e.id, e.description, e.hours, e.minutes
                    ));
                }
            }
            Level::Entry => {}
        }
        lines
    }

    /// List the children at `expr` (or the current level with no argument),
    /// returning to the original position afterwards. Never mutates the
    /// path when called without an argument.
    pub fn list(
        &mut self,
        api: &dyn HierarchyApi,
        favorites: &IndexMap<String, String>,
        expr: Option<&str>,
    ) -> Result<Vec<String>, ApiError> {
        let original = self.path();
        if let Some(p) = expr {
            self.change_dir(api, favorites, p)?;
        }
        let lines = self.listing();
        if expr.is_some() {
            self.change_dir(api, favorites, &original)?;
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hierarchy::{NewTimeEntry, Person, TimeTotal};
    use pretty_assertions::assert_eq;

    /// Canned two-project hierarchy; counts fetches so tests can assert
    /// cache behavior.
    struct FakeApi {
        fetches: std::cell::Cell<usize>,
    }

    impl FakeApi {
        fn new() -> Self {
            FakeApi {
                fetches: std::cell::Cell::new(0),
            }
        }

        fn bump(&self) {
            self.fetches.set(self.fetches.get() + 1);
        }
    }

    fn project(id: &str, name: &str) -> Project {
        serde_json::from_value(serde_json::json!({"id": id, "name": name})).unwrap()
    }

    fn tasklist(id: &str, name: &str, project_id: &str) -> TaskList {
        serde_json::from_value(
            serde_json::json!({"id": id, "name": name, "projectId": project_id}),
        )
        .unwrap()
    }

    fn task(id: &str, content: &str, tasklist_id: &str) -> Task {
        serde_json::from_value(
            serde_json::json!({"id": id, "content": content, "todo-list-id": tasklist_id}),
        )
        .unwrap()
    }

    fn entry(id: &str, description: &str) -> TimeEntry {
        serde_json::from_value(serde_json::json!({"id": id, "description": description})).unwrap()
    }

    impl HierarchyApi for FakeApi {
        fn me(&self) -> Result<Person, ApiError> {
            Ok(serde_json::from_value(serde_json::json!({"id": "7"})).unwrap())
        }

        fn projects(&self) -> Result<Vec<Project>, ApiError> {
            self.bump();
            Ok(vec![project("100", "Apollo"), project("200", "Gemini")])
        }

        fn tasklists(&self, project_id: &str) -> Result<Vec<TaskList>, ApiError> {
            self.bump();
            Ok(match project_id {
                "100" => vec![
                    tasklist("110", "Backend", "100"),
                    tasklist("120", "Frontend", "100"),
                ],
                "200" => vec![tasklist("210", "Ops", "200")],
                _ => vec![],
            })
        }

        fn tasks(&self, tasklist_id: &str) -> Result<Vec<Task>, ApiError> {
            self.bump();
            Ok(match tasklist_id {
                "110" => vec![
                    task("111", "Design schema", "110"),
                    // id chosen to collide with a valid index
                    task("1", "Write migrations", "110"),
                ],
                "210" => vec![task("211", "Rotate certs", "210")],
                _ => vec![],
            })
        }

        fn task_entries(&self, task_id: &str) -> Result<Vec<TimeEntry>, ApiError> {
            self.bump();
            Ok(match task_id {
                "111" => vec![entry("901", "sketching"), entry("902", "review")],
                _ => vec![],
            })
        }

        fn task(&self, task_id: &str) -> Result<Task, ApiError> {
            match task_id {
                "111" => Ok(task("111", "Design schema", "110")),
                "211" => Ok(task("211", "Rotate certs", "210")),
                _ => Err(ApiError::Status {
                    status: 404,
                    body: "not found".to_string(),
                }),
            }
        }

        fn tasklist(&self, tasklist_id: &str) -> Result<TaskList, ApiError> {
            match tasklist_id {
                "110" => Ok(tasklist("110", "Backend", "100")),
                "210" => Ok(tasklist("210", "Ops", "200")),
                _ => Err(ApiError::Status {
                    status: 404,
                    body: "not found".to_string(),
                }),
            }
        }

        fn entry(&self, _entry_id: &str) -> Result<TimeEntry, ApiError> {
            unimplemented!("not used by navigation")
        }

        fn entries_between(
            &self,
            _from: Option<&str>,
            _to: Option<&str>,
        ) -> Result<Vec<TimeEntry>, ApiError> {
            Ok(vec![])
        }

        fn create_task(&self, _tasklist_id: &str, _content: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn update_task(&self, _task_id: &str, _content: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn delete_task(&self, _task_id: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn create_entry(&self, _entry: &NewTimeEntry) -> Result<(), ApiError> {
            Ok(())
        }

        fn update_entry(&self, _entry_id: &str, _entry: &NewTimeEntry) -> Result<(), ApiError> {
            Ok(())
        }

        fn delete_entry(&self, _entry_id: &str) -> Result<(), ApiError> {
            Ok(())
        }

        fn search_tasks(
            &self,
            _term: &str,
            _project_id: Option<&str>,
            _tasklist_id: Option<&str>,
        ) -> Result<Vec<Task>, ApiError> {
            Ok(vec![])
        }

        fn total_time(&self, _level: Level, _id: &str) -> Result<TimeTotal, ApiError> {
            Ok(TimeTotal::default())
        }
    }

    fn browser(api: &FakeApi) -> Browser {
        let mut b = Browser::new();
        b.refresh(api).unwrap();
        b
    }

    fn no_favs() -> IndexMap<String, String> {
        IndexMap::new()
    }

    #[test]
    fn index_and_id_select_the_same_entity() {
        let api = FakeApi::new();
        let mut by_index = browser(&api);
        by_index.change_dir(&api, &no_favs(), "1").unwrap();
        let mut by_id = browser(&api);
        by_id.change_dir(&api, &no_favs(), "200").unwrap();
        assert_eq!(by_index.path(), by_id.path());
        assert_eq!(by_index.level(), Level::Project);
    }

    #[test]
    fn in_range_index_wins_over_colliding_id() {
        // Task list 110 holds a task with id "1" at index 1. The segment "1"
        // must resolve as the index (selecting "Write migrations" which is
        // also id "1" here), and "0" as the first task.
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110/0").unwrap();
        assert_eq!(b.selection.task.as_ref().unwrap().id, "111");

        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110/1").unwrap();
        assert_eq!(b.selection.task.as_ref().unwrap().content, "Write migrations");
    }

    #[test]
    fn out_of_range_number_falls_back_to_id_match() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        // 200 is out of range as an index into two projects, so it matches
        // the project with id "200".
        b.change_dir(&api, &no_favs(), "200").unwrap();
        assert_eq!(b.selection.project.as_ref().unwrap().name, "Gemini");
    }

    #[test]
    fn slash_always_resets_to_top() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110/0").unwrap();
        assert_eq!(b.level(), Level::Task);
        b.change_dir(&api, &no_favs(), "/").unwrap();
        assert_eq!(b.level(), Level::Top);
        assert_eq!(b.path(), "/");
    }

    #[test]
    fn tilde_and_empty_also_reset() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "0").unwrap();
        b.change_dir(&api, &no_favs(), "~").unwrap();
        assert_eq!(b.level(), Level::Top);
        b.change_dir(&api, &no_favs(), "0").unwrap();
        b.change_dir(&api, &no_favs(), "").unwrap();
        assert_eq!(b.level(), Level::Top);
    }

    #[test]
    fn dotdot_pops_one_level_and_is_noop_at_top() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110").unwrap();
        b.change_dir(&api, &no_favs(), "..").unwrap();
        assert_eq!(b.level(), Level::Project);
        b.change_dir(&api, &no_favs(), "../..").unwrap();
        assert_eq!(b.level(), Level::Top);
        b.change_dir(&api, &no_favs(), "..").unwrap();
        assert_eq!(b.level(), Level::Top);
    }

    #[test]
    fn pop_and_reselect_round_trips() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110").unwrap();
        let before = b.path();
        b.change_dir(&api, &no_favs(), "../110").unwrap();
        assert_eq!(b.path(), before);
    }

    #[test]
    fn unresolved_segment_keeps_last_resolved_prefix() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/999/0").unwrap();
        // "999" resolves nothing, so the walk stops at the project.
        assert_eq!(b.level(), Level::Project);
        assert_eq!(b.path(), "/100");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110/").unwrap();
        assert_eq!(b.level(), Level::TaskList);
    }

    #[test]
    fn descent_refreshes_children_cache_per_level() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110").unwrap();
        assert_eq!(b.cache.tasklists.len(), 2);
        assert_eq!(b.cache.tasks.len(), 2);
    }

    #[test]
    fn cd_up_keeps_parent_listing_cached_without_refetch() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "0").unwrap();
        let listed = b.list(&api, &no_favs(), None).unwrap();
        let fetches_before = api.fetches.get();
        b.change_dir(&api, &no_favs(), "..").unwrap();
        // Popping does not refetch; the original project list is still
        // cached and lists identically.
        assert_eq!(api.fetches.get(), fetches_before);
        b.change_dir(&api, &no_favs(), "0").unwrap();
        assert_eq!(b.list(&api, &no_favs(), None).unwrap(), listed);
    }

    #[test]
    fn list_without_argument_never_moves() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110").unwrap();
        let before = b.path();
        b.list(&api, &no_favs(), None).unwrap();
        assert_eq!(b.path(), before);
    }

    #[test]
    fn list_with_argument_returns_to_origin() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100").unwrap();
        let lines = b.list(&api, &no_favs(), Some("/200")).unwrap();
        assert_eq!(lines[0], "Task Lists:");
        assert!(lines[1].contains("Ops"));
        assert_eq!(b.path(), "/100");
    }

    #[test]
    fn listing_at_entry_level_is_empty() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir(&api, &no_favs(), "/100/110/111/901").unwrap();
        assert_eq!(b.level(), Level::Entry);
        assert!(b.listing().is_empty());
    }

    #[test]
    fn favorite_expands_to_full_task_path() {
        let api = FakeApi::new();
        let mut favs = IndexMap::new();
        favs.insert("certs".to_string(), "211".to_string());
        let mut b = browser(&api);
        b.change_dir(&api, &favs, "certs").unwrap();
        assert_eq!(b.level(), Level::Task);
        assert_eq!(b.path(), "/200/210/211");
    }

    #[test]
    fn dash_toggles_between_last_two_positions() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir_reversible(&api, &no_favs(), "/100/110").unwrap();
        b.change_dir_reversible(&api, &no_favs(), "/200").unwrap();
        b.change_dir_reversible(&api, &no_favs(), "-").unwrap();
        assert_eq!(b.path(), "/100/110");
        b.change_dir_reversible(&api, &no_favs(), "-").unwrap();
        assert_eq!(b.path(), "/200");
        b.change_dir_reversible(&api, &no_favs(), "-").unwrap();
        assert_eq!(b.path(), "/100/110");
    }

    #[test]
    fn dash_with_no_history_is_a_noop() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        b.change_dir_reversible(&api, &no_favs(), "-").unwrap();
        assert_eq!(b.path(), "/");
    }

    #[test]
    fn prompt_uses_display_names() {
        let api = FakeApi::new();
        let mut b = browser(&api);
        assert_eq!(b.prompt(), "teamwork > ");
        b.change_dir(&api, &no_favs(), "/100/110/0").unwrap();
        assert_eq!(b.prompt(), "teamwork/Apollo/Backend/Design schema > ");
    }
}
