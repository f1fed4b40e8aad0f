use crate::dates;
use crate::error::AppError;
use crate::model::{Priority, Status, Task};
use crate::normalize;
use crate::stats::Stats;
use crate::storage::json_store;
use serde_json::Value;
use time::Date;
use tracing::{debug, info};

/// Field values for a new task, as entered in the add form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub notes: String,
    pub due: Option<Date>,
    pub priority: Priority,
    pub status: Status,
    pub tag: String,
}

#[cfg(test)]
impl NewTask {
    pub fn titled<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A direct edit of one row. `None` leaves the field untouched; the creation
/// time is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub due: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub tag: Option<String>,
    pub selected: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Ordered task collection. Rows are addressed by 1-based position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, position: usize) -> Result<&Task, AppError> {
        let index = self.index_of(position)?;
        Ok(&self.tasks[index])
    }

    pub fn add(&mut self, new_task: NewTask) -> Result<Task, AppError> {
        let created_at = dates::now_timestamp()?;
        self.add_with_created_at(new_task, created_at)
    }

    fn add_with_created_at(
        &mut self,
        new_task: NewTask,
        created_at: String,
    ) -> Result<Task, AppError> {
        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title is required"));
        }

        let task = Task {
            title: title.to_string(),
            notes: new_task.notes.trim().to_string(),
            due: new_task.due.map(dates::format_date).unwrap_or_default(),
            priority: new_task.priority,
            status: new_task.status,
            tag: new_task.tag.trim().to_string(),
            created_at,
            selected: false,
        };

        self.tasks.push(task.clone());
        debug!(position = self.tasks.len(), "added task");
        Ok(task)
    }

    /// Applies `patch` to a row and re-normalizes it, keeping its creation time.
    pub fn edit(&mut self, position: usize, patch: &TaskPatch) -> Result<Task, AppError> {
        let index = self.index_of(position)?;
        let current = &self.tasks[index];

        if let Some(title) = patch.title.as_deref()
            && title.trim().is_empty()
        {
            return Err(AppError::validation("title is required"));
        }

        let mut raw =
            serde_json::to_value(current).map_err(|err| AppError::invalid_data(err.to_string()))?;
        if let Value::Object(record) = &mut raw {
            let mut set = |key: &str, value: Option<Value>| {
                if let Some(value) = value {
                    record.insert(key.to_string(), value);
                }
            };
            set("title", patch.title.clone().map(Value::String));
            set("notes", patch.notes.clone().map(Value::String));
            set("due", patch.due.clone().map(Value::String));
            set("priority", patch.priority.map(|p| Value::from(p.label())));
            set("status", patch.status.map(|s| Value::from(s.label())));
            set("tag", patch.tag.clone().map(Value::String));
            set("selected", patch.selected.map(Value::Bool));
        }

        let edited = normalize::normalize_record(&raw, &current.created_at)
            .ok_or_else(|| AppError::validation("title is required"))?;
        self.tasks[index] = edited.clone();
        debug!(position, "edited task");
        Ok(edited)
    }

    pub fn remove(&mut self, position: usize) -> Result<Task, AppError> {
        let index = self.index_of(position)?;
        debug!(position, "removed task");
        Ok(self.tasks.remove(index))
    }

    /// Marks or unmarks rows for bulk actions. All positions are checked
    /// before any row changes.
    pub fn set_selected(&mut self, positions: &[usize], selected: bool) -> Result<usize, AppError> {
        let indices = positions
            .iter()
            .map(|position| self.index_of(*position))
            .collect::<Result<Vec<_>, _>>()?;

        for index in &indices {
            self.tasks[*index].selected = selected;
        }
        Ok(indices.len())
    }

    pub fn clear_selection(&mut self) -> usize {
        let mut cleared = 0;
        for task in self.tasks.iter_mut().filter(|task| task.selected) {
            task.selected = false;
            cleared += 1;
        }
        cleared
    }

    pub fn selected_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.selected).count()
    }

    /// Replaces the whole collection with already canonical records.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        info!(previous = self.tasks.len(), next = tasks.len(), "replacing task collection");
        self.tasks = tasks;
    }

    /// Parses an import payload, normalizes every record and replaces the
    /// collection. On error the store is unchanged.
    pub fn import_json(&mut self, content: &str) -> Result<usize, AppError> {
        let tasks = json_store::parse_tasks(content)?;
        let count = tasks.len();
        self.replace_all(tasks);
        Ok(count)
    }

    pub fn export_json(&self) -> Result<String, AppError> {
        json_store::render_tasks(&self.tasks)
    }

    /// Sets every selected row to Done and clears its selection.
    pub fn bulk_complete(&mut self) -> usize {
        let mut completed = 0;
        for task in self.tasks.iter_mut().filter(|task| task.selected) {
            task.status = Status::Done;
            task.selected = false;
            completed += 1;
        }
        debug!(completed, "bulk complete");
        completed
    }

    pub fn bulk_delete(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.selected);
        let removed = before - self.tasks.len();
        debug!(removed, "bulk delete");
        removed
    }

    pub fn export_snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    fn index_of(&self, position: usize) -> Result<usize, AppError> {
        if position == 0 || position > self.tasks.len() {
            return Err(AppError::validation(format!(
                "row {position} not found (store has {} rows)",
                self.tasks.len()
            )));
        }
        Ok(position - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::{NewTask, TaskPatch, TaskStore};
    use crate::model::{Priority, Status, Task};
    use time::macros::date;

    const STAMP: &str = "2025-01-01T00:00:00Z";

    fn task(title: &str, selected: bool) -> Task {
        Task {
            title: title.to_string(),
            notes: String::new(),
            due: String::new(),
            priority: Priority::Medium,
            status: Status::Todo,
            tag: String::new(),
            created_at: STAMP.to_string(),
            selected,
        }
    }

    #[test]
    fn add_appends_trimmed_unselected_task() {
        let mut store = TaskStore::new();
        let added = store
            .add(NewTask {
                title: "  math homework  ".to_string(),
                notes: " p.3 ".to_string(),
                due: Some(date!(2024 - 01 - 01)),
                priority: Priority::High,
                status: Status::Doing,
                tag: " school ".to_string(),
            })
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(added.title, "math homework");
        assert_eq!(added.notes, "p.3");
        assert_eq!(added.tag, "school");
        assert_eq!(added.due, "2024-01-01");
        assert_eq!(added.priority, Priority::High);
        assert_eq!(added.status, Status::Doing);
        assert!(!added.selected);
        assert!(!added.created_at.is_empty());
        assert!(added.created_time().is_some());
        assert_eq!(store.tasks()[0], added);
    }

    #[test]
    fn add_rejects_blank_title() {
        let mut store = TaskStore::from_tasks(vec![task("existing", false)]);

        for title in ["", "   "] {
            let err = store.add(NewTask::titled(title)).unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn edit_renormalizes_and_keeps_created_at() {
        let mut store = TaskStore::from_tasks(vec![task("draft", false)]);

        let edited = store
            .edit(
                1,
                &TaskPatch {
                    title: Some("  final  ".to_string()),
                    due: Some("2024-05-06T10:00:00".to_string()),
                    priority: Some(Priority::Low),
                    selected: Some(true),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(edited.title, "final");
        assert_eq!(edited.due, "2024-05-06");
        assert_eq!(edited.priority, Priority::Low);
        assert!(edited.selected);
        assert_eq!(edited.created_at, STAMP);
        assert_eq!(store.tasks()[0], edited);
    }

    #[test]
    fn edit_can_clear_due_date() {
        let mut original = task("dated", false);
        original.due = "2024-01-01".to_string();
        let mut store = TaskStore::from_tasks(vec![original]);

        let edited = store
            .edit(
                1,
                &TaskPatch {
                    due: Some(String::new()),
                    ..TaskPatch::default()
                },
            )
            .unwrap();

        assert_eq!(edited.due, "");
    }

    #[test]
    fn edit_rejects_blank_title_and_unknown_rows() {
        let mut store = TaskStore::from_tasks(vec![task("keep", false)]);
        let blank = TaskPatch {
            title: Some("  ".to_string()),
            ..TaskPatch::default()
        };

        assert_eq!(store.edit(1, &blank).unwrap_err().code(), "validation_error");
        assert_eq!(
            store.edit(2, &TaskPatch::default()).unwrap_err().code(),
            "validation_error"
        );
        assert_eq!(store.tasks()[0].title, "keep");
    }

    #[test]
    fn set_selected_is_all_or_nothing() {
        let mut store = TaskStore::from_tasks(vec![task("a", false), task("b", false)]);

        let err = store.set_selected(&[1, 3], true).unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(store.selected_count(), 0);

        assert_eq!(store.set_selected(&[1, 2], true).unwrap(), 2);
        assert_eq!(store.selected_count(), 2);
        assert_eq!(store.clear_selection(), 2);
        assert_eq!(store.selected_count(), 0);
    }

    #[test]
    fn bulk_complete_touches_only_selected_rows() {
        let mut store = TaskStore::from_tasks(vec![
            task("a", true),
            task("b", false),
            task("c", true),
        ]);

        assert_eq!(store.bulk_complete(), 2);

        let tasks = store.tasks();
        assert_eq!(tasks[0].status, Status::Done);
        assert!(!tasks[0].selected);
        assert_eq!(tasks[1], task("b", false));
        assert_eq!(tasks[2].status, Status::Done);
        assert!(!tasks[2].selected);
    }

    #[test]
    fn bulk_complete_without_selection_is_a_no_op() {
        let mut store = TaskStore::from_tasks(vec![task("a", false)]);
        let before = store.clone();

        assert_eq!(store.bulk_complete(), 0);
        assert_eq!(store, before);
    }

    #[test]
    fn bulk_delete_removes_selected_rows() {
        let mut store = TaskStore::from_tasks(vec![
            task("a", false),
            task("b", true),
            task("c", false),
            task("d", true),
            task("e", false),
        ]);

        assert_eq!(store.bulk_delete(), 2);
        assert_eq!(store.len(), 3);
        assert!(store.tasks().iter().all(|task| !task.selected));
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "e"]);
    }

    #[test]
    fn get_addresses_rows_by_position() {
        let store = TaskStore::from_tasks(vec![task("a", false), task("b", true)]);

        assert_eq!(store.get(2).unwrap().title, "b");
        assert_eq!(store.get(0).unwrap_err().code(), "validation_error");
        assert_eq!(store.get(3).unwrap_err().code(), "validation_error");
    }

    #[test]
    fn remove_returns_the_row() {
        let mut store = TaskStore::from_tasks(vec![task("a", false), task("b", false)]);

        let removed = store.remove(2).unwrap();

        assert_eq!(removed.title, "b");
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(0).unwrap_err().code(), "validation_error");
    }

    #[test]
    fn export_then_import_round_trips() {
        let mut dated = task("dated", true);
        dated.due = "2024-01-01".to_string();
        dated.status = Status::Done;
        dated.priority = Priority::High;
        dated.tag = "학교".to_string();
        let store = TaskStore::from_tasks(vec![dated, task("plain", false)]);

        let exported = store.export_json().unwrap();
        let mut restored = TaskStore::new();
        let count = restored.import_json(&exported).unwrap();

        assert_eq!(count, 2);
        assert_eq!(restored.export_snapshot(), store.export_snapshot());
    }

    #[test]
    fn replace_all_with_snapshot_is_identity() {
        let store = TaskStore::from_tasks(vec![task("a", true), task("b", false)]);
        let mut other = TaskStore::from_tasks(vec![task("old", false)]);

        other.replace_all(store.export_snapshot());

        assert_eq!(other, store);
    }

    #[test]
    fn failed_import_leaves_store_unchanged() {
        let mut store = TaskStore::from_tasks(vec![task("keep", false)]);
        let before = store.clone();

        let format = store.import_json(r#"{"title": "not a list"}"#).unwrap_err();
        let parse = store.import_json("[{").unwrap_err();

        assert_eq!(format.code(), "format_error");
        assert_eq!(parse.code(), "parse_error");
        assert_eq!(store, before);
    }

    #[test]
    fn stats_reflect_store() {
        let mut done = task("done", false);
        done.status = Status::Done;
        let store = TaskStore::from_tasks(vec![done, task("a", false), task("b", false), task("c", false)]);

        let stats = store.stats();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.completion_percent, 25);
        assert_eq!(TaskStore::new().stats().completion_percent, 0);
    }
}
