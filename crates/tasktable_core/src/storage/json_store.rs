use crate::error::AppError;
use crate::model::Task;
use crate::normalize;
use crate::store::TaskStore;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "TASKTABLE_STORE_PATH";

/// Location of the session file that carries the collection between runs.
pub fn store_path() -> Result<PathBuf, AppError> {
    super::app_file_path(STORE_ENV_VAR, STORE_FILE_NAME)
}

/// Parses an import payload: a JSON array of task-shaped records.
pub fn parse_tasks(content: &str) -> Result<Vec<Task>, AppError> {
    let payload: Value =
        serde_json::from_str(content).map_err(|err| AppError::parse(err.to_string()))?;

    match payload {
        Value::Array(records) => normalize::normalize(&records),
        other => Err(AppError::format(format!(
            "expected a JSON array of tasks, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn render_tasks(tasks: &[Task]) -> Result<String, AppError> {
    serde_json::to_string_pretty(tasks).map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn load_store(path: &Path) -> Result<TaskStore, AppError> {
    if !path.exists() {
        return Ok(TaskStore::new());
    }

    let content = read_file(path)?;
    let mut store = TaskStore::new();
    store
        .import_json(&content)
        .map_err(|err| with_path_context(err, path))?;
    Ok(store)
}

pub fn save_store(path: &Path, store: &TaskStore) -> Result<(), AppError> {
    write_file(path, &store.export_json()?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

pub fn export_to_file(path: &Path, store: &TaskStore) -> Result<usize, AppError> {
    write_file(path, &store.export_json()?)?;
    info!(path = %path.display(), count = store.len(), "exported tasks");
    Ok(store.len())
}

/// Replaces the store with the file's records. On error the store is unchanged.
pub fn import_from_file(path: &Path, store: &mut TaskStore) -> Result<usize, AppError> {
    let content = read_file(path)?;
    let count = store
        .import_json(&content)
        .map_err(|err| with_path_context(err, path))?;
    info!(path = %path.display(), count, "imported tasks");
    Ok(count)
}

fn read_file(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))
}

fn write_file(path: &Path, content: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }
    std::fs::write(path, content).map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))
}

fn with_path_context(err: AppError, path: &Path) -> AppError {
    match err {
        AppError::Parse(message) => AppError::parse(format!("{}: {}", path.display(), message)),
        AppError::Format(message) => AppError::format(format!("{}: {}", path.display(), message)),
        other => other,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
