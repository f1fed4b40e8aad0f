use crate::cli::{Cli, Command, build_overrides};
use crate::render;
use serde_json::json;
use std::path::{Path, PathBuf};
use tasktable_core::config::{Config, merge_overrides};
use tasktable_core::storage::json_store;
use tasktable_core::{AppError, NewTask, Query, Row, TaskPatch, TaskStore};
use tracing::warn;

/// The working collection for one run of the tool, backed by a session file.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    store: TaskStore,
    config: Config,
    /// Why the session file could not be read. Only `import` may replace it.
    load_error: Option<AppError>,
}

/// Text to print, and whether the command changed the collection.
struct Outcome {
    output: String,
    changed: bool,
}

impl Outcome {
    fn read(output: String) -> Self {
        Self {
            output,
            changed: false,
        }
    }

    fn write(output: String) -> Self {
        Self {
            output,
            changed: true,
        }
    }
}

impl Session {
    pub fn open(path: PathBuf, config: Config) -> Result<Self, AppError> {
        let (store, load_error) = match json_store::load_store(&path) {
            Ok(store) => (store, None),
            Err(err @ (AppError::Parse(_) | AppError::Format(_))) => {
                warn!(path = %path.display(), error = %err, "session file is unreadable");
                (TaskStore::new(), Some(err))
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            store,
            config,
            load_error,
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one command and returns what should be printed on stdout. The
    /// command works on a copy of the collection, which replaces it only once
    /// the session file has been written.
    pub fn run(&mut self, cli: Cli) -> Result<String, AppError> {
        if let Some(err) = &self.load_error
            && !matches!(cli.command, Command::Import { .. })
        {
            return Err(err.clone());
        }

        let overrides = build_overrides(&cli.config_override).map_err(AppError::validation)?;
        let config = merge_overrides(&self.config, &overrides);

        let mut working = self.store.clone();
        let outcome = execute(&mut working, cli.command, cli.json, &config)?;
        if outcome.changed {
            json_store::save_store(&self.path, &working)?;
            self.store = working;
            self.load_error = None;
        }

        Ok(outcome.output)
    }
}

fn execute(
    store: &mut TaskStore,
    command: Command,
    as_json: bool,
    config: &Config,
) -> Result<Outcome, AppError> {
    let outcome = match command {
        Command::Add {
            title,
            notes,
            due,
            priority,
            status,
            tag,
        } => {
            let task = store.add(NewTask {
                title: title.unwrap_or_default(),
                notes,
                due,
                priority: priority.unwrap_or_default(),
                status: status.unwrap_or_default(),
                tag,
            })?;
            Outcome::write(if as_json {
                render::task_json(&task)?.to_string()
            } else {
                format!("Added task: {} (row {})", task.title, store.len())
            })
        }
        Command::List {
            query,
            statuses,
            priorities,
            sort,
        } => {
            let query = Query {
                text: query.unwrap_or_default(),
                statuses: statuses.into_iter().collect(),
                priorities: priorities.into_iter().collect(),
            };
            let mode = sort.unwrap_or_else(|| config.sort_mode());
            let rows = tasktable_core::query::view(store.tasks(), &query, mode);
            Outcome::read(if as_json {
                render::rows_json(&rows)?.to_string()
            } else {
                let table = render::task_table(&rows);
                match store.selected_count() {
                    0 => table,
                    selected => format!("{table}\n{selected} selected"),
                }
            })
        }
        Command::Show { row } => {
            let row = Row {
                position: row,
                task: store.get(row)?.clone(),
            };
            Outcome::read(if as_json {
                render::row_json(&row)?.to_string()
            } else {
                render::task_table(std::slice::from_ref(&row))
            })
        }
        Command::Edit {
            row,
            title,
            notes,
            due,
            priority,
            status,
            tag,
        } => {
            let patch = TaskPatch {
                title,
                notes,
                due,
                priority,
                status,
                tag,
                selected: None,
            };
            if patch.is_empty() {
                return Err(AppError::validation("nothing to edit"));
            }
            let task = store.edit(row, &patch)?;
            Outcome::write(if as_json {
                render::task_json(&task)?.to_string()
            } else {
                format!("Updated task: {} (row {row})", task.title)
            })
        }
        Command::Delete { row } => {
            let task = store.remove(row)?;
            Outcome::write(if as_json {
                render::task_json(&task)?.to_string()
            } else {
                format!("Deleted task: {} (row {row})", task.title)
            })
        }
        Command::Select { rows, clear } => {
            let count = if clear {
                store.clear_selection()
            } else {
                store.set_selected(&rows, true)?
            };
            let verb = if clear { "Cleared" } else { "Selected" };
            Outcome::write(count_output(
                as_json,
                count,
                &format!("{verb} {count} task(s)"),
            ))
        }
        Command::Unselect { rows } => {
            let count = store.set_selected(&rows, false)?;
            Outcome::write(count_output(
                as_json,
                count,
                &format!("Unselected {count} task(s)"),
            ))
        }
        Command::CompleteSelected => {
            let count = store.bulk_complete();
            Outcome::write(count_output(
                as_json,
                count,
                &format!("Completed {count} selected task(s)"),
            ))
        }
        Command::DeleteSelected => {
            let count = store.bulk_delete();
            Outcome::write(count_output(
                as_json,
                count,
                &format!("Deleted {count} selected task(s)"),
            ))
        }
        Command::Stats => {
            let stats = store.stats();
            Outcome::read(if as_json {
                serde_json::to_string(&stats)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?
            } else {
                render::stats_summary(&stats, &config.palette())
            })
        }
        Command::Export { path } => Outcome::read(if path == Path::new("-") {
            store.export_json()?
        } else {
            let count = json_store::export_to_file(&path, store)?;
            count_output(
                as_json,
                count,
                &format!("Exported {count} task(s) to {}", path.display()),
            )
        }),
        Command::Import { path } => {
            let count = json_store::import_from_file(&path, store)?;
            Outcome::write(count_output(
                as_json,
                count,
                &format!("Imported {count} task(s) from {}", path.display()),
            ))
        }
    };

    Ok(outcome)
}

fn count_output(as_json: bool, count: usize, message: &str) -> String {
    if as_json {
        json!({ "count": count }).to_string()
    } else {
        message.to_string()
    }
}
