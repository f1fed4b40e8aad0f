use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tasktable_core::config::Palette;
use tasktable_core::{AppError, Row, Stats, Task};

const PROGRESS_WIDTH: usize = 20;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "sel")]
    selected: &'static str,
    title: String,
    notes: String,
    due: String,
    priority: String,
    status: String,
    tag: String,
    created_at: String,
}

impl TableRow {
    fn from_row(row: &Row) -> Self {
        let task = &row.task;
        Self {
            position: row.position,
            selected: if task.selected { "[x]" } else { "[ ]" },
            title: task.title.clone(),
            notes: task.notes.clone(),
            due: display_or_dash(&task.due),
            priority: task.priority.to_string(),
            status: task.status.to_string(),
            tag: task.tag.clone(),
            created_at: task.created_at.clone(),
        }
    }
}

fn display_or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

pub fn task_table(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "No tasks match.".to_string();
    }

    let table_rows: Vec<TableRow> = rows.iter().map(TableRow::from_row).collect();
    Table::new(table_rows).with(Style::modern()).to_string()
}

pub fn stats_summary(stats: &Stats, palette: &Palette) -> String {
    let filled = usize::from(stats.completion_percent) * PROGRESS_WIDTH / 100;
    let bar = format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(PROGRESS_WIDTH - filled)
    );
    let headline = palette.accentize(&format!(
        "Completion: {}% {}",
        stats.completion_percent, bar
    ));
    let breakdown = palette.mutedize(&format!(
        "Total {} · Todo {} · Doing {} · Done {}",
        stats.total, stats.todo, stats.doing, stats.done
    ));
    format!("{headline}\n{breakdown}")
}

pub fn task_json(task: &Task) -> Result<Value, AppError> {
    serde_json::to_value(task).map_err(|err| AppError::invalid_data(err.to_string()))
}

/// A task record with its row number under `row`.
pub fn row_json(row: &Row) -> Result<Value, AppError> {
    let mut value = task_json(&row.task)?;
    if let Value::Object(record) = &mut value {
        record.insert("row".to_string(), Value::from(row.position));
    }
    Ok(value)
}

pub fn rows_json(rows: &[Row]) -> Result<Value, AppError> {
    rows.iter()
        .map(row_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
