use std::path::Path;
use std::process::{Command, Output};

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tasktable"))
        .args(args)
        .env("TASKTABLE_STORE_PATH", dir.join("tasks.json"))
        .env("TASKTABLE_CONFIG_PATH", dir.join("config.json"))
        .output()
        .expect("failed to run tasktable")
}

fn write_store(dir: &Path) {
    let tasks = serde_json::json!([
        {
            "title": "Math homework",
            "notes": "",
            "due": "",
            "priority": "Low",
            "status": "Todo",
            "tag": "school",
            "created_at": "2025-01-01T00:00:00Z",
            "selected": false
        },
        {
            "title": "groceries",
            "notes": "milk",
            "due": "2025-02-01",
            "priority": "High",
            "status": "Doing",
            "tag": "home",
            "created_at": "2025-01-02T00:00:00Z",
            "selected": false
        },
        {
            "title": "essay",
            "notes": "cite the math paper",
            "due": "2025-01-15",
            "priority": "Medium",
            "status": "Done",
            "tag": "school",
            "created_at": "2025-01-03T00:00:00Z",
            "selected": false
        }
    ]);
    std::fs::write(
        dir.join("tasks.json"),
        serde_json::to_string_pretty(&tasks).unwrap(),
    )
    .unwrap();
}

fn listed_titles(output: &Output) -> Vec<String> {
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("list json");
    rows.as_array()
        .expect("rows array")
        .iter()
        .map(|row| row["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn list_plain_text_shows_table() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["list"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Math homework"));
    assert!(stdout.contains("groceries"));
    assert!(stdout.contains("essay"));
    assert!(stdout.contains("priority"));
}

#[test]
fn list_defaults_to_due_ascending_with_undated_last() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["--json", "list"]);

    assert!(output.status.success());
    assert_eq!(
        listed_titles(&output),
        vec!["essay", "groceries", "Math homework"]
    );
}

#[test]
fn list_query_matches_title_notes_and_tag() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["--json", "list", "--query", "MATH", "--sort", "title"]);

    assert!(output.status.success());
    assert_eq!(listed_titles(&output), vec!["Math homework", "essay"]);
}

#[test]
fn list_status_and_priority_filters_combine() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(
        dir.path(),
        &[
            "--json", "list", "--status", "Todo", "--status", "Doing", "--priority", "High",
        ],
    );

    assert!(output.status.success());
    assert_eq!(listed_titles(&output), vec!["groceries"]);
}

#[test]
fn list_rows_point_back_to_store_positions() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["--json", "list", "--sort", "priority"]);
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(rows[0]["title"], "groceries");
    assert_eq!(rows[0]["row"], 2);
    assert_eq!(rows[2]["title"], "Math homework");
    assert_eq!(rows[2]["row"], 1);
}

#[test]
fn list_uses_config_default_sort_and_aliases() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"default_sort": "newest", "aliases": {"school": "list --query school"}}"#,
    )
    .unwrap();

    let newest = run(dir.path(), &["--json", "list"]);
    assert_eq!(
        listed_titles(&newest),
        vec!["essay", "groceries", "Math homework"]
    );

    let aliased = run(dir.path(), &["--json", "school", "--sort", "title"]);
    assert!(aliased.status.success());
    assert_eq!(listed_titles(&aliased), vec!["Math homework", "essay"]);
}

#[test]
fn list_rejects_unknown_sort_mode() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["list", "--sort", "sideways"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: validation_error"));
}

#[test]
fn stats_reports_completion() {
    let dir = tempfile::tempdir().unwrap();
    write_store(dir.path());

    let output = run(dir.path(), &["--json", "stats"]);

    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["done"], 1);
    assert_eq!(stats["completion_percent"], 33);

    let plain = run(dir.path(), &["stats"]);
    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("Completion: 33%"));
    assert!(stdout.contains("Total 3"));
}
