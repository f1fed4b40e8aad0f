use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use tasktable_core::config::ConfigOverrides;
use tasktable_core::dates;
use tasktable_core::{Priority, SortMode, Status};
use time::Date;

#[derive(Parser, Debug)]
#[command(
    name = "tasktable",
    author,
    version,
    about = "Personal task table with filters, bulk actions and JSON import/export",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: tasktable add "Math homework 3-1" --due 2025-03-01 --priority High --tag school
    Add {
        title: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_due_date)]
        due: Option<Date>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// Show the task table
    ///
    /// Example: tasktable list --query math --status Todo --status Doing --sort priority
    List {
        /// Case-insensitive search over title, notes and tag
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long = "status", value_name = "STATUS")]
        statuses: Vec<Status>,
        #[arg(long = "priority", value_name = "PRIORITY")]
        priorities: Vec<Priority>,
        /// due-asc, due-desc, priority, newest or title
        #[arg(long)]
        sort: Option<SortMode>,
    },
    /// Show one row
    ///
    /// Example: tasktable show 2
    Show { row: usize },
    /// Edit fields of a row
    ///
    /// Example: tasktable edit 2 --status Doing --due ""
    Edit {
        row: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Empty clears the due date
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Delete a row
    ///
    /// Example: tasktable delete 3
    Delete { row: usize },
    /// Mark rows for bulk actions
    ///
    /// Example: tasktable select 1 4 5
    /// Example: tasktable select --clear
    Select {
        #[arg(required_unless_present = "clear")]
        rows: Vec<usize>,
        #[arg(long, conflicts_with = "rows")]
        clear: bool,
    },
    /// Unmark rows
    ///
    /// Example: tasktable unselect 4
    Unselect {
        #[arg(required = true)]
        rows: Vec<usize>,
    },
    /// Mark every selected row as Done
    CompleteSelected,
    /// Delete every selected row
    DeleteSelected,
    /// Show completion statistics
    Stats,
    /// Write all tasks as pretty-printed JSON ("-" for stdout)
    ///
    /// Example: tasktable export todo_tasks.json
    Export { path: PathBuf },
    /// Replace all tasks with the records of a JSON file
    ///
    /// Example: tasktable import todo_tasks.json
    Import { path: PathBuf },
}

fn parse_due_date(raw: &str) -> Result<Date, String> {
    dates::parse_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got '{}'", raw.trim()))
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    Sort,
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "theme" | "sort" | "default_sort" if remainder.is_some() => {
            return Err(format!("{canonical_field} override cannot have subfields"));
        }
        "theme" => ConfigOverrideTarget::Theme,
        "sort" | "default_sort" => ConfigOverrideTarget::Sort,
        "aliases" | "alias" => {
            let alias_name = remainder
                .filter(|segment| !segment.is_empty())
                .ok_or_else(|| "aliases override requires an alias name".to_string())?;
            ConfigOverrideTarget::Alias(alias_name.to_string())
        }
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds parsed `KEY=VALUE` overrides into one set; later values win.
pub fn build_overrides(raw_overrides: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();

    for raw in raw_overrides {
        let parsed = parse_config_override(raw)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::Sort => {
                let mode = parsed
                    .value
                    .parse::<SortMode>()
                    .map_err(|err| err.message().to_string())?;
                overrides.default_sort = Some(mode);
            }
            ConfigOverrideTarget::Alias(name) => {
                overrides.aliases.insert(name, parsed.value);
            }
        }
    }

    Ok(overrides)
}

/// Collects the values given to `--config-override` ahead of full parsing, so
/// aliases defined on the command line can be expanded before clap sees them.
pub fn scan_config_overrides(args: &[String]) -> Vec<String> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == CONFIG_OVERRIDE_FLAG {
            if let Some(value) = iter.next() {
                values.push(value.clone());
            }
        } else if let Some(value) = arg
            .strip_prefix(CONFIG_OVERRIDE_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            values.push(value.to_string());
        }
    }
    values
}

/// Replaces the command word with its alias expansion, if one is defined.
pub fn expand_alias(
    args: Vec<String>,
    aliases: &HashMap<String, String>,
) -> Result<Vec<String>, String> {
    let mut skip_value = false;
    let mut command_index = None;
    for (index, arg) in args.iter().enumerate() {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == CONFIG_OVERRIDE_FLAG {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        command_index = Some(index);
        break;
    }

    let Some(index) = command_index else {
        return Ok(args);
    };
    let Some(expansion) = aliases.get(&args[index]) else {
        return Ok(args);
    };

    let replacement = split_command_line(expansion)?;
    let mut expanded = Vec::with_capacity(args.len() + replacement.len());
    expanded.extend_from_slice(&args[..index]);
    expanded.extend(replacement);
    expanded.extend_from_slice(&args[index + 1..]);
    Ok(expanded)
}

/// Splits an interactive command line into arguments, honoring double quotes.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            quoted = true;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() || quoted {
                args.push(std::mem::take(&mut current));
                quoted = false;
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err("unterminated quote in command".to_string());
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    Ok(args)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
