use crate::error::AppError;
use crate::query::SortMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKTABLE_CONFIG_PATH";

const RESET: &str = "\x1b[0m";
const GREY: &str = "\x1b[38;5;250m";

/// ANSI colours for headings and summaries. `None` leaves text unstyled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: Option<&'static str>,
    pub muted: Option<&'static str>,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        paint(self.accent, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        paint(self.muted, text)
    }
}

fn paint(colour: Option<&str>, text: &str) -> String {
    match colour {
        Some(colour) => format!("{colour}{text}{RESET}"),
        None => text.to_string(),
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    let accent = match theme.map(canonical_theme_name).as_deref() {
        Some("noir") => "\x1b[38;5;208m",
        Some("solarized") => "\x1b[38;5;108m",
        _ => return Palette::default(),
    };
    Palette {
        accent: Some(accent),
        muted: Some(GREY),
    }
}

/// Theme names are matched trimmed and lowercased; blank means `default`.
pub fn canonical_theme_name(raw: &str) -> String {
    match raw.trim() {
        "" => "default".to_string(),
        name => name.to_lowercase(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub default_sort: Option<SortMode>,
    /// Command name -> replacement words, e.g. `"urgent": "list --priority High"`.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Config {
    pub fn sort_mode(&self) -> SortMode {
        self.default_sort.unwrap_or_default()
    }

    pub fn palette(&self) -> Palette {
        palette_for_theme(self.theme.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub default_sort: Option<SortMode>,
    pub aliases: HashMap<String, String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    crate::storage::app_file_path(CONFIG_ENV_VAR, CONFIG_FILE_NAME)
}

/// Loads the config, falling back to defaults. A broken file is reported in
/// `error` rather than failing the caller.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.theme = config.theme.as_deref().map(canonical_theme_name);
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_deref() {
        merged.theme = Some(canonical_theme_name(theme));
    }

    if let Some(sort) = overrides.default_sort {
        merged.default_sort = Some(sort);
    }

    for (alias, value) in overrides.aliases.iter() {
        merged.aliases.insert(alias.clone(), value.clone());
    }

    merged
}
