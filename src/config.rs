// ⚙️ Config - data directory, quick categories, pot categories
// Stored as JSON under the user's config directory. Missing keys fall
// back to defaults so older files keep loading.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "budget-review";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where ledger files are looked for
    pub data_dir: PathBuf,
    /// Single-key shortcut → category
    pub quick_categories: BTreeMap<String, String>,
    pub pot_categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let quick_categories = [
            ("g", "Groceries"),
            ("e", "Entertainment"),
            ("t", "Transport"),
            ("o", "Eating Out"),
            ("n", "General"),
            ("h", "Holidays"),
            ("p", "Pot"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let pot_categories = [
            "Bills",
            "Car maintenance",
            "Phones",
            "Work and commuting",
            "Dogs",
            "House",
            "Gifts",
            "Holidays",
            "Events",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Config {
            data_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("budget_data"),
            quick_categories,
            pot_categories,
        }
    }
}

impl Config {
    /// `<config_dir>/budget-review/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location; defaults when there is no file.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let data = fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;
        serde_json::from_str(&data).map_err(|source| LedgerError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| LedgerError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| LedgerError::io(path, e))
    }

    pub fn quick_category(&self, key: &str) -> Option<&str> {
        self.quick_categories.get(key).map(String::as_str)
    }

    /// Sorted pot categories containing `query`, ignoring case. An empty
    /// query matches everything.
    pub fn matching_pot_categories(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();
        let mut matches: Vec<&str> = self
            .pot_categories
            .iter()
            .filter(|c| c.to_lowercase().contains(&query))
            .map(String::as_str)
            .collect();
        matches.sort_unstable();
        matches
    }
}
