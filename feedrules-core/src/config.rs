//! Configuration management
//!
//! Engine settings live under the `rules` key of `settings.json` in the data
//! directory. Keys owned by other parts of the reader are preserved on save:
//! ```json
//! {
//!   "rules": { "caseSensitive": true, "defaultPriority": 100 },
//!   "reader": { ... }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::rule::DEFAULT_PRIORITY;

/// Environment override for case sensitivity
pub const CASE_SENSITIVE_ENV: &str = "FEEDRULES_CASE_SENSITIVE";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    rules: RuleSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleSettings {
    #[serde(default = "default_case_sensitive")]
    case_sensitive: bool,
    #[serde(default = "default_priority")]
    default_priority: i32,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            case_sensitive: default_case_sensitive(),
            default_priority: default_priority(),
        }
    }
}

fn default_case_sensitive() -> bool {
    true
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether Contains/Equals/StartsWith/EndsWith/Regex compare case-sensitively
    pub case_sensitive: bool,
    /// Priority assigned to rules submitted with priority <= 0
    pub default_priority: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            default_priority: DEFAULT_PRIORITY,
        }
    }
}

impl EngineConfig {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields the defaults. Case
    /// sensitivity can be forced with `FEEDRULES_CASE_SENSITIVE`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let case_sensitive = match std::env::var(CASE_SENSITIVE_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.rules.case_sensitive,
        };

        // A non-positive default would defeat the normalization it feeds
        let default_priority = if raw.rules.default_priority > 0 {
            raw.rules.default_priority
        } else {
            DEFAULT_PRIORITY
        };

        Ok(Self {
            case_sensitive,
            default_priority,
        })
    }

    /// Save config to the data directory, keeping unrelated settings intact
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;

        settings.rules.case_sensitive = self.case_sensitive;
        settings.rules.default_priority = self.default_priority;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
