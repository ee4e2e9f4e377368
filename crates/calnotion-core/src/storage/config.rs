//! TOML-based application configuration.
//!
//! Stores:
//! - Notion credentials and the target database
//! - Google OAuth client credentials and endpoints
//! - Action item extraction caps
//!
//! Configuration is stored at `~/.config/calnotion/config.toml`. Secrets may
//! also come from the environment (`NOTION_API_KEY`, `NOTION_DATABASE_ID`,
//! `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`), which wins over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::pipeline::ExtractionLimits;

const SECRET_KEYS: [&str; 2] = ["notion.api_key", "google.client_secret"];

/// Notion task database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
}

/// Google Calendar settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_google_base_url")]
    pub base_url: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

/// Action item extraction caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_bulk_max_items")]
    pub bulk_max_items: usize,
    #[serde(default = "default_bulk_title_limit")]
    pub bulk_title_limit: usize,
    #[serde(default = "default_summary_max_items")]
    pub summary_max_items: usize,
    #[serde(default = "default_summary_title_limit")]
    pub summary_title_limit: usize,
    /// Also create meeting summaries for meeting-like events during a sync.
    #[serde(default = "default_true")]
    pub meeting_summaries: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/calnotion/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notion: NotionConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

// Default functions
fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".into()
}
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_google_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".into()
}
fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}
fn default_redirect_port() -> u16 {
    19821
}
fn default_bulk_max_items() -> usize {
    ExtractionLimits::BULK.max_items
}
fn default_bulk_title_limit() -> usize {
    ExtractionLimits::BULK.title_limit
}
fn default_summary_max_items() -> usize {
    ExtractionLimits::SUMMARY.max_items
}
fn default_summary_title_limit() -> usize {
    ExtractionLimits::SUMMARY.title_limit
}
fn default_true() -> bool {
    true
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_id: String::new(),
            base_url: default_notion_base_url(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            calendar_id: default_calendar_id(),
            base_url: default_google_base_url(),
            auth_url: default_google_auth_url(),
            token_url: default_google_token_url(),
            redirect_port: default_redirect_port(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            bulk_max_items: default_bulk_max_items(),
            bulk_title_limit: default_bulk_title_limit(),
            summary_max_items: default_summary_max_items(),
            summary_title_limit: default_summary_title_limit(),
            meeting_summaries: true,
        }
    }
}

impl ExtractionConfig {
    pub fn bulk_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_items: self.bulk_max_items,
            title_limit: self.bulk_title_limit,
        }
    }

    pub fn summary_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_items: self.summary_max_items,
            title_limit: self.summary_title_limit,
        }
    }
}

impl NotionConfig {
    /// Both the API key and the database id are present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.database_id.is_empty()
    }
}

impl GoogleConfig {
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use, then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_from(&Self::path()?)?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Load the file at `path` as-is, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// Environment overrides are not written back: call this on a config
    /// obtained from [`Config::load_file`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Load the file at the default location without environment overrides.
    pub fn load_file() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Overlay secrets found through `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut String); 4] = [
            ("NOTION_API_KEY", &mut self.notion.api_key),
            ("NOTION_DATABASE_ID", &mut self.notion.database_id),
            ("GOOGLE_CLIENT_ID", &mut self.google.client_id),
            ("GOOGLE_CLIENT_SECRET", &mut self.google.client_secret),
        ];
        for (name, field) in targets {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// A copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for key in SECRET_KEYS {
            if copy.get(key).is_some_and(|v| !v.is_empty()) {
                // Keys in SECRET_KEYS are string fields, so this cannot fail.
                let _ = copy.set(key, "********");
            }
        }
        copy
    }
}
