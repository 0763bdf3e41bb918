//! Configuration types for the task bot.

use crate::calendar::MAX_YEAR_SPAN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `telegram.bot_token`.
pub const TOKEN_ENV_VAR: &str = "TASKBOT_TELEGRAM_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram Bot API transport settings.
    pub telegram: TelegramConfig,
    /// Task store settings.
    pub store: StoreConfig,
    /// Reminder scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Dialogue limits and date picker layout.
    pub dialog: DialogConfig,
    /// Log file output.
    pub logging: LoggingConfig,
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather. Empty means "read from the environment".
    pub bot_token: String,
    /// API base URL (overridable for tests and self-hosted API servers).
    pub api_base: String,
    /// Long-polling timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
    /// User ids allowed to talk to the bot. Empty allows everyone.
    pub allowed_user_ids: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_owned(),
            poll_timeout_secs: 30,
            allowed_user_ids: Vec::new(),
        }
    }
}

impl TelegramConfig {
    /// Token from the environment when set, otherwise from the file.
    #[must_use]
    pub fn effective_token(&self) -> String {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => token.trim().to_owned(),
            _ => self.bot_token.trim().to_owned(),
        }
    }
}

/// Task store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("tasks.db"),
        }
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between due-job checks, in milliseconds.
    pub tick_interval_ms: u64,
    /// JSON file holding pending reminder jobs. `None` keeps jobs in memory
    /// only, so a restart loses them.
    pub state_path: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            state_path: None,
        }
    }
}

/// Dialogue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// Maximum task title length in characters.
    pub max_title_chars: usize,
    /// Years shown per page of the date picker's year step, 1 to 12.
    pub picker_year_span: i32,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            max_title_chars: 256,
            picker_year_span: 4,
        }
    }
}

/// Log file configuration. Logs always go to stderr as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files (`None` = stderr only).
    pub directory: Option<PathBuf>,
    /// Log file name prefix.
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "taskbot.log".to_owned(),
        }
    }
}

/// Severity of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

/// Configuration validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub id: &'static str,
    pub severity: ConfigSeverity,
    pub summary: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskbot")
}

impl BotConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::BotError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/taskbot/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("taskbot")
            .join("config.toml")
    }

    /// Validate without network calls.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.telegram.effective_token().is_empty() {
            issues.push(ConfigIssue {
                id: "telegram-missing-token",
                severity: ConfigSeverity::Error,
                summary: format!(
                    "Telegram bot token is empty; set telegram.bot_token or {TOKEN_ENV_VAR}."
                ),
            });
        }
        if url::Url::parse(&self.telegram.api_base).is_err() {
            issues.push(ConfigIssue {
                id: "telegram-invalid-api-base",
                severity: ConfigSeverity::Error,
                summary: format!("`{}` is not a valid URL.", self.telegram.api_base),
            });
        }
        if self.telegram.allowed_user_ids.is_empty() {
            issues.push(ConfigIssue {
                id: "telegram-open-allowlist",
                severity: ConfigSeverity::Warning,
                summary: "No allowed user ids configured; every user can talk to the bot."
                    .to_owned(),
            });
        }
        if self.scheduler.tick_interval_ms == 0 {
            issues.push(ConfigIssue {
                id: "scheduler-zero-tick",
                severity: ConfigSeverity::Error,
                summary: "scheduler.tick_interval_ms must be greater than zero.".to_owned(),
            });
        }
        if self.dialog.max_title_chars == 0 {
            issues.push(ConfigIssue {
                id: "dialog-zero-title-limit",
                severity: ConfigSeverity::Error,
                summary: "dialog.max_title_chars must be greater than zero.".to_owned(),
            });
        }
        if !(1..=MAX_YEAR_SPAN).contains(&self.dialog.picker_year_span) {
            issues.push(ConfigIssue {
                id: "dialog-invalid-year-span",
                severity: ConfigSeverity::Error,
                summary: format!(
                    "dialog.picker_year_span must be between 1 and {MAX_YEAR_SPAN}."
                ),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid_apart_from_token() {
        let mut config = BotConfig::default();
        config.telegram.bot_token = "123:abc".to_owned();
        config.telegram.allowed_user_ids = vec![1];
        assert!(config.validate().is_empty(), "{:?}", config.validate());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = BotConfig::default();
        config.telegram.poll_timeout_secs = 5;
        config.scheduler.state_path = Some(dir.path().join("jobs.json"));
        config.dialog.max_title_chars = 64;

        config.save_to_file(&path).unwrap();
        let loaded = BotConfig::from_file(&path).unwrap();
        assert_eq!(loaded.telegram.poll_timeout_secs, 5);
        assert_eq!(loaded.scheduler.state_path, config.scheduler.state_path);
        assert_eq!(loaded.dialog.max_title_chars, 64);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: BotConfig = toml::from_str("[telegram]\nbot_token = \"t\"\n").unwrap();
        assert_eq!(config.telegram.bot_token, "t");
        assert_eq!(config.scheduler.tick_interval_ms, 1_000);
        assert_eq!(config.dialog.picker_year_span, 4);
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(BotConfig::from_file(&path).is_err());
    }

    #[test]
    fn validation_flags_blocking_values() {
        let mut config = BotConfig::default();
        config.telegram.bot_token = "t".to_owned();
        config.telegram.api_base = "not a url".to_owned();
        config.scheduler.tick_interval_ms = 0;
        config.dialog.picker_year_span = 0;

        let ids: Vec<&str> = config.validate().iter().map(|i| i.id).collect();
        assert!(ids.contains(&"telegram-invalid-api-base"));
        assert!(ids.contains(&"scheduler-zero-tick"));
        assert!(ids.contains(&"dialog-invalid-year-span"));
        assert!(ids.contains(&"telegram-open-allowlist"));
    }

    #[test]
    fn year_span_must_fit_one_picker_page() {
        let span_issue = |span: i32| {
            let mut config = BotConfig::default();
            config.dialog.picker_year_span = span;
            config
                .validate()
                .iter()
                .any(|i| i.id == "dialog-invalid-year-span" && i.severity == ConfigSeverity::Error)
        };
        assert!(!span_issue(1));
        assert!(!span_issue(MAX_YEAR_SPAN));
        assert!(span_issue(MAX_YEAR_SPAN + 1));
        assert!(span_issue(i32::MAX));
        assert!(span_issue(-3));
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = BotConfig::default_config_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.ends_with("config.toml"));
        assert!(path_str.contains("taskbot"));
    }
}
