//! Configuration loading for questlog.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.questlog/config.toml`)
//! 3. User config (`~/.questlog/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Calendar, NegativeXpPolicy};
use crate::error::{FailOpen, QuestlogError, Result};

/// Default timezone for day and hour comparisons.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Default XP value for new tasks.
pub const DEFAULT_TASK_XP: u32 = 10;

/// Main configuration struct for questlog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Timezone policy.
    pub clock: ClockConfig,
    /// XP adjustment policy.
    pub xp: XpConfig,
    /// Task defaults.
    pub tasks: TasksConfig,
}

/// Timezone policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClockConfig {
    /// IANA timezone name used for calendar-day and hour comparisons.
    pub timezone: String,
}

impl ClockConfig {
    /// Check if a timezone name is a known IANA zone.
    pub fn is_valid_timezone(value: &str) -> bool {
        Calendar::from_name(value).is_ok()
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// XP adjustment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct XpConfig {
    /// What happens when an adjustment would take XP below zero.
    pub negative_policy: NegativeXpPolicy,
}

/// Task defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TasksConfig {
    /// XP granted by tasks created without an explicit value.
    pub default_xp: u32,
}

impl TasksConfig {
    /// Check if an XP value is usable for a task (must be positive).
    pub fn is_valid_xp(value: u32) -> bool {
        value > 0
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_xp: DEFAULT_TASK_XP,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.questlog/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = questlog_home()?;
        let config_path = home.join("config.toml");
        if !config_path.exists() {
            return None;
        }
        Self::load_from_file(&config_path)
            .map(Some)
            .fail_open_default("loading user config")
    }

    /// Load project config from the nearest `.questlog/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = find_project_dir(cwd)?.join("config.toml");
        if !config_path.exists() {
            return None;
        }
        Self::load_from_file(&config_path)
            .map(Some)
            .fail_open_default("loading project config")
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| QuestlogError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| QuestlogError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // QUESTLOG_TIMEZONE
        if let Ok(val) = env::var("QUESTLOG_TIMEZONE") {
            if ClockConfig::is_valid_timezone(&val) {
                self.clock.timezone = val;
            } else {
                tracing::warn!(
                    "Invalid QUESTLOG_TIMEZONE value '{}'. Expected an IANA zone name. Using '{}'.",
                    val,
                    self.clock.timezone
                );
            }
        }

        // QUESTLOG_NEGATIVE_XP
        if let Ok(val) = env::var("QUESTLOG_NEGATIVE_XP") {
            match NegativeXpPolicy::parse(&val) {
                Some(policy) => self.xp.negative_policy = policy,
                None => tracing::warn!(
                    "Invalid QUESTLOG_NEGATIVE_XP value '{}'. Valid values: clamp, reject. Using '{}'.",
                    val,
                    self.xp.negative_policy.as_str()
                ),
            }
        }

        // QUESTLOG_DEFAULT_XP
        if let Ok(val) = env::var("QUESTLOG_DEFAULT_XP") {
            match val.parse::<u32>() {
                Ok(n) if TasksConfig::is_valid_xp(n) => self.tasks.default_xp = n,
                _ => tracing::warn!(
                    "Invalid QUESTLOG_DEFAULT_XP value '{}'. Expected a positive integer. Using '{}'.",
                    val,
                    self.tasks.default_xp
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field. A layer cannot set
    /// a value back to its default to undo a lower layer's customization.
    /// Invalid values are ignored with a warning, as for the environment.
    fn merge(mut self, other: Config) -> Self {
        let default_clock = ClockConfig::default();
        if other.clock.timezone != default_clock.timezone {
            if ClockConfig::is_valid_timezone(&other.clock.timezone) {
                self.clock.timezone = other.clock.timezone;
            } else {
                tracing::warn!(
                    "Invalid clock.timezone value '{}'. Expected an IANA zone name. Using '{}'.",
                    other.clock.timezone,
                    self.clock.timezone
                );
            }
        }

        if other.xp.negative_policy != NegativeXpPolicy::default() {
            self.xp.negative_policy = other.xp.negative_policy;
        }

        let default_tasks = TasksConfig::default();
        if other.tasks.default_xp != default_tasks.default_xp {
            if TasksConfig::is_valid_xp(other.tasks.default_xp) {
                self.tasks.default_xp = other.tasks.default_xp;
            } else {
                tracing::warn!(
                    "Invalid tasks.default_xp value '{}'. Expected a positive integer. Using '{}'.",
                    other.tasks.default_xp,
                    self.tasks.default_xp
                );
            }
        }

        self
    }

    /// Calendar for the configured timezone.
    ///
    /// An unknown zone name falls back to UTC with a warning.
    pub fn calendar(&self) -> Calendar {
        Calendar::from_name(&self.clock.timezone).fail_open_default("resolving clock.timezone")
    }
}

/// Get the questlog data directory.
///
/// Checks `QUESTLOG_HOME` first, then falls back to `~/.questlog`.
/// An empty `QUESTLOG_HOME` is ignored.
pub fn questlog_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("QUESTLOG_HOME") {
        if home.is_empty() {
            tracing::warn!("QUESTLOG_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("QUESTLOG_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".questlog"));
    }

    let fallback_path = env::temp_dir().join("questlog");
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Find the nearest `.questlog/` directory at or above `cwd`.
pub fn find_project_dir(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(".questlog"))
        .find(|dir| dir.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write_project_config(dir: &Path, content: &str) {
        let config_dir = dir.join(".questlog");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.clock.timezone, "UTC");
        assert_eq!(config.xp.negative_policy, NegativeXpPolicy::Clamp);
        assert_eq!(config.tasks.default_xp, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[clock]
timezone = "Europe/Madrid"

[xp]
negative_policy = "reject"

[tasks]
default_xp = 25
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.clock.timezone, "Europe/Madrid");
        assert_eq!(config.xp.negative_policy, NegativeXpPolicy::Reject);
        assert_eq!(config.tasks.default_xp, 25);
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[clock\ntimezone = ").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, QuestlogError::Config { .. }));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[tasks]\ndefault_xp = 40\n").unwrap();
        assert_eq!(config.tasks.default_xp, 40);
        assert_eq!(config.clock.timezone, "UTC");
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let home = TempDir::new().unwrap();
        env::set_var("QUESTLOG_HOME", home.path());
        fs::write(
            home.path().join("config.toml"),
            "[clock]\ntimezone = \"Asia/Tokyo\"\n[tasks]\ndefault_xp = 15\n",
        )
        .unwrap();

        let project = TempDir::new().unwrap();
        write_project_config(project.path(), "[clock]\ntimezone = \"America/Chicago\"\n");

        let config = Config::load_from_cwd(project.path());
        assert_eq!(config.clock.timezone, "America/Chicago");
        assert_eq!(config.tasks.default_xp, 15);

        env::remove_var("QUESTLOG_HOME");
    }

    #[test]
    #[serial]
    fn test_project_config_found_from_subdirectory() {
        let home = TempDir::new().unwrap();
        env::set_var("QUESTLOG_HOME", home.path());

        let project = TempDir::new().unwrap();
        write_project_config(project.path(), "[tasks]\ndefault_xp = 70\n");
        let nested = project.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested);
        assert_eq!(config.tasks.default_xp, 70);

        env::remove_var("QUESTLOG_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("QUESTLOG_TIMEZONE", "Europe/Berlin");
        env::set_var("QUESTLOG_NEGATIVE_XP", "reject");
        env::set_var("QUESTLOG_DEFAULT_XP", "35");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.clock.timezone, "Europe/Berlin");
        assert_eq!(config.xp.negative_policy, NegativeXpPolicy::Reject);
        assert_eq!(config.tasks.default_xp, 35);

        env::remove_var("QUESTLOG_TIMEZONE");
        env::remove_var("QUESTLOG_NEGATIVE_XP");
        env::remove_var("QUESTLOG_DEFAULT_XP");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_values_ignored() {
        env::set_var("QUESTLOG_TIMEZONE", "Nowhere/Special");
        env::set_var("QUESTLOG_NEGATIVE_XP", "overdraft");
        env::set_var("QUESTLOG_DEFAULT_XP", "0");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config, Config::default());

        env::remove_var("QUESTLOG_TIMEZONE");
        env::remove_var("QUESTLOG_NEGATIVE_XP");
        env::remove_var("QUESTLOG_DEFAULT_XP");
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut base = Config::default();
        base.tasks.default_xp = 20;

        let mut other = Config::default();
        other.xp.negative_policy = NegativeXpPolicy::Reject;

        let merged = base.merge(other);
        assert_eq!(merged.tasks.default_xp, 20);
        assert_eq!(merged.xp.negative_policy, NegativeXpPolicy::Reject);
    }

    #[test]
    fn test_calendar_falls_back_to_utc() {
        let mut config = Config::default();
        config.clock.timezone = "Not/AZone".to_string();
        assert_eq!(config.calendar(), Calendar::default());

        config.clock.timezone = "Asia/Tokyo".to_string();
        assert_eq!(config.calendar().timezone(), chrono_tz::Tz::Asia__Tokyo);
    }

    #[test]
    #[serial]
    fn test_invalid_file_values_keep_lower_layer() {
        let home = TempDir::new().unwrap();
        env::set_var("QUESTLOG_HOME", home.path());
        fs::write(
            home.path().join("config.toml"),
            "[tasks]\ndefault_xp = 15\n",
        )
        .unwrap();

        let project = TempDir::new().unwrap();
        write_project_config(
            project.path(),
            "[clock]\ntimezone = \"Mars/Olympus\"\n[tasks]\ndefault_xp = 0\n",
        );

        let config = Config::load_from_cwd(project.path());
        assert_eq!(config.tasks.default_xp, 15);
        assert_eq!(config.clock.timezone, "UTC");

        env::remove_var("QUESTLOG_HOME");
    }

    #[test]
    #[serial]
    fn test_questlog_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("QUESTLOG_HOME", dir.path());

        assert_eq!(questlog_home().unwrap(), dir.path());

        env::remove_var("QUESTLOG_HOME");
    }

    #[test]
    #[serial]
    fn test_questlog_home_empty_env() {
        env::set_var("QUESTLOG_HOME", "");

        let home = questlog_home();
        assert!(home.is_some());
        assert!(home.unwrap().ends_with(".questlog"));

        env::remove_var("QUESTLOG_HOME");
    }
}
