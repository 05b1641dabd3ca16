//! Error types for questlog.
//!
//! The rules in `core` never fail. Errors come from the edges: storage,
//! configuration, and caller mistakes such as negative XP or spending more
//! XP than the profile holds.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for questlog operations.
#[derive(Error, Debug)]
pub enum QuestlogError {
    /// I/O errors from the file store.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file exceeds the size the store is willing to read.
    #[error("file {path} is too large ({size} bytes, max {max} bytes)")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// An XP adjustment would drive the total below zero.
    #[error("invalid xp: total {total} cannot absorb delta {delta}")]
    InvalidXp { total: u64, delta: i64 },

    /// A redemption costs more XP than the profile holds.
    #[error("not enough xp: need {needed}, have {available}")]
    InsufficientXp { needed: u64, available: u64 },

    /// Task not found in storage.
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// Habit not found in storage.
    #[error("habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    /// Rejected caller input (empty title, zero cost, ...).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// A specialized Result type for questlog operations.
pub type Result<T> = std::result::Result<T, QuestlogError>;

impl QuestlogError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a task not found error.
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    /// Create a habit not found error.
    pub fn habit_not_found(habit_id: impl Into<String>) -> Self {
        Self::HabitNotFound {
            habit_id: habit_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidXp { .. }
                | Self::InsufficientXp { .. }
                | Self::TaskNotFound { .. }
                | Self::HabitNotFound { .. }
                | Self::InvalidInput { .. }
        )
    }

    /// CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_user_error() {
            exit_codes::USAGE
        } else {
            exit_codes::ERROR
        }
    }
}

impl From<io::Error> for QuestlogError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for QuestlogError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling on advisory paths.
///
/// Gamification is advisory: a failed notification or an unreadable user
/// config should log and carry on rather than abort the command.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the questlog CLI.
pub mod exit_codes {
    /// Command succeeded.
    pub const SUCCESS: i32 = 0;

    /// Command failed because of infrastructure (storage, config).
    pub const ERROR: i32 = 1;

    /// Command was rejected because of caller input.
    pub const USAGE: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = QuestlogError::storage(
            "/tmp/state.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/state.json"));
    }

    #[test]
    fn test_invalid_xp_display() {
        let err = QuestlogError::InvalidXp {
            total: 10,
            delta: -50,
        };
        assert_eq!(
            err.to_string(),
            "invalid xp: total 10 cannot absorb delta -50"
        );
    }

    #[test]
    fn test_insufficient_xp_display() {
        let err = QuestlogError::InsufficientXp {
            needed: 500,
            available: 120,
        };
        assert_eq!(err.to_string(), "not enough xp: need 500, have 120");
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            QuestlogError::task_not_found("t-1").to_string(),
            "task not found: t-1"
        );
        assert_eq!(
            QuestlogError::habit_not_found("h-1").to_string(),
            "habit not found: h-1"
        );
    }

    #[test]
    fn test_is_user_error() {
        assert!(QuestlogError::invalid_input("empty title").is_user_error());
        assert!(QuestlogError::task_not_found("x").is_user_error());
        assert!(!QuestlogError::config("bad toml").is_user_error());
        assert!(!QuestlogError::serde("bad json").is_user_error());
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(
            QuestlogError::invalid_input("empty title").exit_code(),
            exit_codes::USAGE
        );
        assert_eq!(
            QuestlogError::InsufficientXp {
                needed: 10,
                available: 0
            }
            .exit_code(),
            exit_codes::USAGE
        );
        assert_eq!(QuestlogError::config("bad toml").exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: QuestlogError = io_err.into();
        assert!(matches!(err, QuestlogError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: QuestlogError = json_err.into();
        assert!(matches!(err, QuestlogError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(QuestlogError::config("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(QuestlogError::config("test"));
        assert_eq!(result.fail_open_with("test context", 42), 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        assert_eq!(result.fail_open_default("test context"), 100);
    }
}
