//! File-based progression storage.
//!
//! All records live in one JSON document, `state.json`, under the data
//! directory (`~/.questlog/` or `$QUESTLOG_HOME`). Every write rewrites the
//! document atomically via temp file + rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::config::questlog_home;
use crate::core::{Habit, HabitLog, Profile, Snapshot, Task};
use crate::error::{QuestlogError, Result};
use crate::storage::ProgressStore;
use crate::util::{atomic_write, read_to_string_limited};

/// Name of the state document inside the data directory.
pub const STATE_FILE: &str = "state.json";

/// File-based progression store.
#[derive(Debug)]
pub struct FileStore {
    /// Path to the state document.
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store in the default data directory.
    pub fn new() -> Result<Self> {
        let dir = questlog_home().ok_or_else(|| {
            QuestlogError::config("Could not determine data directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a file store in a custom directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| QuestlogError::storage(&dir, e))?;
        }

        Ok(Self {
            path: dir.join(STATE_FILE),
            write_lock: Mutex::new(()),
        })
    }

    /// Path to the state document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::default());
        }

        let content = read_to_string_limited(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Snapshot::default());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        atomic_write(&self.path, json.as_bytes())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Load, apply `change`, and write back.
    fn modify(&self, change: impl FnOnce(&mut Snapshot)) -> Result<()> {
        let _guard = self.lock();
        let mut snapshot = self.load()?;
        change(&mut snapshot);
        self.save(&snapshot)
    }
}

impl ProgressStore for FileStore {
    fn get_profile(&self) -> Result<Option<Profile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(self.load()?.profile))
    }

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        self.modify(|s| s.profile = profile.clone())
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.load()?.tasks;
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        self.modify(|s| match s.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => s.tasks.push(task.clone()),
        })
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.modify(|s| s.tasks.retain(|t| t.id != id))
    }

    fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut habits = self.load()?.habits;
        habits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(habits)
    }

    fn put_habit(&self, habit: &Habit) -> Result<()> {
        self.modify(|s| match s.habits.iter_mut().find(|h| h.id == habit.id) {
            Some(existing) => *existing = habit.clone(),
            None => s.habits.push(habit.clone()),
        })
    }

    fn delete_habit(&self, id: &str) -> Result<()> {
        self.modify(|s| s.habits.retain(|h| h.id != id))
    }

    fn list_habit_logs(&self) -> Result<Vec<HabitLog>> {
        let mut logs = self.load()?.habit_logs;
        logs.sort();
        logs.dedup();
        Ok(logs)
    }

    fn put_habit_log(&self, log: &HabitLog) -> Result<()> {
        self.modify(|s| {
            if !s.habit_logs.contains(log) {
                s.habit_logs.push(log.clone());
            }
        })
    }

    fn delete_habit_log(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        self.modify(|s| {
            s.habit_logs
                .retain(|l| !(l.habit_id == habit_id && l.date == date))
        })
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.lock();
        self.save(snapshot)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let mut snapshot = self.load()?;
        snapshot.tasks.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.habits.sort_by(|a, b| a.id.cmp(&b.id));
        snapshot.habit_logs.sort();
        snapshot.habit_logs.dedup();
        Ok(snapshot)
    }
}
