//! In-memory progression storage.
//!
//! This module provides a thread-safe in-memory implementation of the
//! ProgressStore trait, used by tests and by callers that persist elsewhere.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use crate::core::{Habit, HabitLog, Profile, Snapshot, Task};
use crate::error::Result;
use crate::storage::ProgressStore;

#[derive(Debug, Default)]
struct Tables {
    profile: Option<Profile>,
    tasks: BTreeMap<String, Task>,
    habits: BTreeMap<String, Habit>,
    habit_logs: BTreeSet<HabitLog>,
}

/// In-memory progression store.
///
/// Thread-safe implementation using a single `RwLock`.
/// Records are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks in the store.
    pub fn task_count(&self) -> usize {
        self.read().tasks.len()
    }

    /// Number of habits in the store.
    pub fn habit_count(&self) -> usize {
        self.read().habits.len()
    }

    /// Clear all records.
    pub fn clear(&self) {
        *self.write() = Tables::default();
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressStore for MemoryStore {
    fn get_profile(&self) -> Result<Option<Profile>> {
        Ok(self.read().profile.clone())
    }

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        self.write().profile = Some(profile.clone());
        Ok(())
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read().tasks.values().cloned().collect())
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        self.write().tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.write().tasks.remove(id);
        Ok(())
    }

    fn list_habits(&self) -> Result<Vec<Habit>> {
        Ok(self.read().habits.values().cloned().collect())
    }

    fn put_habit(&self, habit: &Habit) -> Result<()> {
        self.write().habits.insert(habit.id.clone(), habit.clone());
        Ok(())
    }

    fn delete_habit(&self, id: &str) -> Result<()> {
        self.write().habits.remove(id);
        Ok(())
    }

    fn list_habit_logs(&self) -> Result<Vec<HabitLog>> {
        Ok(self.read().habit_logs.iter().cloned().collect())
    }

    fn put_habit_log(&self, log: &HabitLog) -> Result<()> {
        self.write().habit_logs.insert(log.clone());
        Ok(())
    }

    fn delete_habit_log(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        self.write()
            .habit_logs
            .remove(&HabitLog::new(habit_id, date));
        Ok(())
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        let tables = Tables {
            profile: Some(snapshot.profile.clone()),
            tasks: snapshot
                .tasks
                .iter()
                .map(|t| (t.id.clone(), t.clone()))
                .collect(),
            habits: snapshot
                .habits
                .iter()
                .map(|h| (h.id.clone(), h.clone()))
                .collect(),
            habit_logs: snapshot.habit_logs.iter().cloned().collect(),
        };
        *self.write() = tables;
        Ok(())
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let tables = self.read();
        Ok(Snapshot {
            profile: tables.profile.clone().unwrap_or_default(),
            tasks: tables.tasks.values().cloned().collect(),
            habits: tables.habits.values().cloned().collect(),
            habit_logs: tables.habit_logs.iter().cloned().collect(),
        })
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.read().tasks.get(id).cloned())
    }

    fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        Ok(self.read().habits.get(id).cloned())
    }
}
