//! Storage traits for questlog.
//!
//! This module defines the `ProgressStore` trait: the profile, task, habit
//! and habit-log tables the progression service reads and writes.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::core::{Habit, HabitLog, Profile, Snapshot, Task};
use crate::error::Result;

/// Trait for progression storage backends.
///
/// There is a single user, so the profile has no key. Listing returns every
/// record; the rules always work on full snapshots.
pub trait ProgressStore: Send + Sync {
    /// Retrieve the profile. `Ok(None)` before the first write.
    fn get_profile(&self) -> Result<Option<Profile>>;

    /// Replace the profile.
    fn put_profile(&self, profile: &Profile) -> Result<()>;

    /// List all tasks, ordered by id.
    fn list_tasks(&self) -> Result<Vec<Task>>;

    /// Create or update a task.
    fn put_task(&self, task: &Task) -> Result<()>;

    /// Delete a task. Returns `Ok(())` even if it doesn't exist.
    fn delete_task(&self, id: &str) -> Result<()>;

    /// List all habits, ordered by id.
    fn list_habits(&self) -> Result<Vec<Habit>>;

    /// Create or update a habit.
    fn put_habit(&self, habit: &Habit) -> Result<()>;

    /// Delete a habit. Returns `Ok(())` even if it doesn't exist.
    fn delete_habit(&self, id: &str) -> Result<()>;

    /// List all habit log entries, ordered by habit then date.
    fn list_habit_logs(&self) -> Result<Vec<HabitLog>>;

    /// Record a habit log entry. Recording an existing entry is a no-op.
    fn put_habit_log(&self, log: &HabitLog) -> Result<()>;

    /// Remove a habit log entry. Returns `Ok(())` even if it doesn't exist.
    fn delete_habit_log(&self, habit_id: &str, date: NaiveDate) -> Result<()>;

    /// Replace every table with the contents of `snapshot` in one write.
    ///
    /// Either the whole snapshot lands or, on error, the store is unchanged.
    fn commit(&self, snapshot: &Snapshot) -> Result<()>;

    /// Retrieve a task by id.
    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.list_tasks()?.into_iter().find(|t| t.id == id))
    }

    /// Retrieve a habit by id.
    fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        Ok(self.list_habits()?.into_iter().find(|h| h.id == id))
    }

    /// Read everything in one go.
    fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            profile: self.get_profile()?.unwrap_or_default(),
            tasks: self.list_tasks()?,
            habits: self.list_habits()?,
            habit_logs: self.list_habit_logs()?,
        })
    }
}

/// Blanket implementation of ProgressStore for Arc-wrapped stores.
///
/// This allows using `Arc<T>` where `T: ProgressStore` is expected,
/// which is useful for sharing stores between tests and commands.
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    fn get_profile(&self) -> Result<Option<Profile>> {
        (**self).get_profile()
    }

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        (**self).put_profile(profile)
    }

    fn list_tasks(&self) -> Result<Vec<Task>> {
        (**self).list_tasks()
    }

    fn put_task(&self, task: &Task) -> Result<()> {
        (**self).put_task(task)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        (**self).delete_task(id)
    }

    fn list_habits(&self) -> Result<Vec<Habit>> {
        (**self).list_habits()
    }

    fn put_habit(&self, habit: &Habit) -> Result<()> {
        (**self).put_habit(habit)
    }

    fn delete_habit(&self, id: &str) -> Result<()> {
        (**self).delete_habit(id)
    }

    fn list_habit_logs(&self) -> Result<Vec<HabitLog>> {
        (**self).list_habit_logs()
    }

    fn put_habit_log(&self, log: &HabitLog) -> Result<()> {
        (**self).put_habit_log(log)
    }

    fn delete_habit_log(&self, habit_id: &str, date: NaiveDate) -> Result<()> {
        (**self).delete_habit_log(habit_id, date)
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).commit(snapshot)
    }

    fn snapshot(&self) -> Result<Snapshot> {
        (**self).snapshot()
    }
}
