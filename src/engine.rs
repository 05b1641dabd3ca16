//! Progression service.
//!
//! Wraps every state change in a read-modify-write transaction over a
//! [`ProgressStore`]: load a fresh snapshot, apply the change, recompute the
//! level and the affected streak, re-scan the badge catalog, then commit the
//! whole snapshot in a single store call. A failed commit leaves the store as
//! it was before the transaction.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{
    apply_xp_delta, compute_streak, dates_for_habit, evaluate_badges, leveled_up, next_id,
    BadgeId, Calendar, EvaluationContext, Habit, HabitLog, NegativeXpPolicy, Priority, Profile,
    Snapshot, Task, TaskStatus,
};
use crate::error::{QuestlogError, Result};
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Id prefix for tasks.
pub const TASK_ID_PREFIX: &str = "t";

/// Id prefix for habits.
pub const HABIT_ID_PREFIX: &str = "h";

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    /// XP value; the configured default when absent.
    pub xp_value: Option<u32>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    /// A task with just a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Result of one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Profile as persisted at the end of the transaction.
    pub profile: Profile,
    /// Events in the order they happened.
    pub events: Vec<ProgressEvent>,
}

impl Outcome {
    /// Badges unlocked in this transaction.
    pub fn unlocked(&self) -> Vec<BadgeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::BadgeUnlocked { badge } => Some(*badge),
                _ => None,
            })
            .collect()
    }

    /// New level if this transaction leveled up.
    pub fn leveled_up_to(&self) -> Option<u32> {
        self.events.iter().find_map(|e| match e {
            ProgressEvent::LeveledUp { to, .. } => Some(*to),
            _ => None,
        })
    }
}

/// Progression service over a store.
#[derive(Debug)]
pub struct Progression<S: ProgressStore> {
    store: S,
    calendar: Calendar,
    negative_policy: NegativeXpPolicy,
    default_xp: u32,
    /// Serializes transactions issued through this service.
    lock: Mutex<()>,
}

impl<S: ProgressStore> Progression<S> {
    /// Create a service with default settings (UTC, clamp, 10 XP tasks).
    pub fn new(store: S) -> Self {
        Self::with_config(store, &Config::default())
    }

    /// Create a service using the timezone and XP settings from `config`.
    pub fn with_config(store: S, config: &Config) -> Self {
        Self {
            store,
            calendar: config.calendar(),
            negative_policy: config.xp.negative_policy,
            default_xp: config.tasks.default_xp,
            lock: Mutex::new(()),
        }
    }

    /// The calendar used for day and hour comparisons.
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current profile, with the level re-derived from XP.
    pub fn profile(&self) -> Result<Profile> {
        let mut profile = self.store.get_profile()?.unwrap_or_default();
        profile.set_xp(profile.xp_total);
        Ok(profile)
    }

    /// All tasks.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.store.list_tasks()
    }

    /// All habits.
    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        self.store.list_habits()
    }

    /// Days logged for a habit.
    pub fn habit_days(&self, habit_id: &str) -> Result<Vec<NaiveDate>> {
        let logs = self.store.list_habit_logs()?;
        Ok(dates_for_habit(&logs, habit_id).into_iter().collect())
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Create a pending task.
    pub fn add_task(&self, new_task: NewTask, now: DateTime<Utc>) -> Result<(Task, Outcome)> {
        let title = new_task.title.trim();
        if title.is_empty() {
            return Err(QuestlogError::invalid_input("task title cannot be empty"));
        }
        let xp_value = new_task.xp_value.unwrap_or(self.default_xp);
        if xp_value == 0 {
            return Err(QuestlogError::invalid_input("task xp must be positive"));
        }

        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        let id = next_id(TASK_ID_PREFIX, snapshot.tasks.iter().map(|t| t.id.as_str()));
        let task = Task {
            priority: new_task.priority,
            due_date: new_task.due_date,
            ..Task::new(id, title, xp_value, now)
        };
        snapshot.tasks.push(task.clone());
        tracing::debug!(task_id = %task.id, xp_value, "task created");

        let outcome = self.settle(&mut snapshot, &before, now, Vec::new())?;
        Ok((task, outcome))
    }

    /// Mark a task completed, granting its XP.
    ///
    /// Completing an already completed task changes nothing.
    pub fn complete_task(&self, id: &str, now: DateTime<Utc>) -> Result<Outcome> {
        self.set_task_status(id, |_| TaskStatus::Completed, now)
    }

    /// Return a completed task to pending, taking its XP back.
    pub fn uncomplete_task(&self, id: &str, now: DateTime<Utc>) -> Result<Outcome> {
        self.set_task_status(id, |_| TaskStatus::Pending, now)
    }

    /// Flip a task between pending and completed.
    pub fn toggle_task(&self, id: &str, now: DateTime<Utc>) -> Result<Outcome> {
        self.set_task_status(
            id,
            |current| match current {
                TaskStatus::Pending => TaskStatus::Completed,
                TaskStatus::Completed => TaskStatus::Pending,
            },
            now,
        )
    }

    /// Move a task to the status `choose` picks from its current one.
    ///
    /// The choice is made on the snapshot read under the transaction lock.
    fn set_task_status(
        &self,
        id: &str,
        choose: impl FnOnce(TaskStatus) -> TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        let task = snapshot
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| QuestlogError::task_not_found(id))?;

        let target = choose(task.status);
        if task.status == target {
            return Ok(Outcome {
                profile: before,
                events: Vec::new(),
            });
        }

        let delta = i64::from(task.xp_value);
        let xp_total = match target {
            TaskStatus::Completed => apply_xp_delta(before.xp_total, delta, self.negative_policy)?,
            TaskStatus::Pending => apply_xp_delta(before.xp_total, -delta, self.negative_policy)?,
        };

        task.status = target;
        task.completed_at = match target {
            TaskStatus::Completed => Some(now),
            TaskStatus::Pending => None,
        };
        tracing::debug!(task_id = id, status = ?target, "task status changed");

        snapshot.profile.set_xp(xp_total);
        self.settle(&mut snapshot, &before, now, Vec::new())
    }

    /// Delete a task. XP already earned is kept.
    pub fn delete_task(&self, id: &str, now: DateTime<Utc>) -> Result<Outcome> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        if !snapshot.tasks.iter().any(|t| t.id == id) {
            return Err(QuestlogError::task_not_found(id));
        }
        snapshot.tasks.retain(|t| t.id != id);

        self.settle(&mut snapshot, &before, now, Vec::new())
    }

    // =========================================================================
    // Habits
    // =========================================================================

    /// Create a habit.
    pub fn add_habit(&self, title: &str, now: DateTime<Utc>) -> Result<Habit> {
        let title = title.trim();
        if title.is_empty() {
            return Err(QuestlogError::invalid_input("habit title cannot be empty"));
        }

        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let id = next_id(
            HABIT_ID_PREFIX,
            snapshot.habits.iter().map(|h| h.id.as_str()),
        );
        let habit = Habit::new(id, title, now);
        snapshot.habits.push(habit.clone());
        self.store.commit(&snapshot)?;
        tracing::debug!(habit_id = %habit.id, "habit created");
        Ok(habit)
    }

    /// Delete a habit and its log.
    pub fn delete_habit(&self, id: &str) -> Result<()> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        if !snapshot.habits.iter().any(|h| h.id == id) {
            return Err(QuestlogError::habit_not_found(id));
        }
        snapshot.habits.retain(|h| h.id != id);
        snapshot.habit_logs.retain(|l| l.habit_id != id);
        self.store.commit(&snapshot)?;
        tracing::debug!(habit_id = id, "habit deleted");
        Ok(())
    }

    /// Toggle whether a habit was done on `date`.
    ///
    /// Returns whether the day is now logged, along with the outcome.
    /// Days after today cannot be logged.
    pub fn toggle_habit_day(
        &self,
        habit_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(bool, Outcome)> {
        let today = self.calendar.today(now);
        if date > today {
            return Err(QuestlogError::invalid_input(format!(
                "cannot log {} ahead of today ({})",
                date, today
            )));
        }

        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        if !snapshot.habits.iter().any(|h| h.id == habit_id) {
            return Err(QuestlogError::habit_not_found(habit_id));
        }

        let log = HabitLog::new(habit_id, date);
        let done = if snapshot.habit_logs.contains(&log) {
            snapshot.habit_logs.retain(|l| l != &log);
            false
        } else {
            snapshot.habit_logs.push(log);
            true
        };
        tracing::debug!(habit_id, %date, done, "habit day toggled");

        let mut events = Vec::new();
        if let Some(event) = self.restreak(&mut snapshot, habit_id, today)? {
            events.push(event);
        }

        let outcome = self.settle(&mut snapshot, &before, now, events)?;
        Ok((done, outcome))
    }

    /// Re-derive every habit's streak for the current day.
    ///
    /// Streaks lapse when a day passes without a log; call this when the day
    /// rolls over.
    pub fn refresh_streaks(&self, now: DateTime<Utc>) -> Result<Outcome> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();
        let today = self.calendar.today(now);

        let ids: Vec<String> = snapshot.habits.iter().map(|h| h.id.clone()).collect();
        let mut events = Vec::new();
        for id in ids {
            if let Some(event) = self.restreak(&mut snapshot, &id, today)? {
                events.push(event);
            }
        }

        self.settle(&mut snapshot, &before, now, events)
    }

    /// Recompute one habit's streak in the snapshot.
    fn restreak(
        &self,
        snapshot: &mut Snapshot,
        habit_id: &str,
        today: NaiveDate,
    ) -> Result<Option<ProgressEvent>> {
        let dates = dates_for_habit(&snapshot.habit_logs, habit_id);
        let Some(habit) = snapshot.habits.iter_mut().find(|h| h.id == habit_id) else {
            return Ok(None);
        };

        let streak = compute_streak(&dates, today, habit.longest_streak);
        if streak.current == habit.streak && streak.longest == habit.longest_streak {
            return Ok(None);
        }

        habit.streak = streak.current;
        habit.longest_streak = streak.longest;

        Ok(Some(ProgressEvent::StreakChanged {
            habit_id: habit_id.to_string(),
            current: streak.current,
            longest: streak.longest,
        }))
    }

    // =========================================================================
    // XP and rewards
    // =========================================================================

    /// Adjust XP by hand. Negative totals follow the configured policy.
    pub fn grant_xp(&self, delta: i64, now: DateTime<Utc>) -> Result<Outcome> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        let xp_total = apply_xp_delta(before.xp_total, delta, self.negative_policy)?;
        snapshot.profile.set_xp(xp_total);

        self.settle(&mut snapshot, &before, now, Vec::new())
    }

    /// Spend XP on a reward item.
    ///
    /// Fails with [`QuestlogError::InsufficientXp`] without touching the
    /// profile when the cost exceeds the current total.
    pub fn redeem(&self, item_id: &str, cost: u64, now: DateTime<Utc>) -> Result<Outcome> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(QuestlogError::invalid_input("item id cannot be empty"));
        }
        if cost == 0 {
            return Err(QuestlogError::invalid_input("reward cost must be positive"));
        }

        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();

        if cost > before.xp_total {
            return Err(QuestlogError::InsufficientXp {
                needed: cost,
                available: before.xp_total,
            });
        }

        snapshot.profile.set_xp(before.xp_total - cost);
        *snapshot
            .profile
            .inventory
            .entry(item_id.to_string())
            .or_insert(0) += 1;
        tracing::debug!(item_id, cost, "reward redeemed");

        self.settle(&mut snapshot, &before, now, Vec::new())
    }

    /// Re-scan the badge catalog without changing anything else.
    pub fn evaluate_achievements(&self, now: DateTime<Utc>) -> Result<Outcome> {
        let _guard = self.lock();
        let mut snapshot = self.begin()?;
        let before = snapshot.profile.clone();
        self.settle(&mut snapshot, &before, now, Vec::new())
    }

    // =========================================================================
    // Transaction plumbing
    // =========================================================================

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a fresh snapshot with the cached level re-derived.
    fn begin(&self) -> Result<Snapshot> {
        let mut snapshot = self.store.snapshot()?;
        let xp_total = snapshot.profile.xp_total;
        snapshot.profile.set_xp(xp_total);
        Ok(snapshot)
    }

    /// Emit XP/level events, unlock badges, and commit the snapshot once.
    fn settle(
        &self,
        snapshot: &mut Snapshot,
        before: &Profile,
        now: DateTime<Utc>,
        mut events: Vec<ProgressEvent>,
    ) -> Result<Outcome> {
        let after = &snapshot.profile;
        if after.xp_total != before.xp_total {
            events.push(ProgressEvent::XpChanged {
                from: before.xp_total,
                to: after.xp_total,
            });
        }
        if leveled_up(before.level, after.level) {
            events.push(ProgressEvent::LeveledUp {
                from: before.level,
                to: after.level,
            });
        }

        let unlocked = evaluate_badges(&EvaluationContext {
            tasks: &snapshot.tasks,
            habits: &snapshot.habits,
            level: snapshot.profile.level,
            unlocked: &snapshot.profile.badges,
            today: self.calendar.today(now),
            calendar: &self.calendar,
        });
        let added = snapshot.profile.merge_badges(&unlocked);
        events.extend(
            added
                .into_iter()
                .map(|badge| ProgressEvent::BadgeUnlocked { badge }),
        );

        self.store.commit(snapshot)?;
        tracing::debug!(
            xp = snapshot.profile.xp_total,
            level = snapshot.profile.level,
            events = events.len(),
            "transaction settled"
        );

        Ok(Outcome {
            profile: snapshot.profile.clone(),
            events,
        })
    }
}
