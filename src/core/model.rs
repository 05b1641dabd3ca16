//! Profile, task and habit records.
//!
//! These are the snapshots the rules read. Timestamps, statuses and
//! priorities load leniently: a value that cannot be parsed falls back to
//! `None` or a default instead of failing the record, so bad data only
//! switches off the predicates that need it. A record that still cannot be
//! read is skipped with a warning; the rest of the snapshot loads.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::badges::BadgeId;
use crate::core::level::{level_for, LevelProgress};

/// The user's progression state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    /// Total experience points.
    pub xp_total: u64,
    /// Cached level, always `level_for(xp_total)`.
    pub level: u32,
    /// Unlocked badges. Only ever grows.
    pub badges: BTreeSet<BadgeId>,
    /// Redeemed reward items and their counts.
    pub inventory: BTreeMap<String, u32>,
}

impl Profile {
    /// Create a profile with the given XP total.
    pub fn with_xp(xp_total: u64) -> Self {
        let mut profile = Self::default();
        profile.set_xp(xp_total);
        profile
    }

    /// Set the XP total and re-derive the level.
    pub fn set_xp(&mut self, xp_total: u64) {
        self.xp_total = xp_total;
        self.level = level_for(xp_total);
    }

    /// Where the profile sits on the level curve.
    pub fn progress(&self) -> LevelProgress {
        LevelProgress::from_xp(self.xp_total)
    }

    /// Union `unlocked` into the badge set.
    ///
    /// Returns the badges that were not already present, in catalog order.
    pub fn merge_badges(&mut self, unlocked: &BTreeSet<BadgeId>) -> Vec<BadgeId> {
        unlocked
            .iter()
            .copied()
            .filter(|badge| self.badges.insert(*badge))
            .collect()
    }

    /// Whether the cached level matches the XP total.
    pub fn is_consistent(&self) -> bool {
        self.level == level_for(self.xp_total)
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a priority name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// A to-do item worth XP when completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Short description.
    pub title: String,
    /// Pending or completed. Unknown values read as pending.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: TaskStatus,
    /// Priority, if one was set and could be read.
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<Priority>,
    /// XP granted on completion.
    pub xp_value: u32,
    /// Due instant, if any.
    #[serde(default, deserialize_with = "lenient_instant")]
    pub due_date: Option<DateTime<Utc>>,
    /// When the task was completed. Cleared when un-completed.
    #[serde(default, deserialize_with = "lenient_instant")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the task was created. Unreadable values read as the Unix epoch.
    #[serde(default, deserialize_with = "lenient_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        xp_value: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::Pending,
            priority: None,
            xp_value,
            due_date: None,
            completed_at: None,
            created_at,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Mark completed at the given instant.
    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at);
        self
    }

    /// Whether the task is completed.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether the task has High priority.
    pub fn is_high_priority(&self) -> bool {
        self.priority == Some(Priority::High)
    }
}

/// A recurring habit with cached streak counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    /// Habit identifier.
    pub id: String,
    /// Short description.
    pub title: String,
    /// Current streak in days.
    #[serde(default)]
    pub streak: u32,
    /// Longest streak ever reached. Never decreases.
    #[serde(default)]
    pub longest_streak: u32,
    /// When the habit was created.
    #[serde(default, deserialize_with = "lenient_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create a habit with no streak.
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            streak: 0,
            longest_streak: 0,
            created_at,
        }
    }
}

/// One day on which a habit was done.
///
/// `(habit_id, date)` is unique; presence is the whole signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HabitLog {
    /// Habit this entry belongs to.
    pub habit_id: String,
    /// Local calendar day.
    pub date: NaiveDate,
}

impl HabitLog {
    /// Create a log entry.
    pub fn new(habit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            habit_id: habit_id.into(),
            date,
        }
    }
}

/// Everything the rules look at, read in one go.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Snapshot {
    pub profile: Profile,
    #[serde(deserialize_with = "lenient_records")]
    pub tasks: Vec<Task>,
    #[serde(deserialize_with = "lenient_records")]
    pub habits: Vec<Habit>,
    #[serde(deserialize_with = "lenient_records")]
    pub habit_logs: Vec<HabitLog>,
}

/// Next sequential identifier for a prefix, e.g. `t0007`.
///
/// Scans `existing` for the highest number already used under `prefix`.
pub fn next_id<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", prefix, highest + 1)
}

/// Parse an RFC 3339 instant, returning `None` on anything else.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn lenient_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = raw.as_ref().and_then(|v| v.as_str()).and_then(parse_instant);
    if parsed.is_none() && raw.as_ref().is_some_and(|v| !v.is_null()) {
        tracing::debug!(value = ?raw, "unreadable timestamp treated as absent");
    }
    Ok(parsed)
}

fn lenient_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_instant(deserializer)?.unwrap_or_default())
}

fn lenient_status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = raw
        .as_ref()
        .and_then(|v| TaskStatus::deserialize(v).ok());
    if parsed.is_none() && raw.as_ref().is_some_and(|v| !v.is_null()) {
        tracing::debug!(value = ?raw, "unknown task status treated as pending");
    }
    Ok(parsed.unwrap_or_default())
}

/// Read a list record by record, skipping the ones that do not parse.
fn lenient_records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable record");
                None
            }
        })
        .collect())
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(Priority::parse))
}
