//! Habit command for questlog.
//!
//! Adds, lists, toggles and removes daily habits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{render_events, to_json, ProfileInfo};
use crate::config::Config;
use crate::core::{Habit, HabitLog};
use crate::engine::Progression;
use crate::error::{exit_codes, QuestlogError, Result};
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the habit command.
#[derive(Debug, Clone, Default)]
pub struct HabitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Habit view for output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitInfo {
    pub id: String,
    pub title: String,
    pub streak: u32,
    pub longest_streak: u32,
    /// Whether today is logged.
    pub done_today: bool,
}

impl HabitInfo {
    fn new(habit: &Habit, done_today: bool) -> Self {
        Self {
            id: habit.id.clone(),
            title: habit.title.clone(),
            streak: habit.streak,
            longest_streak: habit.longest_streak,
            done_today,
        }
    }
}

/// Output format for the habit command.
#[derive(Debug, Clone, Serialize)]
pub struct HabitOutput {
    /// Whether the action succeeded.
    pub success: bool,
    /// The action performed.
    pub action: String,
    /// The habit acted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habit: Option<HabitInfo>,
    /// Listed habits.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub habits: Vec<HabitInfo>,
    /// Day that was toggled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Whether the toggled day is now logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    /// Profile after a toggle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfo>,
    /// Progression events, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProgressEvent>,
    /// Error message if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this result.
    #[serde(skip)]
    pub exit_code: i32,
}

impl HabitOutput {
    fn empty(action: &str, success: bool) -> Self {
        Self {
            success,
            action: action.to_string(),
            habit: None,
            habits: Vec::new(),
            date: None,
            done: None,
            profile: None,
            events: Vec::new(),
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: &QuestlogError) -> Self {
        Self {
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
            ..Self::empty(action, false)
        }
    }
}

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        QuestlogError::invalid_input(format!("invalid date '{}': expected YYYY-MM-DD", value))
    })
}

/// The habit command implementation.
pub struct HabitCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> HabitCommand<S> {
    /// Create a new habit command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    /// Create a habit.
    pub fn add(&self, title: &str, now: DateTime<Utc>) -> HabitOutput {
        match self.engine.add_habit(title, now) {
            Ok(habit) => HabitOutput {
                habit: Some(HabitInfo::new(&habit, false)),
                ..HabitOutput::empty("add", true)
            },
            Err(e) => HabitOutput::failure("add", &e),
        }
    }

    /// List habits with today's state.
    pub fn list(&self, now: DateTime<Utc>) -> HabitOutput {
        match self.collect(now) {
            Ok(habits) => HabitOutput {
                habits,
                ..HabitOutput::empty("list", true)
            },
            Err(e) => HabitOutput::failure("list", &e),
        }
    }

    fn collect(&self, now: DateTime<Utc>) -> Result<Vec<HabitInfo>> {
        let today = self.engine.calendar().today(now);
        let habits = self.engine.list_habits()?;
        let logs = self.engine.store().list_habit_logs()?;

        Ok(habits
            .iter()
            .map(|habit| {
                let done = logs.contains(&HabitLog::new(habit.id.clone(), today));
                HabitInfo::new(habit, done)
            })
            .collect())
    }

    /// Toggle a day for a habit; today when `date` is `None`.
    pub fn toggle(&self, id: &str, date: Option<NaiveDate>, now: DateTime<Utc>) -> HabitOutput {
        let today = self.engine.calendar().today(now);
        let date = date.unwrap_or(today);

        let (done, outcome) = match self.engine.toggle_habit_day(id, date, now) {
            Ok(result) => result,
            Err(e) => return HabitOutput::failure("toggle", &e),
        };

        let habit = match self.engine.store().get_habit(id) {
            Ok(habit) => habit.map(|h| HabitInfo::new(&h, done && date == today)),
            Err(e) => {
                tracing::warn!("reloading habit {}: {}", id, e);
                None
            }
        };

        HabitOutput {
            habit,
            date: Some(date),
            done: Some(done),
            profile: Some(ProfileInfo::from(&outcome.profile)),
            events: outcome.events,
            ..HabitOutput::empty("toggle", true)
        }
    }

    /// Delete a habit and its log.
    pub fn remove(&self, id: &str) -> HabitOutput {
        match self.engine.delete_habit(id) {
            Ok(()) => HabitOutput::empty("rm", true),
            Err(e) => HabitOutput::failure("rm", &e),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HabitOutput, options: &HabitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &HabitOutput) -> String {
        if !output.success {
            return format!(
                "Habit {} failed: {}\n",
                output.action,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();
        match output.action.as_str() {
            "list" if output.habits.is_empty() => out.push_str("No habits.\n"),
            "list" => {
                for habit in &output.habits {
                    let mark = if habit.done_today { "x" } else { " " };
                    out.push_str(&format!(
                        "[{}] {}  {}  streak {} (best {})\n",
                        mark, habit.id, habit.title, habit.streak, habit.longest_streak
                    ));
                }
            }
            "add" => {
                if let Some(habit) = &output.habit {
                    out.push_str(&format!("Added {}: {}\n", habit.id, habit.title));
                }
            }
            "toggle" => {
                if let (Some(habit), Some(date), Some(done)) =
                    (&output.habit, output.date, output.done)
                {
                    let verb = if done { "logged" } else { "cleared" };
                    out.push_str(&format!(
                        "{} {} for {} (streak {})\n",
                        habit.title, verb, date, habit.streak
                    ));
                }
                out.push_str(&render_events(&output.events));
            }
            "rm" => out.push_str("Habit removed.\n"),
            _ => {}
        }
        out
    }
}
