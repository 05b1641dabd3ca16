//! Status command for questlog.
//!
//! Shows level, XP progress, badges, inventory and habit streaks. Streaks are
//! refreshed for the current day first so lapsed ones read as zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{render_events, to_json, ProfileInfo};
use crate::config::Config;
use crate::core::{BadgeId, Habit};
use crate::engine::Progression;
use crate::error::{exit_codes, FailOpen, QuestlogError, Result};
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One habit line in the status view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitStreakInfo {
    pub id: String,
    pub title: String,
    pub streak: u32,
    pub longest_streak: u32,
}

impl From<&Habit> for HabitStreakInfo {
    fn from(habit: &Habit) -> Self {
        Self {
            id: habit.id.clone(),
            title: habit.title.clone(),
            streak: habit.streak,
            longest_streak: habit.longest_streak,
        }
    }
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// Whether the status was read.
    pub success: bool,
    /// Level and XP.
    pub profile: ProfileInfo,
    /// XP missing before the next level.
    pub xp_to_next: u64,
    /// Unlocked badge ids in catalog order.
    pub badges: Vec<String>,
    /// Size of the badge catalog.
    pub badge_total: usize,
    /// Redeemed items.
    pub inventory: BTreeMap<String, u32>,
    /// Pending task count.
    pub open_tasks: usize,
    /// Completed task count.
    pub completed_tasks: usize,
    /// Habits and their streaks.
    pub habits: Vec<HabitStreakInfo>,
    /// Events produced by the streak refresh.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProgressEvent>,
    /// Error message if status failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this result.
    #[serde(skip)]
    pub exit_code: i32,
}

impl StatusOutput {
    /// Create a failed output.
    pub fn failure(error: &QuestlogError) -> Self {
        Self {
            success: false,
            profile: ProfileInfo::default(),
            xp_to_next: 0,
            badges: Vec::new(),
            badge_total: BadgeId::ALL.len(),
            inventory: BTreeMap::new(),
            open_tasks: 0,
            completed_tasks: 0,
            habits: Vec::new(),
            events: Vec::new(),
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
        }
    }
}

/// The status command implementation.
pub struct StatusCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> StatusCommand<S> {
    /// Create a new status command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    /// Run the status command.
    pub fn run(&self, now: DateTime<Utc>) -> StatusOutput {
        let events = self
            .engine
            .refresh_streaks(now)
            .map(|outcome| outcome.events)
            .fail_open_default("refreshing streaks");

        match self.collect(events) {
            Ok(output) => output,
            Err(e) => StatusOutput::failure(&e),
        }
    }

    fn collect(&self, events: Vec<ProgressEvent>) -> Result<StatusOutput> {
        let profile = self.engine.profile()?;
        let tasks = self.engine.list_tasks()?;
        let habits = self.engine.list_habits()?;

        let completed_tasks = tasks.iter().filter(|t| t.is_completed()).count();

        Ok(StatusOutput {
            success: true,
            profile: ProfileInfo::from(&profile),
            xp_to_next: profile.progress().xp_to_next(),
            badges: profile.badges.iter().map(|b| b.as_str().to_string()).collect(),
            badge_total: BadgeId::ALL.len(),
            inventory: profile.inventory.clone(),
            open_tasks: tasks.len() - completed_tasks,
            completed_tasks,
            habits: habits.iter().map(HabitStreakInfo::from).collect(),
            events,
            error: None,
            exit_code: exit_codes::SUCCESS,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
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
    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();
        out.push_str(&format!(
            "Level {}  ({} XP, {} to next, {:.0}%)\n",
            output.profile.level, output.profile.xp_total, output.xp_to_next, output.profile.percent
        ));
        out.push_str(&format!(
            "Tasks: {} open, {} done\n",
            output.open_tasks, output.completed_tasks
        ));
        out.push_str(&format!(
            "Badges: {}/{}\n",
            output.badges.len(),
            output.badge_total
        ));

        if !output.habits.is_empty() {
            out.push_str("\nHabits:\n");
            for habit in &output.habits {
                out.push_str(&format!(
                    "  {}  {}  streak {} (best {})\n",
                    habit.id, habit.title, habit.streak, habit.longest_streak
                ));
            }
        }

        if !output.inventory.is_empty() {
            out.push_str("\nInventory:\n");
            for (item, count) in &output.inventory {
                out.push_str(&format!("  {} x{}\n", item, count));
            }
        }

        if !output.events.is_empty() {
            out.push('\n');
            out.push_str(&render_events(&output.events));
        }

        out
    }
}
