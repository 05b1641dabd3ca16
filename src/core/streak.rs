//! Habit streaks from daily completion logs.
//!
//! A streak is the run of consecutive logged days ending today, or ending
//! yesterday when today has not been logged yet. There are no grace days.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::model::HabitLog;

/// Result of a streak computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    /// Consecutive days ending at the anchor day.
    pub current: u32,
    /// Longest streak ever reached, including `current`.
    pub longest: u32,
}

/// Compute a habit's streak.
///
/// # Arguments
/// * `dates` - Every day the habit was logged
/// * `today` - Local calendar day of the observer
/// * `cached_longest` - Longest streak recorded so far
pub fn compute_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate, cached_longest: u32) -> Streak {
    let current = current_run(dates, today);
    Streak {
        current,
        longest: cached_longest.max(current),
    }
}

fn current_run(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut count = 0;
    let mut day = Some(anchor);
    while let Some(d) = day.filter(|d| dates.contains(d)) {
        count += 1;
        day = d.pred_opt();
    }
    count
}

/// Collect the logged days for one habit.
pub fn dates_for_habit(logs: &[HabitLog], habit_id: &str) -> BTreeSet<NaiveDate> {
    logs.iter()
        .filter(|log| log.habit_id == habit_id)
        .map(|log| log.date)
        .collect()
}
