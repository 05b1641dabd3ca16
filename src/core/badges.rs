//! Achievement catalog and unlock evaluation.
//!
//! The catalog is closed: every badge is a [`BadgeId`] variant and every
//! predicate is an arm of one exhaustive match. Evaluation re-scans the full
//! task/habit snapshot each time and only reports badges not yet unlocked.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::calendar::Calendar;
use crate::core::model::{Habit, Task};
use crate::error::QuestlogError;

/// Completed-task counts for the milestone badges.
pub const FIRST_TASK_THRESHOLD: usize = 1;
pub const VETERAN_THRESHOLD: usize = 25;
pub const ELITE_THRESHOLD: usize = 50;
pub const GRANDMASTER_THRESHOLD: usize = 100;
pub const LEGEND_THRESHOLD: usize = 150;

/// Level needed for `level_5`.
pub const LEVEL_BADGE_THRESHOLD: u32 = 5;

/// Habit streak needed for `streak_7`.
pub const STREAK_BADGE_THRESHOLD: u32 = 7;

/// Local hour before which a completion counts as early.
pub const EARLY_BIRD_HOUR: u32 = 7;

/// Local hour from which a completion counts as late.
pub const NIGHT_OWL_HOUR: u32 = 22;

/// Weekend completions needed for `weekend_warrior`.
pub const WEEKEND_WARRIOR_THRESHOLD: usize = 10;

/// A badge in the fixed catalog.
///
/// Declaration order is catalog order; sets of badges iterate in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    FirstTask,
    Veteran,
    Elite,
    Grandmaster,
    Legend,
    #[serde(rename = "level_5")]
    Level5,
    #[serde(rename = "streak_7")]
    Streak7,
    Planner,
    Prioritizer,
    CleanSlate,
    EarlyBird,
    NightOwl,
    WeekendWarrior,
    EatTheFrog,
}

impl BadgeId {
    /// The full catalog in evaluation order.
    pub const ALL: [BadgeId; 14] = [
        BadgeId::FirstTask,
        BadgeId::Veteran,
        BadgeId::Elite,
        BadgeId::Grandmaster,
        BadgeId::Legend,
        BadgeId::Level5,
        BadgeId::Streak7,
        BadgeId::Planner,
        BadgeId::Prioritizer,
        BadgeId::CleanSlate,
        BadgeId::EarlyBird,
        BadgeId::NightOwl,
        BadgeId::WeekendWarrior,
        BadgeId::EatTheFrog,
    ];

    /// Stable string id used in storage and on the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTask => "first_task",
            Self::Veteran => "veteran",
            Self::Elite => "elite",
            Self::Grandmaster => "grandmaster",
            Self::Legend => "legend",
            Self::Level5 => "level_5",
            Self::Streak7 => "streak_7",
            Self::Planner => "planner",
            Self::Prioritizer => "prioritizer",
            Self::CleanSlate => "clean_slate",
            Self::EarlyBird => "early_bird",
            Self::NightOwl => "night_owl",
            Self::WeekendWarrior => "weekend_warrior",
            Self::EatTheFrog => "eat_the_frog",
        }
    }

    /// Human-readable badge name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FirstTask => "First Steps",
            Self::Veteran => "Veteran",
            Self::Elite => "Elite",
            Self::Grandmaster => "Grandmaster",
            Self::Legend => "Legend",
            Self::Level5 => "Rising Star",
            Self::Streak7 => "On Fire",
            Self::Planner => "Planner",
            Self::Prioritizer => "Prioritizer",
            Self::CleanSlate => "Clean Slate",
            Self::EarlyBird => "Early Bird",
            Self::NightOwl => "Night Owl",
            Self::WeekendWarrior => "Weekend Warrior",
            Self::EatTheFrog => "Eat the Frog",
        }
    }

    /// What it takes to earn the badge.
    pub fn description(&self) -> &'static str {
        match self {
            Self::FirstTask => "Complete your first task.",
            Self::Veteran => "Complete 25 tasks.",
            Self::Elite => "Complete 50 tasks.",
            Self::Grandmaster => "Complete 100 tasks.",
            Self::Legend => "Complete 150 tasks.",
            Self::Level5 => "Reach level 5.",
            Self::Streak7 => "Keep any habit going for 7 days in a row.",
            Self::Planner => "Schedule an open task for a future day.",
            Self::Prioritizer => "Mark a task as High priority.",
            Self::CleanSlate => "Clear everything that was due today.",
            Self::EarlyBird => "Complete a task before 7 AM.",
            Self::NightOwl => "Complete a task after 10 PM.",
            Self::WeekendWarrior => "Complete 10 tasks on weekends.",
            Self::EatTheFrog => "Make a High priority task the first thing you finish today.",
        }
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeId {
    type Err = QuestlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeId::ALL
            .into_iter()
            .find(|badge| badge.as_str() == s)
            .ok_or_else(|| QuestlogError::invalid_input(format!("unknown badge: {s}")))
    }
}

/// Inputs for one evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub tasks: &'a [Task],
    pub habits: &'a [Habit],
    /// Profile level after the triggering change.
    pub level: u32,
    /// Badges already earned; never reported again.
    pub unlocked: &'a BTreeSet<BadgeId>,
    /// Local calendar day of the observer.
    pub today: NaiveDate,
    pub calendar: &'a Calendar,
}

/// Evaluate the catalog and return badges newly unlocked by this pass.
pub fn evaluate(ctx: &EvaluationContext<'_>) -> BTreeSet<BadgeId> {
    let completed = ctx.tasks.iter().filter(|t| t.is_completed()).count();

    BadgeId::ALL
        .into_iter()
        .filter(|badge| !ctx.unlocked.contains(badge))
        .filter(|badge| is_satisfied(*badge, ctx, completed))
        .collect()
}

fn is_satisfied(badge: BadgeId, ctx: &EvaluationContext<'_>, completed: usize) -> bool {
    match badge {
        BadgeId::FirstTask => completed >= FIRST_TASK_THRESHOLD,
        BadgeId::Veteran => completed >= VETERAN_THRESHOLD,
        BadgeId::Elite => completed >= ELITE_THRESHOLD,
        BadgeId::Grandmaster => completed >= GRANDMASTER_THRESHOLD,
        BadgeId::Legend => completed >= LEGEND_THRESHOLD,
        BadgeId::Level5 => ctx.level >= LEVEL_BADGE_THRESHOLD,
        BadgeId::Streak7 => ctx.habits.iter().any(|h| h.streak >= STREAK_BADGE_THRESHOLD),
        BadgeId::Planner => ctx.tasks.iter().any(|t| {
            !t.is_completed()
                && t.due_date
                    .is_some_and(|due| ctx.calendar.local_date(due) > ctx.today)
        }),
        BadgeId::Prioritizer => ctx.tasks.iter().any(Task::is_high_priority),
        BadgeId::CleanSlate => {
            let done_today = completed_today(ctx).count();
            let open_due_today = ctx
                .tasks
                .iter()
                .filter(|t| {
                    !t.is_completed()
                        && t.due_date
                            .is_some_and(|due| ctx.calendar.local_date(due) == ctx.today)
                })
                .count();
            done_today + open_due_today > 0 && open_due_today == 0
        }
        BadgeId::EarlyBird => completion_hours(ctx).any(|hour| hour < EARLY_BIRD_HOUR),
        BadgeId::NightOwl => completion_hours(ctx).any(|hour| hour >= NIGHT_OWL_HOUR),
        BadgeId::WeekendWarrior => {
            ctx.tasks
                .iter()
                .filter(|t| t.is_completed())
                .filter_map(|t| t.completed_at)
                .filter(|at| ctx.calendar.is_weekend(*at))
                .count()
                >= WEEKEND_WARRIOR_THRESHOLD
        }
        BadgeId::EatTheFrog => completed_today(ctx)
            .min_by_key(|t| t.completed_at)
            .is_some_and(Task::is_high_priority),
    }
}

/// Completed tasks whose completion falls on the local `today`.
fn completed_today<'a>(ctx: &EvaluationContext<'a>) -> impl Iterator<Item = &'a Task> {
    let calendar = ctx.calendar;
    let today = ctx.today;
    ctx.tasks.iter().filter(move |t| {
        t.is_completed()
            && t.completed_at
                .is_some_and(|at| calendar.local_date(at) == today)
    })
}

/// Local completion hours of completed tasks.
fn completion_hours<'a>(ctx: &EvaluationContext<'a>) -> impl Iterator<Item = u32> + 'a {
    let calendar = ctx.calendar;
    ctx.tasks
        .iter()
        .filter(|t| t.is_completed())
        .filter_map(move |t| t.completed_at.map(|at| calendar.local_hour(at)))
}
