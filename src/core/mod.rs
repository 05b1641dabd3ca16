//! Pure progression rules for questlog.
//!
//! Level math, habit streaks, the badge catalog and the record types they
//! operate on. Nothing in here performs I/O.

pub mod badges;
pub mod calendar;
pub mod level;
pub mod model;
pub mod streak;

pub use badges::{evaluate as evaluate_badges, BadgeId, EvaluationContext};
pub use calendar::Calendar;
pub use level::{
    apply_xp_delta, level_for, leveled_up, progress_fraction, xp_required_for, LevelProgress,
    NegativeXpPolicy,
};
pub use model::{
    next_id, parse_instant, Habit, HabitLog, Priority, Profile, Snapshot, Task, TaskStatus,
};
pub use streak::{compute_streak, dates_for_habit, Streak};
