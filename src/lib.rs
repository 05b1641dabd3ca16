//! questlog - gamified task and habit tracking
//!
//! questlog turns finished tasks and kept habits into XP, levels, streaks and
//! badges. The rules live in [`core`] as pure functions; [`engine`] applies
//! them transactionally over a [`storage`] backend and reports what changed
//! as [`events`].

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod events;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{
    compute_streak, evaluate_badges, level_for, xp_required_for, BadgeId, Calendar,
    EvaluationContext, Habit, HabitLog, LevelProgress, NegativeXpPolicy, Priority, Profile,
    Snapshot, Streak, Task, TaskStatus,
};
pub use engine::{NewTask, Outcome, Progression};
pub use error::{QuestlogError, Result};
pub use events::{CollectingSink, NotificationSink, ProgressEvent, TracingSink};
pub use storage::{FileStore, MemoryStore, ProgressStore};

// CLI commands
pub use cli::{BadgesCommand, HabitCommand, RedeemCommand, StatusCommand, TaskCommand, XpCommand};
