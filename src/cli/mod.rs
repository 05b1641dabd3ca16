//! CLI commands for questlog.
//!
//! Every command wraps a [`Progression`](crate::engine::Progression) service,
//! returns a serializable output struct, and formats it as JSON or text.
//! - **Overview**: status, badges
//! - **Records**: task, habit
//! - **XP**: xp, redeem

// Overview
pub mod badges;
pub mod status;

// Records
pub mod habit;
pub mod task;

// XP
pub mod redeem;
pub mod xp;

pub use badges::BadgesCommand;
pub use habit::HabitCommand;
pub use redeem::RedeemCommand;
pub use status::StatusCommand;
pub use task::TaskCommand;
pub use xp::XpCommand;

use serde::{Deserialize, Serialize};

use crate::core::Profile;
use crate::events::ProgressEvent;

/// Compact view of the profile attached to command outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    /// Total XP.
    pub xp_total: u64,
    /// Current level.
    pub level: u32,
    /// XP at which the next level starts.
    pub next_level_at: u64,
    /// Percent of the way through the current level.
    pub percent: f64,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        let progress = profile.progress();
        Self {
            xp_total: profile.xp_total,
            level: profile.level,
            next_level_at: progress.next_level_at,
            percent: progress.percent,
        }
    }
}

/// Serialize an output as pretty JSON.
pub(crate) fn to_json<T: Serialize>(output: &T) -> String {
    serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
}

/// Render events as one line each, marking celebrations.
pub(crate) fn render_events(events: &[ProgressEvent]) -> String {
    events
        .iter()
        .map(|event| {
            if event.is_celebration() {
                format!("* {}\n", event.summary())
            } else {
                format!("  {}\n", event.summary())
            }
        })
        .collect()
}
