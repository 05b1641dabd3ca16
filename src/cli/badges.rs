//! Badges command for questlog.
//!
//! Re-scans the badge catalog and shows what is unlocked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{render_events, to_json};
use crate::config::Config;
use crate::core::BadgeId;
use crate::engine::Progression;
use crate::error::{exit_codes, FailOpen, QuestlogError};
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the badges command.
#[derive(Debug, Clone, Default)]
pub struct BadgesOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Include locked badges.
    pub all: bool,
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BadgeInfo {
    pub id: String,
    pub label: String,
    pub description: String,
    pub unlocked: bool,
}

/// Output format for the badges command.
#[derive(Debug, Clone, Serialize)]
pub struct BadgesOutput {
    pub success: bool,
    pub unlocked_count: usize,
    pub total: usize,
    pub badges: Vec<BadgeInfo>,
    /// Badges unlocked by this re-scan.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this result.
    #[serde(skip)]
    pub exit_code: i32,
}

impl BadgesOutput {
    /// Create a failed output.
    pub fn failure(error: &QuestlogError) -> Self {
        Self {
            success: false,
            unlocked_count: 0,
            total: BadgeId::ALL.len(),
            badges: Vec::new(),
            events: Vec::new(),
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
        }
    }
}

/// The badges command implementation.
pub struct BadgesCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> BadgesCommand<S> {
    /// Create a new badges command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    /// Run the badges command.
    pub fn run(&self, options: &BadgesOptions, now: DateTime<Utc>) -> BadgesOutput {
        let events = self
            .engine
            .evaluate_achievements(now)
            .map(|outcome| outcome.events)
            .fail_open_default("re-scanning badges");

        let profile = match self.engine.profile() {
            Ok(profile) => profile,
            Err(e) => return BadgesOutput::failure(&e),
        };

        let badges: Vec<BadgeInfo> = BadgeId::ALL
            .into_iter()
            .map(|badge| BadgeInfo {
                id: badge.as_str().to_string(),
                label: badge.label().to_string(),
                description: badge.description().to_string(),
                unlocked: profile.badges.contains(&badge),
            })
            .filter(|info| options.all || info.unlocked)
            .collect();

        BadgesOutput {
            success: true,
            unlocked_count: profile.badges.len(),
            total: BadgeId::ALL.len(),
            badges,
            events,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &BadgesOutput, options: &BadgesOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &BadgesOutput) -> String {
        if !output.success {
            return format!(
                "Badges failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = render_events(&output.events);
        out.push_str(&format!(
            "Badges: {}/{}\n",
            output.unlocked_count, output.total
        ));
        for badge in &output.badges {
            let mark = if badge.unlocked { "x" } else { " " };
            out.push_str(&format!(
                "[{}] {:<16} {}\n",
                mark, badge.label, badge.description
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Priority, Profile, Task};
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_lists_unlocked_only_by_default() {
        let store = Arc::new(MemoryStore::new());
        let mut profile = Profile::with_xp(0);
        profile.badges.insert(BadgeId::NightOwl);
        store.put_profile(&profile).unwrap();

        let cmd = BadgesCommand::new(Arc::clone(&store), &Config::default());
        let output = cmd.run(&BadgesOptions::default(), now());

        assert!(output.success);
        assert_eq!(output.unlocked_count, 1);
        assert_eq!(output.badges.len(), 1);
        assert_eq!(output.badges[0].id, "night_owl");
    }

    #[test]
    fn test_all_shows_catalog() {
        let store = Arc::new(MemoryStore::new());
        let cmd = BadgesCommand::new(Arc::clone(&store), &Config::default());

        let output = cmd.run(
            &BadgesOptions {
                all: true,
                ..Default::default()
            },
            now(),
        );

        assert_eq!(output.badges.len(), 14);
        assert!(output.badges.iter().all(|b| !b.unlocked));
    }

    #[test]
    fn test_rescan_unlocks_missing_badges() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_task(&Task::new("t0001", "imported", 10, now()).with_priority(Priority::High))
            .unwrap();

        let cmd = BadgesCommand::new(Arc::clone(&store), &Config::default());
        let output = cmd.run(&BadgesOptions::default(), now());

        assert_eq!(
            output.events,
            vec![ProgressEvent::BadgeUnlocked {
                badge: BadgeId::Prioritizer
            }]
        );
        assert_eq!(output.badges[0].id, "prioritizer");

        let again = cmd.run(&BadgesOptions::default(), now());
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_format_output() {
        let store = Arc::new(MemoryStore::new());
        let cmd = BadgesCommand::new(Arc::clone(&store), &Config::default());
        let output = cmd.run(&BadgesOptions::default(), now());

        assert_eq!(
            cmd.format_output(&output, &BadgesOptions::default()),
            "Badges: 0/14\n"
        );

        let json = cmd.format_output(
            &output,
            &BadgesOptions {
                json: true,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["total"], 14);
    }
}
