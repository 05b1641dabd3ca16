//! Progression events and notification sinks.
//!
//! The engine never renders or dispatches anything itself. It returns
//! [`ProgressEvent`]s and callers hand them to a [`NotificationSink`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::BadgeId;
use crate::error::Result;

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// XP total changed.
    XpChanged { from: u64, to: u64 },
    /// The new level is strictly higher than the old one.
    LeveledUp { from: u32, to: u32 },
    /// A badge was unlocked for the first time.
    BadgeUnlocked { badge: BadgeId },
    /// A habit's streak counters changed.
    StreakChanged {
        habit_id: String,
        current: u32,
        longest: u32,
    },
}

impl ProgressEvent {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        match self {
            Self::XpChanged { from, to } if to >= from => format!("+{} XP ({} total)", to - from, to),
            Self::XpChanged { from, to } => format!("-{} XP ({} total)", from - to, to),
            Self::LeveledUp { to, .. } => format!("Level up! You reached level {}", to),
            Self::BadgeUnlocked { badge } => {
                format!("Badge unlocked: {} ({})", badge.label(), badge.description())
            }
            Self::StreakChanged {
                current, longest, ..
            } => format!("Streak: {} day(s), best {}", current, longest),
        }
    }

    /// Whether the event deserves a celebratory notification.
    pub fn is_celebration(&self) -> bool {
        matches!(self, Self::LeveledUp { .. } | Self::BadgeUnlocked { .. })
    }
}

/// Receiver for progression events.
pub trait NotificationSink: Send + Sync {
    /// Deliver one event.
    fn notify(&self, event: &ProgressEvent) -> Result<()>;

    /// Deliver events in order, stopping at the first failure.
    fn notify_all(&self, events: &[ProgressEvent]) -> Result<()> {
        events.iter().try_for_each(|event| self.notify(event))
    }
}

/// Sink that logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &ProgressEvent) -> Result<()> {
        match event {
            ProgressEvent::LeveledUp { from, to } => {
                tracing::info!(from, to, "level up");
            }
            ProgressEvent::BadgeUnlocked { badge } => {
                tracing::info!(badge = badge.as_str(), "badge unlocked");
            }
            ProgressEvent::XpChanged { from, to } => {
                tracing::debug!(from, to, "xp changed");
            }
            ProgressEvent::StreakChanged {
                habit_id,
                current,
                longest,
            } => {
                tracing::debug!(habit_id = habit_id.as_str(), current, longest, "streak changed");
            }
        }
        Ok(())
    }
}

/// Sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, event: &ProgressEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summaries() {
        assert_eq!(
            ProgressEvent::XpChanged { from: 90, to: 120 }.summary(),
            "+30 XP (120 total)"
        );
        assert_eq!(
            ProgressEvent::XpChanged { from: 120, to: 90 }.summary(),
            "-30 XP (90 total)"
        );
        assert_eq!(
            ProgressEvent::LeveledUp { from: 0, to: 1 }.summary(),
            "Level up! You reached level 1"
        );
        assert!(ProgressEvent::BadgeUnlocked {
            badge: BadgeId::NightOwl
        }
        .summary()
        .contains("Night Owl"));
    }

    #[test]
    fn test_is_celebration() {
        assert!(ProgressEvent::LeveledUp { from: 1, to: 2 }.is_celebration());
        assert!(!ProgressEvent::XpChanged { from: 1, to: 2 }.is_celebration());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&ProgressEvent::BadgeUnlocked {
            badge: BadgeId::Streak7,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"badge_unlocked","badge":"streak_7"}"#);
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        let events = vec![
            ProgressEvent::XpChanged { from: 0, to: 100 },
            ProgressEvent::LeveledUp { from: 0, to: 1 },
        ];

        sink.notify_all(&events).unwrap();

        assert_eq!(sink.events(), events);
    }

    #[test]
    fn test_tracing_sink_accepts_everything() {
        let sink = TracingSink;
        let events = vec![
            ProgressEvent::XpChanged { from: 0, to: 10 },
            ProgressEvent::LeveledUp { from: 0, to: 1 },
            ProgressEvent::BadgeUnlocked {
                badge: BadgeId::FirstTask,
            },
            ProgressEvent::StreakChanged {
                habit_id: "h0001".to_string(),
                current: 3,
                longest: 5,
            },
        ];
        assert!(sink.notify_all(&events).is_ok());
    }
}
