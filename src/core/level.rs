//! XP to level mapping.
//!
//! Levels follow quadratic thresholds: `level = floor(0.1 * sqrt(xp))`, so
//! level 1 starts at 100 XP, level 2 at 400 XP and level 3 at 900 XP.
//! The math runs on integer square roots to keep thresholds exact.

use serde::{Deserialize, Serialize};

use crate::error::{QuestlogError, Result};

/// Reciprocal of the level constant `k = 0.1`.
pub const LEVEL_DIVISOR: u64 = 10;

/// Level for a given XP total.
pub fn level_for(xp_total: u64) -> u32 {
    let level = xp_total.isqrt() / LEVEL_DIVISOR;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// XP needed to reach `level`. Inverse of [`level_for`].
pub fn xp_required_for(level: u32) -> u64 {
    let root = u64::from(level).saturating_mul(LEVEL_DIVISOR);
    root.saturating_mul(root)
}

/// Progress through `level` toward the next one, as a percentage in `[0, 100]`.
pub fn progress_fraction(xp_total: u64, level: u32) -> f64 {
    let floor = xp_required_for(level);
    let ceiling = xp_required_for(level.saturating_add(1));
    let span = ceiling.saturating_sub(floor);
    if span == 0 {
        return 100.0;
    }

    let into_level = xp_total as f64 - floor as f64;
    (into_level / span as f64 * 100.0).clamp(0.0, 100.0)
}

/// Whether moving from `old` to `new` is a level-up event.
pub fn leveled_up(old: u32, new: u32) -> bool {
    new > old
}

/// How a negative XP result is handled at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeXpPolicy {
    /// Floor the total at zero.
    #[default]
    Clamp,
    /// Refuse the adjustment.
    Reject,
}

impl NegativeXpPolicy {
    /// Parse a policy name as used in config files and env vars.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clamp" => Some(Self::Clamp),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// The config spelling of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Reject => "reject",
        }
    }
}

/// Apply a signed XP delta to a total.
///
/// Totals never go negative. Under [`NegativeXpPolicy::Reject`] an adjustment
/// that would cross zero fails with [`QuestlogError::InvalidXp`].
pub fn apply_xp_delta(total: u64, delta: i64, policy: NegativeXpPolicy) -> Result<u64> {
    if delta >= 0 {
        return Ok(total.saturating_add(delta.unsigned_abs()));
    }

    let loss = delta.unsigned_abs();
    match total.checked_sub(loss) {
        Some(remaining) => Ok(remaining),
        None => match policy {
            NegativeXpPolicy::Clamp => Ok(0),
            NegativeXpPolicy::Reject => Err(QuestlogError::InvalidXp { total, delta }),
        },
    }
}

/// Snapshot of where an XP total sits on the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level.
    pub level: u32,
    /// Total XP.
    pub xp_total: u64,
    /// XP at which the current level started.
    pub level_floor: u64,
    /// XP at which the next level starts.
    pub next_level_at: u64,
    /// Percentage through the current level.
    pub percent: f64,
}

impl LevelProgress {
    /// Compute progress for an XP total.
    pub fn from_xp(xp_total: u64) -> Self {
        let level = level_for(xp_total);
        Self {
            level,
            xp_total,
            level_floor: xp_required_for(level),
            next_level_at: xp_required_for(level.saturating_add(1)),
            percent: progress_fraction(xp_total, level),
        }
    }

    /// XP still missing before the next level.
    pub fn xp_to_next(&self) -> u64 {
        self.next_level_at.saturating_sub(self.xp_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for(0), 0);
        assert_eq!(level_for(99), 0);
        assert_eq!(level_for(100), 1);
        assert_eq!(level_for(399), 1);
        assert_eq!(level_for(400), 2);
        assert_eq!(level_for(899), 2);
        assert_eq!(level_for(900), 3);
        assert_eq!(level_for(2500), 5);
    }

    #[test]
    fn test_xp_required_for() {
        assert_eq!(xp_required_for(0), 0);
        assert_eq!(xp_required_for(1), 100);
        assert_eq!(xp_required_for(2), 400);
        assert_eq!(xp_required_for(3), 900);
        assert_eq!(xp_required_for(10), 10_000);
    }

    #[test]
    fn test_progress_fraction_endpoints() {
        assert_eq!(progress_fraction(400, 2), 0.0);
        assert_eq!(progress_fraction(900, 2), 100.0);
        assert_eq!(progress_fraction(650, 2), 50.0);
    }

    #[test]
    fn test_progress_fraction_clamped() {
        // Level passed in is stale relative to the total.
        assert_eq!(progress_fraction(50, 2), 0.0);
        assert_eq!(progress_fraction(5000, 2), 100.0);
    }

    #[test]
    fn test_leveled_up() {
        assert!(leveled_up(1, 2));
        assert!(!leveled_up(2, 2));
        assert!(!leveled_up(3, 2));
    }

    #[test]
    fn test_apply_xp_delta_positive() {
        assert_eq!(apply_xp_delta(10, 15, NegativeXpPolicy::Reject).unwrap(), 25);
    }

    #[test]
    fn test_apply_xp_delta_clamp() {
        assert_eq!(apply_xp_delta(10, -50, NegativeXpPolicy::Clamp).unwrap(), 0);
        assert_eq!(apply_xp_delta(60, -50, NegativeXpPolicy::Clamp).unwrap(), 10);
    }

    #[test]
    fn test_apply_xp_delta_reject() {
        let err = apply_xp_delta(10, -50, NegativeXpPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            QuestlogError::InvalidXp {
                total: 10,
                delta: -50
            }
        ));
        assert_eq!(apply_xp_delta(50, -50, NegativeXpPolicy::Reject).unwrap(), 0);
    }

    #[test]
    fn test_negative_xp_policy_parse() {
        assert_eq!(NegativeXpPolicy::parse("clamp"), Some(NegativeXpPolicy::Clamp));
        assert_eq!(NegativeXpPolicy::parse("reject"), Some(NegativeXpPolicy::Reject));
        assert_eq!(NegativeXpPolicy::parse("ignore"), None);
        assert_eq!(NegativeXpPolicy::Reject.as_str(), "reject");
    }

    #[test]
    fn test_level_progress() {
        let progress = LevelProgress::from_xp(450);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.level_floor, 400);
        assert_eq!(progress.next_level_at, 900);
        assert_eq!(progress.xp_to_next(), 450);
        assert!((progress.percent - 10.0).abs() < 1e-9);
    }

    // =========================================================================
    // Property-based tests
    // =========================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: level is monotonically non-decreasing in xp
            #[test]
            fn prop_level_monotonic(a in 0u64..10_000_000, b in 0u64..10_000_000) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(level_for(lo) <= level_for(hi));
            }

            // Property: the level's threshold brackets the xp total
            #[test]
            fn prop_level_consistent_with_inverse(xp in 0u64..100_000_000) {
                let level = level_for(xp);
                prop_assert!(xp_required_for(level) <= xp);
                prop_assert!(xp < xp_required_for(level + 1));
            }

            // Property: progress is 0 at a threshold and 100 at the next
            #[test]
            fn prop_progress_endpoints(level in 0u32..1_000) {
                prop_assert_eq!(progress_fraction(xp_required_for(level), level), 0.0);
                prop_assert_eq!(progress_fraction(xp_required_for(level + 1), level), 100.0);
            }

            // Property: progress always lies in [0, 100]
            #[test]
            fn prop_progress_bounded(xp in 0u64..10_000_000, level in 0u32..500) {
                let p = progress_fraction(xp, level);
                prop_assert!((0.0..=100.0).contains(&p));
            }

            // Property: clamped totals never underflow
            #[test]
            fn prop_clamp_never_fails(total in 0u64..1_000_000, delta in -2_000_000i64..2_000_000) {
                prop_assert!(apply_xp_delta(total, delta, NegativeXpPolicy::Clamp).is_ok());
            }
        }
    }
}
