//! Redeem command for questlog.
//!
//! Spends XP on a named reward and adds it to the inventory.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{render_events, to_json, ProfileInfo};
use crate::config::Config;
use crate::engine::Progression;
use crate::error::exit_codes;
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the redeem command.
#[derive(Debug, Clone, Default)]
pub struct RedeemOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the redeem command.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemOutput {
    pub success: bool,
    pub item: String,
    pub cost: u64,
    /// How many of the item are now owned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owned: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this result.
    #[serde(skip)]
    pub exit_code: i32,
}

/// The redeem command implementation.
pub struct RedeemCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> RedeemCommand<S> {
    /// Create a new redeem command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    /// Redeem `item` for `cost` XP.
    pub fn run(&self, item: &str, cost: u64, now: DateTime<Utc>) -> RedeemOutput {
        let mut output = RedeemOutput {
            success: false,
            item: item.trim().to_string(),
            cost,
            owned: None,
            profile: None,
            events: Vec::new(),
            error: None,
            exit_code: exit_codes::SUCCESS,
        };

        match self.engine.redeem(item, cost, now) {
            Ok(outcome) => {
                output.success = true;
                output.owned = outcome.profile.inventory.get(&output.item).copied();
                output.profile = Some(ProfileInfo::from(&outcome.profile));
                output.events = outcome.events;
            }
            Err(e) => {
                output.error = Some(e.to_string());
                output.exit_code = e.exit_code();
            }
        }
        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RedeemOutput, options: &RedeemOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        if !output.success {
            return format!(
                "Could not redeem {}: {}\n",
                output.item,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = format!(
            "Redeemed {} for {} XP (owned: {})\n",
            output.item,
            output.cost,
            output.owned.unwrap_or(0)
        );
        out.push_str(&render_events(&output.events));
        out
    }
}
