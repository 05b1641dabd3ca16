//! XP command for questlog.
//!
//! Manual XP adjustments, positive or negative.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{render_events, to_json, ProfileInfo};
use crate::config::Config;
use crate::engine::Progression;
use crate::error::exit_codes;
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the xp command.
#[derive(Debug, Clone, Default)]
pub struct XpOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the xp command.
#[derive(Debug, Clone, Serialize)]
pub struct XpOutput {
    pub success: bool,
    /// Requested adjustment.
    pub delta: i64,
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

/// The xp command implementation.
pub struct XpCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> XpCommand<S> {
    /// Create a new xp command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    /// Grant (or with a negative delta, take) XP.
    pub fn grant(&self, delta: i64, now: DateTime<Utc>) -> XpOutput {
        match self.engine.grant_xp(delta, now) {
            Ok(outcome) => XpOutput {
                success: true,
                delta,
                profile: Some(ProfileInfo::from(&outcome.profile)),
                events: outcome.events,
                error: None,
                exit_code: exit_codes::SUCCESS,
            },
            Err(e) => XpOutput {
                success: false,
                delta,
                profile: None,
                events: Vec::new(),
                error: Some(e.to_string()),
                exit_code: e.exit_code(),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &XpOutput, options: &XpOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return to_json(output);
        }

        match (&output.profile, &output.error) {
            (Some(profile), _) => {
                let mut out = render_events(&output.events);
                out.push_str(&format!(
                    "Level {} ({} XP)\n",
                    profile.level, profile.xp_total
                ));
                out
            }
            (None, error) => format!(
                "XP grant failed: {}\n",
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
