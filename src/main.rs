//! questlog - gamified task and habit tracking
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};

use questlog::cli::badges::{BadgesCommand, BadgesOptions};
use questlog::cli::habit::{parse_day, HabitCommand, HabitOptions};
use questlog::cli::redeem::{RedeemCommand, RedeemOptions};
use questlog::cli::status::{StatusCommand, StatusOptions};
use questlog::cli::task::{parse_due, parse_priority, TaskCommand, TaskFilter, TaskOptions};
use questlog::cli::xp::{XpCommand, XpOptions};
use questlog::config::{questlog_home, Config};
use questlog::engine::NewTask;
use questlog::error::{exit_codes, FailOpen, QuestlogError};
use questlog::events::{NotificationSink, ProgressEvent, TracingSink};
use questlog::storage::FileStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// questlog - earn XP, levels and badges for tasks and habits
#[derive(Parser)]
#[command(name = "questlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show level, XP, badges and streaks
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },

    /// Manage daily habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },

    /// Show unlocked badges
    Badges {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Include locked badges
        #[arg(long, short)]
        all: bool,
    },

    /// Adjust XP by hand
    Xp {
        #[command(subcommand)]
        action: XpAction,
        /// Output as JSON
        #[arg(long, short, global = true)]
        json: bool,
        /// Suppress output
        #[arg(long, short, global = true)]
        quiet: bool,
    },

    /// Spend XP on a reward
    Redeem {
        /// Reward item name
        item: String,
        /// XP cost
        cost: u64,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// XP awarded on completion
        #[arg(long)]
        xp: Option<u32>,
        /// Priority (low, medium, high)
        #[arg(long, short)]
        priority: Option<String>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, short)]
        due: Option<String>,
    },
    /// List tasks
    List {
        /// Only open tasks
        #[arg(long, conflicts_with = "done")]
        open: bool,
        /// Only completed tasks
        #[arg(long)]
        done: bool,
    },
    /// Complete a task
    Done {
        /// Task ID
        id: String,
    },
    /// Reopen a completed task
    Undo {
        /// Task ID
        id: String,
    },
    /// Flip a task between open and done
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand)]
enum HabitAction {
    /// Add a habit
    Add {
        /// Habit title
        title: String,
    },
    /// List habits
    List,
    /// Toggle a day for a habit
    Toggle {
        /// Habit ID
        id: String,
        /// Day to toggle (YYYY-MM-DD, default today)
        #[arg(long, short)]
        date: Option<String>,
    },
    /// Delete a habit and its log
    Rm {
        /// Habit ID
        id: String,
    },
}

#[derive(Subcommand)]
enum XpAction {
    /// Grant XP (negative amounts take XP away)
    Grant {
        /// XP amount
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    setup_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("questlog error: {}", e);
            let code = e
                .downcast_ref::<QuestlogError>()
                .map_or(exit_codes::ERROR, QuestlogError::exit_code);
            to_exit_code(code)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.questlog/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("questlog panic: {}", info);

        if let Some(home) = questlog_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Install the stderr subscriber, filtered by `QUESTLOG_LOG` (default `warn`).
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("QUESTLOG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Commands::Status { json, quiet } => run_status(&config, json, quiet),
        Commands::Task {
            action,
            json,
            quiet,
        } => run_task(&config, action, json, quiet),
        Commands::Habit {
            action,
            json,
            quiet,
        } => run_habit(&config, action, json, quiet),
        Commands::Badges { json, quiet, all } => run_badges(&config, json, quiet, all),
        Commands::Xp {
            action: XpAction::Grant { amount },
            json,
            quiet,
        } => run_xp(&config, amount, json, quiet),
        Commands::Redeem {
            item,
            cost,
            json,
            quiet,
        } => run_redeem(&config, &item, cost, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a command exit code to a process exit code.
fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(exit_codes::ERROR as u8))
}

/// Print formatted output unless empty.
fn emit(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

/// Hand events to the notification sink. Delivery failures never fail the command.
fn notify(events: &[ProgressEvent]) {
    TracingSink
        .notify_all(events)
        .fail_open_default("delivering notifications");
}

fn run_status(
    config: &Config,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = StatusCommand::new(FileStore::new()?, config);
    let options = StatusOptions { json, quiet };

    let output = cmd.run(Utc::now());
    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_task(
    config: &Config,
    action: TaskAction,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = TaskCommand::new(FileStore::new()?, config);
    let options = TaskOptions { json, quiet };
    let now = Utc::now();

    let output = match action {
        TaskAction::Add {
            title,
            xp,
            priority,
            due,
        } => {
            let priority = priority.as_deref().map(parse_priority).transpose()?;
            let due_date = due
                .as_deref()
                .map(|d| parse_due(d, &config.calendar()))
                .transpose()?;
            cmd.add(
                NewTask {
                    title,
                    xp_value: xp,
                    priority,
                    due_date,
                },
                now,
            )
        }
        TaskAction::List { open, done } => {
            let filter = match (open, done) {
                (true, _) => TaskFilter::Open,
                (_, true) => TaskFilter::Done,
                _ => TaskFilter::All,
            };
            cmd.list(filter)
        }
        TaskAction::Done { id } => cmd.done(&id, now),
        TaskAction::Undo { id } => cmd.undo(&id, now),
        TaskAction::Toggle { id } => cmd.toggle(&id, now),
        TaskAction::Rm { id } => cmd.remove(&id, now),
    };

    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_habit(
    config: &Config,
    action: HabitAction,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = HabitCommand::new(FileStore::new()?, config);
    let options = HabitOptions { json, quiet };
    let now = Utc::now();

    let output = match action {
        HabitAction::Add { title } => cmd.add(&title, now),
        HabitAction::List => cmd.list(now),
        HabitAction::Toggle { id, date } => {
            let date = date.as_deref().map(parse_day).transpose()?;
            cmd.toggle(&id, date, now)
        }
        HabitAction::Rm { id } => cmd.remove(&id),
    };

    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_badges(
    config: &Config,
    json: bool,
    quiet: bool,
    all: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = BadgesCommand::new(FileStore::new()?, config);
    let options = BadgesOptions { json, quiet, all };

    let output = cmd.run(&options, Utc::now());
    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_xp(
    config: &Config,
    amount: i64,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = XpCommand::new(FileStore::new()?, config);
    let options = XpOptions { json, quiet };

    let output = cmd.grant(amount, Utc::now());
    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

fn run_redeem(
    config: &Config,
    item: &str,
    cost: u64,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = RedeemCommand::new(FileStore::new()?, config);
    let options = RedeemOptions { json, quiet };

    let output = cmd.run(item, cost, Utc::now());
    notify(&output.events);
    emit(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}
