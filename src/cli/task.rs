//! Task command for questlog.
//!
//! Adds, lists, completes, reopens and removes tasks. Completion changes go
//! through the progression service so XP, level and badges stay in step.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{render_events, to_json, ProfileInfo};
use crate::config::Config;
use crate::core::{parse_instant, Calendar, Priority, Task};
use crate::engine::{NewTask, Outcome, Progression};
use crate::error::{exit_codes, QuestlogError, Result};
use crate::events::ProgressEvent;
use crate::storage::ProgressStore;

/// Options for the task command.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Which tasks to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Open,
    Done,
}

impl TaskFilter {
    fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Open => !task.is_completed(),
            Self::Done => task.is_completed(),
        }
    }
}

/// Task view for output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub xp_value: u32,
    /// Local due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl TaskInfo {
    /// Build the view, rendering dates in the calendar's timezone.
    pub fn from_task(task: &Task, calendar: &Calendar) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: if task.is_completed() { "done" } else { "open" }.to_string(),
            priority: task.priority.map(|p| p.display_name().to_string()),
            xp_value: task.xp_value,
            due: task
                .due_date
                .map(|due| calendar.local_date(due).format("%Y-%m-%d").to_string()),
            completed_at: task.completed_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Output format for the task command.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutput {
    /// Whether the action succeeded.
    pub success: bool,
    /// The action performed.
    pub action: String,
    /// The task acted on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskInfo>,
    /// Listed tasks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskInfo>,
    /// Profile after the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfo>,
    /// Progression events, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProgressEvent>,
    /// Error message if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Process exit code for this result.
    #[serde(skip)]
    pub exit_code: i32,
}

impl TaskOutput {
    fn success(action: &str, task: Option<TaskInfo>, outcome: Option<Outcome>) -> Self {
        let (profile, events) = match outcome {
            Some(outcome) => (Some(ProfileInfo::from(&outcome.profile)), outcome.events),
            None => (None, Vec::new()),
        };
        Self {
            success: true,
            action: action.to_string(),
            task,
            tasks: Vec::new(),
            profile,
            events,
            error: None,
            exit_code: exit_codes::SUCCESS,
        }
    }

    /// Create a successful list output.
    pub fn listed(tasks: Vec<TaskInfo>) -> Self {
        Self {
            tasks,
            ..Self::success("list", None, None)
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: &QuestlogError) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            task: None,
            tasks: Vec::new(),
            profile: None,
            events: Vec::new(),
            error: Some(error.to_string()),
            exit_code: error.exit_code(),
        }
    }
}

/// Parse a due date given as `YYYY-MM-DD` (local noon) or RFC 3339.
pub fn parse_due(value: &str, calendar: &Calendar) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        return Ok(calendar.midday(date));
    }
    parse_instant(value).ok_or_else(|| {
        QuestlogError::invalid_input(format!(
            "invalid due date '{}': expected YYYY-MM-DD or RFC 3339",
            value
        ))
    })
}

/// Parse a priority name.
pub fn parse_priority(value: &str) -> Result<Priority> {
    Priority::parse(value).ok_or_else(|| {
        QuestlogError::invalid_input(format!(
            "invalid priority '{}': expected low, medium or high",
            value
        ))
    })
}

/// The task command implementation.
pub struct TaskCommand<S: ProgressStore> {
    engine: Progression<S>,
}

impl<S: ProgressStore> TaskCommand<S> {
    /// Create a new task command.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            engine: Progression::with_config(store, config),
        }
    }

    fn info(&self, task: &Task) -> TaskInfo {
        TaskInfo::from_task(task, self.engine.calendar())
    }

    /// Create a task.
    pub fn add(&self, new_task: NewTask, now: DateTime<Utc>) -> TaskOutput {
        match self.engine.add_task(new_task, now) {
            Ok((task, outcome)) => TaskOutput::success("add", Some(self.info(&task)), Some(outcome)),
            Err(e) => TaskOutput::failure("add", &e),
        }
    }

    /// List tasks matching `filter`, open ones first.
    pub fn list(&self, filter: TaskFilter) -> TaskOutput {
        match self.engine.list_tasks() {
            Ok(mut tasks) => {
                tasks.retain(|t| filter.matches(t));
                tasks.sort_by(|a, b| {
                    a.is_completed()
                        .cmp(&b.is_completed())
                        .then_with(|| a.id.cmp(&b.id))
                });
                TaskOutput::listed(tasks.iter().map(|t| self.info(t)).collect())
            }
            Err(e) => TaskOutput::failure("list", &e),
        }
    }

    /// Complete a task.
    pub fn done(&self, id: &str, now: DateTime<Utc>) -> TaskOutput {
        self.transition("done", id, self.engine.complete_task(id, now))
    }

    /// Reopen a completed task.
    pub fn undo(&self, id: &str, now: DateTime<Utc>) -> TaskOutput {
        self.transition("undo", id, self.engine.uncomplete_task(id, now))
    }

    /// Flip a task between open and done.
    pub fn toggle(&self, id: &str, now: DateTime<Utc>) -> TaskOutput {
        self.transition("toggle", id, self.engine.toggle_task(id, now))
    }

    /// Delete a task.
    pub fn remove(&self, id: &str, now: DateTime<Utc>) -> TaskOutput {
        match self.engine.delete_task(id, now) {
            Ok(outcome) => TaskOutput::success("rm", None, Some(outcome)),
            Err(e) => TaskOutput::failure("rm", &e),
        }
    }

    fn transition(&self, action: &str, id: &str, result: Result<Outcome>) -> TaskOutput {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => return TaskOutput::failure(action, &e),
        };
        let task = match self.engine.store().get_task(id) {
            Ok(task) => task.map(|t| self.info(&t)),
            Err(e) => {
                tracing::warn!("reloading task {}: {}", id, e);
                None
            }
        };
        TaskOutput::success(action, task, Some(outcome))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &TaskOutput, options: &TaskOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            to_json(output)
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &TaskOutput) -> String {
        if !output.success {
            return format!(
                "Task {} failed: {}\n",
                output.action,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();

        if output.action == "list" {
            if output.tasks.is_empty() {
                return "No tasks.\n".to_string();
            }
            for task in &output.tasks {
                out.push_str(&format_task_line(task));
            }
            return out;
        }

        match (&output.task, output.action.as_str()) {
            (Some(task), "add") => out.push_str(&format!("Added {}: {}\n", task.id, task.title)),
            (Some(task), _) => out.push_str(&format_task_line(task)),
            (None, "rm") => out.push_str("Task removed.\n"),
            (None, _) => {}
        }

        if output.events.is_empty() && output.action != "add" && output.action != "rm" {
            out.push_str("No change.\n");
        }
        out.push_str(&render_events(&output.events));
        out
    }
}

fn format_task_line(task: &TaskInfo) -> String {
    let mark = if task.status == "done" { "x" } else { " " };
    let mut line = format!("[{}] {}  {}  ({} XP)", mark, task.id, task.title, task.xp_value);
    if let Some(priority) = &task.priority {
        line.push_str(&format!("  !{}", priority));
    }
    if let Some(due) = &task.due {
        line.push_str(&format!("  due {}", due));
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BadgeId;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    fn setup() -> (TaskCommand<Arc<MemoryStore>>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cmd = TaskCommand::new(Arc::clone(&store), &Config::default());
        (cmd, store)
    }

    #[test]
    fn test_parse_due() {
        let cal = Calendar::default();
        assert_eq!(
            parse_due("2025-03-12", &cal).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due("2025-03-12T08:30:00Z", &cal).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 12, 8, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_due("next tuesday", &cal),
            Err(QuestlogError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("HIGH").unwrap(), Priority::High);
        assert_eq!(
            parse_priority("urgent").unwrap_err().exit_code(),
            exit_codes::USAGE
        );
    }

    #[test]
    fn test_add_and_list() {
        let (cmd, _store) = setup();
        let added = cmd.add(
            NewTask {
                priority: Some(Priority::High),
                ..NewTask::titled("Write report")
            },
            now(),
        );

        assert!(added.success);
        let task = added.task.unwrap();
        assert_eq!(task.id, "t0001");
        assert_eq!(task.priority.as_deref(), Some("High"));
        assert_eq!(
            added.events,
            vec![ProgressEvent::BadgeUnlocked {
                badge: BadgeId::Prioritizer
            }]
        );

        let listed = cmd.list(TaskFilter::All);
        assert_eq!(listed.tasks.len(), 1);
    }

    #[test]
    fn test_add_empty_title_fails() {
        let (cmd, store) = setup();
        let output = cmd.add(NewTask::titled(""), now());

        assert!(!output.success);
        assert!(output.error.unwrap().contains("title"));
        assert_eq!(store.task_count(), 0);
    }

    #[test]
    fn test_done_and_undo() {
        let (cmd, _store) = setup();
        cmd.add(NewTask::titled("Laundry"), now());

        let done = cmd.done("t0001", now());
        assert!(done.success);
        assert_eq!(done.exit_code, exit_codes::SUCCESS);
        assert_eq!(done.task.as_ref().unwrap().status, "done");
        assert_eq!(done.profile.as_ref().unwrap().xp_total, 10);

        let undone = cmd.undo("t0001", now());
        assert_eq!(undone.task.as_ref().unwrap().status, "open");
        assert_eq!(undone.profile.as_ref().unwrap().xp_total, 0);
    }

    #[test]
    fn test_toggle_flips() {
        let (cmd, _store) = setup();
        cmd.add(NewTask::titled("Dishes"), now());

        assert_eq!(cmd.toggle("t0001", now()).task.unwrap().status, "done");
        assert_eq!(cmd.toggle("t0001", now()).task.unwrap().status, "open");
    }

    #[test]
    fn test_done_unknown_task() {
        let (cmd, _store) = setup();
        let output = cmd.done("t0042", now());

        assert!(!output.success);
        assert_eq!(output.exit_code, exit_codes::USAGE);
        assert!(output.error.unwrap().contains("t0042"));
    }

    #[test]
    fn test_list_filters_and_orders() {
        let (cmd, _store) = setup();
        cmd.add(NewTask::titled("a"), now());
        cmd.add(NewTask::titled("b"), now());
        cmd.add(NewTask::titled("c"), now());
        cmd.done("t0001", now());

        let all: Vec<String> = cmd
            .list(TaskFilter::All)
            .tasks
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(all, vec!["t0002", "t0003", "t0001"]);

        assert_eq!(cmd.list(TaskFilter::Open).tasks.len(), 2);
        assert_eq!(cmd.list(TaskFilter::Done).tasks.len(), 1);
    }

    #[test]
    fn test_remove() {
        let (cmd, store) = setup();
        cmd.add(NewTask::titled("gone"), now());

        assert!(cmd.remove("t0001", now()).success);
        assert_eq!(store.task_count(), 0);
        assert!(!cmd.remove("t0001", now()).success);
    }

    #[test]
    fn test_format_human_readable() {
        let (cmd, _store) = setup();
        let options = TaskOptions::default();

        assert_eq!(
            cmd.format_output(&cmd.list(TaskFilter::All), &options),
            "No tasks.\n"
        );

        let added = cmd.add(NewTask::titled("Call mom"), now());
        assert_eq!(
            cmd.format_output(&added, &options),
            "Added t0001: Call mom\n"
        );

        let done = cmd.done("t0001", now());
        let text = cmd.format_output(&done, &options);
        assert!(text.starts_with("[x] t0001  Call mom  (10 XP)\n"));
        assert!(text.contains("+10 XP"));

        let again = cmd.done("t0001", now());
        assert!(cmd.format_output(&again, &options).contains("No change."));
    }

    #[test]
    fn test_format_json_and_quiet() {
        let (cmd, _store) = setup();
        let output = cmd.done("t0099", now());

        let json = cmd.format_output(
            &output,
            &TaskOptions {
                json: true,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["action"], "done");

        let quiet = TaskOptions {
            quiet: true,
            ..Default::default()
        };
        assert!(cmd.format_output(&output, &quiet).is_empty());
    }
}
