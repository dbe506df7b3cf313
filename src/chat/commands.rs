//! Local chat commands handled without the reasoning service.

use super::ChatReply;
use crate::error::{AppResult, ErrorCode};
use crate::store::TaskStore;
use crate::types::{NewTask, Priority, normalize_tags};
use chrono::Local;
use std::sync::Arc;

/// A literal command recognized before falling back to the model.
pub trait CommandMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn handles(&self, input: &str) -> bool;

    fn execute(&self, owner: &str, input: &str) -> AppResult<ChatReply>;
}

/// Strip a case-insensitive keyword prefix, returning the trimmed remainder.
///
/// The keyword must be followed by whitespace or the end of input, so
/// `add tasks` is not `add task` with title `s`.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let input = input.trim_start();
    let head = input.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &input[keyword.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// `add task <title>`
pub struct AddTaskCommand {
    store: Arc<TaskStore>,
    default_tags: Vec<String>,
}

impl AddTaskCommand {
    pub const KEYWORD: &'static str = "add task";

    pub fn new(store: Arc<TaskStore>, default_tags: Vec<String>) -> Self {
        Self {
            store,
            default_tags: normalize_tags(default_tags),
        }
    }
}

impl CommandMatcher for AddTaskCommand {
    fn name(&self) -> &'static str {
        "add_task"
    }

    fn handles(&self, input: &str) -> bool {
        strip_keyword(input, Self::KEYWORD).is_some()
    }

    fn execute(&self, owner: &str, input: &str) -> AppResult<ChatReply> {
        let title = strip_keyword(input, Self::KEYWORD).unwrap_or_default();
        if title.is_empty() {
            return Ok(ChatReply::text("Please specify the task to add after 'add task'."));
        }

        let task = self.store.add(
            owner,
            NewTask::new(
                title,
                Priority::Medium,
                Local::now().date_naive(),
                self.default_tags.clone(),
            ),
        )?;
        Ok(ChatReply::changed(format!(
            "✅ Task '{}' was added successfully!",
            task.title
        )))
    }
}

/// `delete task <title>`: exact title, newest match wins.
pub struct DeleteTaskCommand {
    store: Arc<TaskStore>,
}

impl DeleteTaskCommand {
    pub const KEYWORD: &'static str = "delete task";

    pub fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

impl CommandMatcher for DeleteTaskCommand {
    fn name(&self) -> &'static str {
        "delete_task"
    }

    fn handles(&self, input: &str) -> bool {
        strip_keyword(input, Self::KEYWORD).is_some()
    }

    fn execute(&self, owner: &str, input: &str) -> AppResult<ChatReply> {
        let title = strip_keyword(input, Self::KEYWORD).unwrap_or_default();
        if title.is_empty() {
            return Ok(ChatReply::text(
                "Please specify the task to delete after 'delete task'.",
            ));
        }

        match self.store.delete_newest_exact(owner, title) {
            Ok(task) => Ok(ChatReply::changed(format!(
                "🗑️ Task '{}' was deleted successfully!",
                task.title
            ))),
            Err(e) if e.code == ErrorCode::NotFound => {
                Ok(ChatReply::text(format!("❓ Task '{}' not found.", title)))
            }
            Err(e) => Err(e),
        }
    }
}
