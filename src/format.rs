//! Plain-text task summaries for chat replies and operation results.

use crate::types::{Task, TaskStatus};

/// One task as a single summary line.
pub fn format_task_line(task: &Task) -> String {
    let mut line = format!(
        "- {} [{}] priority: {}, due: {}",
        task.title,
        task.status,
        task.priority,
        task.due_date.format("%Y-%m-%d")
    );
    if !task.tags.is_empty() {
        line.push_str(&format!(", tags: {}", task.tags.join(", ")));
    }
    line
}

/// A task list as text, headed by a count.
pub fn format_task_list(tasks: &[&Task], status: Option<TaskStatus>) -> String {
    let qualifier = status.map(|s| format!("{} ", s.as_str().to_lowercase())).unwrap_or_default();

    if tasks.is_empty() {
        return format!("You have no {}tasks.", qualifier);
    }

    let mut out = format!(
        "You have {} {}task{}:\n",
        tasks.len(),
        qualifier,
        if tasks.len() == 1 { "" } else { "s" }
    );
    let lines: Vec<String> = tasks.iter().map(|t| format_task_line(t)).collect();
    out.push_str(&lines.join("\n"));
    out
}
