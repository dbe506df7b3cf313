//! Task operations offered to the model.

use super::{ToolOutcome, get_string, get_string_array, make_function};
use crate::error::{AppError, AppResult};
use crate::format::format_task_list;
use crate::llm::FunctionSpec;
use crate::store::TaskStore;
use crate::types::{
    DeleteFilter, NewTask, Priority, TaskStatus, TitleUpdate, UpdateOutcome, normalize_tags,
    parse_due_date,
};
use chrono::Local;
use serde_json::{Value, json};

pub fn get_functions() -> Vec<FunctionSpec> {
    vec![
        make_function(
            "get_tasks",
            "Get the user's tasks, optionally only those with a given status.",
            json!({
                "status": {
                    "type": "string",
                    "enum": TaskStatus::ALL,
                    "description": "Only return tasks with this status"
                }
            }),
            vec![],
        ),
        make_function(
            "add_task",
            "Add a new task for the user.",
            json!({
                "title": {
                    "type": "string",
                    "description": "Task title"
                },
                "priority": {
                    "type": "string",
                    "enum": Priority::ALL,
                    "description": "Task priority (default: Medium)"
                },
                "due_date": {
                    "type": "string",
                    "format": "date",
                    "description": "Due date as YYYY-MM-DD (default: today)"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Free-text tags"
                }
            }),
            vec!["title"],
        ),
        make_function(
            "update_task_by_title",
            "Update the task whose title matches exactly (case-insensitive). New tags are added to the existing ones.",
            json!({
                "title": {
                    "type": "string",
                    "description": "Exact title of the task to update"
                },
                "new_status": {
                    "type": "string",
                    "enum": TaskStatus::ALL,
                    "description": "New status"
                },
                "new_priority": {
                    "type": "string",
                    "enum": Priority::ALL,
                    "description": "New priority"
                },
                "new_due_date": {
                    "type": "string",
                    "format": "date",
                    "description": "New due date as YYYY-MM-DD"
                },
                "new_tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Tags to add"
                }
            }),
            vec!["title"],
        ),
        make_function(
            "delete_task_by_title",
            "Delete the task whose title contains the given text. Use priority or tags to narrow the match when several tasks share a title.",
            json!({
                "title": {
                    "type": "string",
                    "description": "Title, or part of it, of the task to delete"
                },
                "priority": {
                    "type": "string",
                    "enum": Priority::ALL,
                    "description": "Only match tasks with this priority"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only match tasks sharing one of these tags"
                }
            }),
            vec!["title"],
        ),
    ]
}

fn get_priority(args: &Value, key: &str) -> AppResult<Option<Priority>> {
    get_string(args, key).map(|s| s.parse()).transpose()
}

fn get_status(args: &Value, key: &str) -> AppResult<Option<TaskStatus>> {
    get_string(args, key).map(|s| s.parse()).transpose()
}

fn get_title(args: &Value) -> AppResult<String> {
    let title = get_string(args, "title").unwrap_or_default();
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title", "Title cannot be empty."));
    }
    Ok(title.to_string())
}

pub fn get_tasks(store: &TaskStore, owner: &str, args: &Value) -> AppResult<ToolOutcome> {
    let status = get_status(args, "status")?;
    let tasks = store.list(owner)?;
    let selected: Vec<_> = tasks
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();
    Ok(ToolOutcome::read(format_task_list(&selected, status)))
}

pub fn add_task(store: &TaskStore, owner: &str, args: &Value) -> AppResult<ToolOutcome> {
    let title = get_title(args)?;
    let priority = get_priority(args, "priority")?.unwrap_or_default();
    let due_date = match get_string(args, "due_date") {
        Some(s) => parse_due_date(&s)?,
        None => Local::now().date_naive(),
    };
    let tags = normalize_tags(get_string_array(args, "tags").unwrap_or_default());

    let task = store.add(owner, NewTask::new(title, priority, due_date, tags))?;
    Ok(ToolOutcome::write(format!(
        "Successfully added the task: '{}' (priority {}, due {}).",
        task.title,
        task.priority,
        task.due_date.format("%Y-%m-%d")
    )))
}

pub fn update_task_by_title(store: &TaskStore, owner: &str, args: &Value) -> AppResult<ToolOutcome> {
    let title = get_title(args)?;
    let update = TitleUpdate {
        status: get_status(args, "new_status")?,
        priority: get_priority(args, "new_priority")?,
        due_date: get_string(args, "new_due_date")
            .map(|s| parse_due_date(&s))
            .transpose()?,
        tags: get_string_array(args, "new_tags").map(normalize_tags),
    };

    let outcome = store.update_by_title(owner, &title, &update)?;
    let mutated = matches!(outcome, UpdateOutcome::Updated(_));
    Ok(ToolOutcome {
        text: outcome.message(),
        mutated,
        is_error: false,
    })
}

pub fn delete_task_by_title(store: &TaskStore, owner: &str, args: &Value) -> AppResult<ToolOutcome> {
    let title = get_title(args)?;
    let filter = DeleteFilter {
        priority: get_priority(args, "priority")?,
        tags: get_string_array(args, "tags").map(normalize_tags),
    };

    let task = store.delete_by_title(owner, &title, &filter)?;
    Ok(ToolOutcome::write(format!(
        "Successfully deleted the task: '{}'.",
        task.title
    )))
}
