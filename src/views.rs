//! Read-only task views: the filtered board, calendar events and stats.

use crate::error::AppError;
use crate::types::{Priority, Task, TaskStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Priority ordering of the pending column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritySort {
    #[default]
    HighToLow,
    LowToHigh,
}

impl FromStr for PrioritySort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, AppError> {
        match s.trim().to_lowercase().as_str() {
            "high_to_low" => Ok(PrioritySort::HighToLow),
            "low_to_high" => Ok(PrioritySort::LowToHigh),
            _ => Err(AppError::validation(
                "sort",
                format!("Invalid sort '{}'. Valid values: high_to_low, low_to_high", s),
            )),
        }
    }
}

/// Board filters. All are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    /// Exact tag membership.
    pub tag: Option<String>,
    /// Case-insensitive title substring.
    pub search: Option<String>,
    pub sort: PrioritySort,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }
        if let Some(ref tag) = self.tag
            && !tag.is_empty()
            && !task.has_tag(tag)
        {
            return false;
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !task.title.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// The task board of one owner.
#[derive(Debug, Clone, Serialize)]
pub struct TaskBoard {
    /// Pending tasks, sorted by priority. Ties keep store order.
    pub pending: Vec<Task>,
    /// Completed tasks in store order.
    pub completed: Vec<Task>,
    /// Every tag across the owner's tasks, unfiltered.
    pub all_tags: Vec<String>,
}

impl TaskBoard {
    pub fn build(tasks: &[Task], query: &TaskQuery) -> Self {
        let (completed, mut pending): (Vec<Task>, Vec<Task>) = tasks
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .partition(Task::is_completed);

        match query.sort {
            PrioritySort::HighToLow => pending.sort_by_key(|t| t.priority.rank()),
            PrioritySort::LowToHigh => pending.sort_by_key(|t| Reverse(t.priority.rank())),
        }

        Self {
            pending,
            completed,
            all_tags: all_tags(tasks),
        }
    }
}

/// Sorted, deduplicated tags across `tasks`.
pub fn all_tags(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| t.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One all-day calendar entry per task, at its due date.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub all_day: bool,
    pub priority: Priority,
    pub status: TaskStatus,
    pub color: &'static str,
}

impl CalendarEvent {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            date: task.due_date,
            all_day: true,
            priority: task.priority,
            status: task.status,
            color: priority_color(task.priority),
        }
    }
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "#ef5350",
        Priority::Medium => "#ffca28",
        Priority::Low => "#66bb6a",
    }
}

pub fn calendar_events(tasks: &[Task]) -> Vec<CalendarEvent> {
    tasks.iter().map(CalendarEvent::from_task).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub pending: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn count(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.is_completed()).count();
        Self {
            pending: tasks.len() - completed,
            completed,
        }
    }
}
