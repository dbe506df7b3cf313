//! Core types for the TaskFlow service.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub const ALL: [&'static str; 2] = ["Pending", "Completed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(AppError::validation(
                "status",
                format!("Invalid status '{}'. Valid values: Pending, Completed", s),
            )),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [&'static str; 3] = ["High", "Medium", "Low"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(AppError::validation(
                "priority",
                format!("Invalid priority '{}'. Valid values: High, Medium, Low", s),
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl NewTask {
    pub fn new(title: impl Into<String>, priority: Priority, due_date: NaiveDate, tags: Vec<String>) -> Self {
        Self {
            title: title.into(),
            priority,
            due_date,
            tags,
            status: TaskStatus::Pending,
        }
    }
}

/// Field changes for a title-addressed update. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleUpdate {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    /// Unioned with the existing tags, never replacing them.
    pub tags: Option<Vec<String>>,
}

impl TitleUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
    }
}

/// Narrowing filters for a title-addressed delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteFilter {
    pub priority: Option<Priority>,
    /// Matches tasks sharing at least one of these tags.
    pub tags: Option<Vec<String>>,
}

/// Outcome of a title-addressed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Task),
    /// The matching task already had every requested value.
    Unchanged(Task),
}

impl UpdateOutcome {
    pub fn task(&self) -> &Task {
        match self {
            UpdateOutcome::Updated(t) | UpdateOutcome::Unchanged(t) => t,
        }
    }

    pub fn message(&self) -> String {
        match self {
            UpdateOutcome::Updated(t) => format!("Successfully updated the task: '{}'.", t.title),
            UpdateOutcome::Unchanged(t) => format!(
                "The task '{}' already had these properties. No update was necessary.",
                t.title
            ),
        }
    }
}

/// A registered user. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_due_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(
            "due_date",
            format!("Invalid date '{}'. Expected YYYY-MM-DD", s),
        )
    })
}

/// Drop empty and duplicate tags, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Union `extra` into `existing`, existing order first.
pub fn union_tags(existing: &[String], extra: &[String]) -> Vec<String> {
    normalize_tags(existing.iter().chain(extra.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!(" Pending ".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn priority_parses_and_ranks() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High.rank() < Priority::Low.rank());
    }

    #[test]
    fn priority_serializes_capitalized() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "High");
        assert_eq!(serde_json::to_value(TaskStatus::Completed).unwrap(), "Completed");
    }

    #[test]
    fn union_keeps_order_and_dedupes() {
        let existing = vec!["a".to_string()];
        let extra = vec!["b".to_string(), "a".to_string()];
        assert_eq!(union_tags(&existing, &extra), vec!["a", "b"]);
    }

    #[test]
    fn due_date_requires_iso() {
        assert_eq!(
            parse_due_date("2025-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert!(parse_due_date("10/01/2025").is_err());
    }

    #[test]
    fn empty_title_update() {
        assert!(TitleUpdate::default().is_empty());
        let update = TitleUpdate {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
