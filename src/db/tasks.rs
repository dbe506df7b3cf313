//! Task CRUD and title-addressed operations.
//!
//! These are raw storage calls. Reads here bypass the per-owner cache, so
//! callers outside the crate go through [`crate::store::TaskStore`].

use super::{Database, ms_to_datetime, now_ms};
use crate::error::{AppError, AppResult};
use crate::types::{
    DeleteFilter, NewTask, Priority, Task, TaskStatus, TitleUpdate, UpdateOutcome,
    normalize_tags, union_tags,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, owner, title, status, priority, due_date, tags, created_at";

fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let due_date: String = row.get("due_date")?;
    let tags_json: String = row.get("tags")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(Task {
        id: row.get("id")?,
        owner: row.get("owner")?,
        title: row.get("title")?,
        status: status.parse().map_err(|e| conversion_error(3, e))?,
        priority: priority.parse().map_err(|e| conversion_error(4, e))?,
        due_date: crate::types::parse_due_date(&due_date).map_err(|e| conversion_error(5, e))?,
        tags: serde_json::from_str(&tags_json)
            .map_err(|e| conversion_error(6, AppError::from(e)))?,
        created_at: ms_to_datetime(created_at),
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: &str) -> AppResult<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    match stmt.query_row(params![task_id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All tasks of an owner, oldest first.
fn tasks_for_owner_internal(conn: &Connection, owner: &str) -> AppResult<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE owner = ?1 ORDER BY created_at ASC, rowid ASC",
        TASK_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![owner], parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn write_fields(conn: &Connection, task: &Task) -> AppResult<()> {
    conn.execute(
        "UPDATE tasks SET status = ?2, priority = ?3, due_date = ?4, tags = ?5 WHERE id = ?1",
        params![
            task.id,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date.to_string(),
            serde_json::to_string(&task.tags)?,
        ],
    )?;
    Ok(())
}

fn same_title(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn titles(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|t| t.title.clone()).collect()
}

impl Database {
    /// Create a new task for `owner` with a fresh UUID7 id.
    pub fn create_task(&self, owner: &str, input: NewTask) -> AppResult<Task> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title", "Task title cannot be empty."));
        }

        let task = Task {
            id: Uuid::now_v7().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            tags: normalize_tags(&input.tags),
            created_at: ms_to_datetime(now_ms()),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, owner, title, status, priority, due_date, tags, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    task.id,
                    task.owner,
                    task.title,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.due_date.to_string(),
                    serde_json::to_string(&task.tags)?,
                    task.created_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })?;

        Ok(task)
    }

    /// Get a task by id.
    pub fn get_task(&self, task_id: &str) -> AppResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// All tasks of an owner, oldest first.
    pub fn list_tasks(&self, owner: &str) -> AppResult<Vec<Task>> {
        self.with_conn(|conn| tasks_for_owner_internal(conn, owner))
    }

    /// Set the status of a task. Returns the task as stored afterwards.
    pub fn update_task_status(&self, task_id: &str, status: TaskStatus) -> AppResult<Task> {
        self.with_conn(|conn| {
            let mut task =
                get_task_internal(conn, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;
            if task.status != status {
                task.status = status;
                write_fields(conn, &task)?;
            }
            Ok(task)
        })
    }

    /// Replace priority, due date and tags of a task (the edit form).
    pub fn update_task_details(
        &self,
        task_id: &str,
        priority: Priority,
        due_date: NaiveDate,
        tags: Vec<String>,
    ) -> AppResult<Task> {
        self.with_conn(|conn| {
            let mut task =
                get_task_internal(conn, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;
            task.priority = priority;
            task.due_date = due_date;
            task.tags = normalize_tags(&tags);
            write_fields(conn, &task)?;
            Ok(task)
        })
    }

    /// Permanently delete a task. Returns the removed task.
    pub fn delete_task(&self, task_id: &str) -> AppResult<Task> {
        self.with_conn(|conn| {
            let task =
                get_task_internal(conn, task_id)?.ok_or_else(|| AppError::task_not_found(task_id))?;
            conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            Ok(task)
        })
    }

    /// Tasks of `owner` whose title equals `title` ignoring case, newest first.
    pub fn find_tasks_by_exact_title(&self, owner: &str, title: &str) -> AppResult<Vec<Task>> {
        self.with_conn(|conn| {
            let mut matches: Vec<Task> = tasks_for_owner_internal(conn, owner)?
                .into_iter()
                .filter(|t| same_title(&t.title, title))
                .collect();
            matches.reverse();
            Ok(matches)
        })
    }

    /// Update the single task of `owner` whose title equals `title` ignoring case.
    ///
    /// New tags are unioned with the existing ones.
    pub fn update_task_by_title(
        &self,
        owner: &str,
        title: &str,
        update: &TitleUpdate,
    ) -> AppResult<UpdateOutcome> {
        if update.is_empty() {
            return Err(AppError::validation(
                "fields",
                "No new information was provided to update the task.",
            ));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut matches: Vec<Task> = tasks_for_owner_internal(&tx, owner)?
                .into_iter()
                .filter(|t| same_title(&t.title, title))
                .collect();

            let mut task = match matches.len() {
                0 => return Err(AppError::title_not_found(title)),
                1 => matches.remove(0),
                _ => return Err(AppError::ambiguous(&titles(&matches))),
            };
            let before = task.clone();

            if let Some(status) = update.status {
                task.status = status;
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(due_date) = update.due_date {
                task.due_date = due_date;
            }
            if let Some(ref tags) = update.tags {
                task.tags = union_tags(&task.tags, tags);
            }

            if task == before {
                return Ok(UpdateOutcome::Unchanged(task));
            }

            write_fields(&tx, &task)?;
            tx.commit()?;
            Ok(UpdateOutcome::Updated(task))
        })
    }

    /// Delete the single task of `owner` whose title contains `title` ignoring
    /// case, after narrowing by the optional priority and tag filters.
    pub fn delete_task_by_title(
        &self,
        owner: &str,
        title: &str,
        filter: &DeleteFilter,
    ) -> AppResult<Task> {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::missing_field("title"));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut matches: Vec<Task> = tasks_for_owner_internal(&tx, owner)?
                .into_iter()
                .filter(|t| t.title.to_lowercase().contains(&needle))
                .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
                .filter(|t| match filter.tags {
                    Some(ref tags) if !tags.is_empty() => tags.iter().any(|tag| t.has_tag(tag)),
                    _ => true,
                })
                .collect();

            let task = match matches.len() {
                0 => return Err(AppError::title_not_found(title)),
                1 => matches.remove(0),
                _ => return Err(AppError::ambiguous(&titles(&matches))),
            };

            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task.id])?;
            tx.commit()?;
            Ok(task)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        crate::types::parse_due_date(s).unwrap()
    }

    #[test]
    fn create_rejects_blank_title() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .create_task("alice", NewTask::new("   ", Priority::Low, date("2025-01-01"), vec![]))
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
        assert!(db.list_tasks("alice").unwrap().is_empty());
    }

    #[test]
    fn create_normalizes_tags() {
        let db = Database::open_in_memory().unwrap();
        let task = db
            .create_task(
                "alice",
                NewTask::new(
                    "Pack",
                    Priority::Medium,
                    date("2025-02-01"),
                    vec!["trip".into(), "".into(), "trip".into(), "home".into()],
                ),
            )
            .unwrap();
        assert_eq!(task.tags, vec!["trip", "home"]);
        let stored = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[test]
    fn corrupt_tags_column_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.create_task("alice", NewTask::new("Pack", Priority::Low, date("2025-02-01"), vec![]))
            .unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET tags = 'not json'", [])?;
            Ok(())
        })
        .unwrap();

        let err = db.list_tasks("alice").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::StorageUnavailable);
    }

    #[test]
    fn exact_title_lookup_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .create_task("alice", NewTask::new("Read", Priority::Low, date("2025-01-01"), vec![]))
            .unwrap();
        let second = db
            .create_task("alice", NewTask::new("read", Priority::High, date("2025-01-02"), vec![]))
            .unwrap();

        let found = db.find_tasks_by_exact_title("alice", "READ").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, second.id);
        assert_eq!(found[1].id, first.id);
    }

    #[test]
    fn update_by_title_requires_fields() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .update_task_by_title("alice", "anything", &TitleUpdate::default())
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}
