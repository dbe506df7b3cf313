//! Task store: owner-scoped CRUD with a coherent read cache.
//!
//! Every mutating call invalidates the owner's cached list before returning.

mod cache;

pub use cache::TaskCache;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::{
    DeleteFilter, NewTask, Priority, Task, TaskStatus, TitleUpdate, UpdateOutcome,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Task store shared by the API, the assistant and the MCP surface.
pub struct TaskStore {
    db: Arc<Database>,
    cache: TaskCache,
}

impl TaskStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            cache: TaskCache::new(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    fn invalidate(&self, owner: &str) {
        if self.cache.invalidate(owner) {
            debug!(owner = %owner, "Task cache invalidated");
        }
    }

    /// Create a task for `owner`.
    pub fn add(&self, owner: &str, input: NewTask) -> AppResult<Task> {
        let result = self.db.create_task(owner, input);
        self.invalidate(owner);
        let task = result?;
        info!(owner = %owner, task_id = %task.id, "Task created");
        Ok(task)
    }

    /// All tasks of `owner`, oldest first.
    pub fn list(&self, owner: &str) -> AppResult<Arc<Vec<Task>>> {
        let generation = match self.cache.lookup(owner) {
            Ok(tasks) => return Ok(tasks),
            Err(generation) => generation,
        };
        let tasks = self.db.list_tasks(owner)?;
        Ok(self.cache.put(owner, generation, tasks))
    }

    /// One task by id, only if it belongs to `owner`.
    ///
    /// Another owner's task reports NotFound, same as a missing id.
    pub fn get_owned(&self, owner: &str, task_id: &str) -> AppResult<Task> {
        match self.db.get_task(task_id)? {
            Some(task) if task.owner == owner => Ok(task),
            _ => Err(AppError::task_not_found(task_id)),
        }
    }

    pub fn update_status(&self, task_id: &str, status: TaskStatus) -> AppResult<Task> {
        let task = self.db.update_task_status(task_id, status)?;
        self.invalidate(&task.owner);
        info!(owner = %task.owner, task_id = %task_id, status = %status, "Task status updated");
        Ok(task)
    }

    pub fn update_details(
        &self,
        task_id: &str,
        priority: Priority,
        due_date: NaiveDate,
        tags: Vec<String>,
    ) -> AppResult<Task> {
        let task = self.db.update_task_details(task_id, priority, due_date, tags)?;
        self.invalidate(&task.owner);
        info!(owner = %task.owner, task_id = %task_id, "Task details updated");
        Ok(task)
    }

    pub fn delete(&self, task_id: &str) -> AppResult<Task> {
        let task = self.db.delete_task(task_id)?;
        self.invalidate(&task.owner);
        info!(owner = %task.owner, task_id = %task_id, "Task deleted");
        Ok(task)
    }

    /// Update the single task whose title equals `title` (case-insensitive).
    pub fn update_by_title(
        &self,
        owner: &str,
        title: &str,
        update: &TitleUpdate,
    ) -> AppResult<UpdateOutcome> {
        let outcome = self.db.update_task_by_title(owner, title, update)?;
        if let UpdateOutcome::Updated(ref task) = outcome {
            self.invalidate(owner);
            info!(owner = %owner, task_id = %task.id, "Task updated by title");
        }
        Ok(outcome)
    }

    /// Delete the single task whose title contains `title`, narrowed by `filter`.
    pub fn delete_by_title(&self, owner: &str, title: &str, filter: &DeleteFilter) -> AppResult<Task> {
        let task = self.db.delete_task_by_title(owner, title, filter)?;
        self.invalidate(owner);
        info!(owner = %owner, task_id = %task.id, "Task deleted by title");
        Ok(task)
    }

    /// Delete the most recently created task whose title equals `title`.
    pub fn delete_newest_exact(&self, owner: &str, title: &str) -> AppResult<Task> {
        let newest = self
            .db
            .find_tasks_by_exact_title(owner, title)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::title_not_found(title))?;
        self.delete(&newest.id)
    }

    #[cfg(test)]
    pub(crate) fn cached_owners(&self) -> usize {
        self.cache.len()
    }
}
