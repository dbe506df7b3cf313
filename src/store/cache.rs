//! Per-owner cache of task lists.
//!
//! Each owner has a generation counter that every write bumps. A reader
//! notes the generation before loading from the database and may only fill
//! the cache if no write landed in between, so a list loaded before a write
//! can never be cached after it.

use crate::types::Task;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Slot {
    generation: u64,
    tasks: Option<Arc<Vec<Task>>>,
}

/// Thread-safe cache of `owner -> tasks`.
#[derive(Default)]
pub struct TaskCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Slot updates are single assignments, so a poisoned map is still consistent.
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached list for `owner`, or the generation to pass to [`put`](Self::put)
    /// after loading it.
    pub fn lookup(&self, owner: &str) -> Result<Arc<Vec<Task>>, u64> {
        let slots = self.slots();
        match slots.get(owner) {
            Some(Slot {
                tasks: Some(tasks), ..
            }) => Ok(Arc::clone(tasks)),
            Some(slot) => Err(slot.generation),
            None => Err(0),
        }
    }

    /// Fill the entry for `owner` unless a write happened since `generation`.
    pub fn put(&self, owner: &str, generation: u64, tasks: Vec<Task>) -> Arc<Vec<Task>> {
        let tasks = Arc::new(tasks);
        let mut slots = self.slots();
        let slot = slots.entry(owner.to_string()).or_default();
        if slot.generation == generation {
            slot.tasks = Some(Arc::clone(&tasks));
        }
        tasks
    }

    /// Drop the list for `owner` and fence out in-flight loads.
    /// Returns `true` if a list was cached.
    pub fn invalidate(&self, owner: &str) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(owner.to_string()).or_default();
        slot.generation += 1;
        slot.tasks.take().is_some()
    }

    /// Number of owners with a cached list.
    pub fn len(&self) -> usize {
        self.slots().values().filter(|s| s.tasks.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
