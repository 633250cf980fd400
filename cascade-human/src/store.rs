//! Durable task persistence — trait plus an in-memory backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use tier0::TaskId;

use crate::error::TaskError;
use crate::task::HumanTask;

/// How tasks persist. The durable backend is externally provided;
/// the coordinator only needs create/read/update.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task. Overwrites any task with the same id.
    async fn put(&self, task: &HumanTask) -> Result<(), TaskError>;

    /// Read a task by id. Returns `None` if the id is unknown.
    async fn get(&self, id: &TaskId) -> Result<Option<HumanTask>, TaskError>;

    /// Replace an existing task. Fails if the id is unknown.
    async fn update(&self, task: &HumanTask) -> Result<(), TaskError>;
}

/// In-memory task store backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for testing, prototyping, and single-process use cases
/// where persistence across restarts is not required.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, HumanTask>>,
}

impl MemoryTaskStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn put(&self, task: &HumanTask) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.to_string(), task.clone());
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<HumanTask>, TaskError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(id.as_str()).cloned())
    }

    async fn update(&self, task: &HumanTask) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task.id.as_str()) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(TaskError::NotFound(task.id.to_string())),
        }
    }
}
