use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::{WorkflowError, WorkflowResult};

/// Durable snapshot of an in-flight run: the merged state so far and
/// which node the next superstep should resume at.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub state: Map<String, Value>,
    pub frontier: Vec<String>,
}

pub trait Checkpointer: Send + Sync {
    fn save(&self, thread_id: &str, checkpoint: Checkpoint);
    fn load(&self, thread_id: &str) -> WorkflowResult<Checkpoint>;
    fn clear(&self, thread_id: &str);
    fn peek(&self, thread_id: &str) -> Option<Checkpoint>;
}

/// Process-local checkpoint store, keyed by `thread_id`. Adequate for a
/// single orchestrator process; a multi-process deployment would swap
/// this for a database-backed implementation behind the same trait.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: DashMap<String, Checkpoint>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpointer for InMemoryCheckpointer {
    fn save(&self, thread_id: &str, checkpoint: Checkpoint) {
        self.threads.insert(thread_id.to_string(), checkpoint);
    }

    fn load(&self, thread_id: &str) -> WorkflowResult<Checkpoint> {
        self.threads
            .get(thread_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| WorkflowError::NoCheckpoint(thread_id.to_string()))
    }

    fn clear(&self, thread_id: &str) {
        self.threads.remove(thread_id);
    }

    fn peek(&self, thread_id: &str) -> Option<Checkpoint> {
        self.threads.get(thread_id).map(|entry| entry.value().clone())
    }
}
