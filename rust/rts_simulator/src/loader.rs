//! Task-set file loader.
//!
//! Reads the JSON task-set container format:
//!
//! ```json
//! {
//!   "task_sets": [
//!     {
//!       "id": 0,
//!       "tasks": [
//!         { "id": 1, "period": 50, "wcet": 10, "initial_offset": 20, "priority": 2 },
//!         { "id": 2, "period": 100, "wcet": 30, "arrival": "sporadic" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Deadlines are implicit (equal to the period). Omitted fields default to
//! offset 0, priority 1, periodic arrival and the name `APP<id>`.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::task::{ArrivalKind, Task, TaskSet};
use crate::types::{Priority, Tick};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContainerSpec {
    task_sets: Vec<TaskSetSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskSetSpec {
    #[serde(default)]
    id: u32,
    tasks: Vec<TaskSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskSpec {
    id: u32,
    #[serde(default)]
    name: Option<String>,
    period: Tick,
    wcet: Tick,
    #[serde(default)]
    initial_offset: Tick,
    #[serde(default = "default_priority")]
    priority: Priority,
    #[serde(default)]
    arrival: ArrivalKind,
}

fn default_priority() -> Priority {
    1
}

impl TaskSpec {
    fn into_task(self) -> Task {
        let task = Task::new(self.id, self.period, self.wcet)
            .with_offset(self.initial_offset)
            .with_priority(self.priority);
        let task = match self.name {
            Some(name) => task.with_name(name),
            None => task,
        };
        match self.arrival {
            ArrivalKind::Periodic => task,
            ArrivalKind::Sporadic => task.sporadic(),
        }
    }
}

/// A file may hold several task sets; each keeps its declared id.
#[derive(Debug, Clone)]
pub struct TaskSetContainer {
    sets: Vec<(u32, TaskSet)>,
}

impl TaskSetContainer {
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Task set at position `index` in the file.
    pub fn get(&self, index: usize) -> Option<&TaskSet> {
        self.sets.get(index).map(|(_, set)| set)
    }

    /// Declared id of the task set at position `index`.
    pub fn id_of(&self, index: usize) -> Option<u32> {
        self.sets.get(index).map(|(id, _)| *id)
    }
}

/// Parse a task-set container from a JSON string. Every set is validated
/// with [`TaskSet::new`].
pub fn parse_task_sets(json: &str) -> Result<TaskSetContainer> {
    let doc: ContainerSpec = serde_json::from_str(json)?;
    if doc.task_sets.is_empty() {
        return Err(SimError::Load("file contains no task sets".into()));
    }
    let mut sets = Vec::with_capacity(doc.task_sets.len());
    for set in doc.task_sets {
        let tasks: Vec<Task> = set.tasks.into_iter().map(TaskSpec::into_task).collect();
        debug!(set = set.id, tasks = tasks.len(), "parsed task set");
        sets.push((set.id, TaskSet::new(tasks)?));
    }
    Ok(TaskSetContainer { sets })
}

/// Read and parse a task-set file.
pub fn load_task_sets(path: impl AsRef<Path>) -> Result<TaskSetContainer> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| SimError::Load(format!("{}: {e}", path.display())))?;
    parse_task_sets(&json)
}
