//! Error type shared by the engine, the task model and the loader.

use crate::types::{TaskId, Tick};

/// Errors reported by the simulator.
///
/// Configuration errors (`EmptyTaskSet`, `InvalidTask`, `DuplicateTask`,
/// `UnknownPolicy`) surface before any engine state exists. The contract
/// variants indicate that an injected policy or variation source broke its
/// promises mid-run; the engine stops instead of clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A task set with no application tasks.
    EmptyTaskSet,
    /// A task whose parameters make simulation impossible.
    InvalidTask { id: TaskId, reason: String },
    /// Two tasks share an id.
    DuplicateTask(TaskId),
    /// Unrecognized scheduling policy name.
    UnknownPolicy(String),
    /// A policy hook returned a job that violates the engine's invariants.
    PolicyContract { task: TaskId, tick: Tick, detail: String },
    /// A variation source drew a value outside the task's bounds.
    VariationContract { task: TaskId, detail: String },
    /// Virtual time no longer fits in a `Tick`.
    ClockOverflow { tick: Tick, delta: Tick },
    /// `run_sim` called on an engine that has already been advanced.
    AlreadyAdvanced { tick: Tick },
    /// Task-set file could not be read or parsed.
    Load(String),
    /// Writing an exported trace failed.
    Io(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::EmptyTaskSet => write!(f, "task set contains no tasks"),
            SimError::InvalidTask { id, reason } => write!(f, "invalid task {id}: {reason}"),
            SimError::DuplicateTask(id) => write!(f, "duplicate task id {id}"),
            SimError::UnknownPolicy(name) => write!(f, "unknown scheduling policy: {name:?}"),
            SimError::PolicyContract { task, tick, detail } => {
                write!(f, "policy contract violated at tick {tick} (task {task}): {detail}")
            }
            SimError::VariationContract { task, detail } => {
                write!(f, "variation contract violated for task {task}: {detail}")
            }
            SimError::ClockOverflow { tick, delta } => {
                write!(f, "virtual clock overflow: {tick} + {delta}")
            }
            SimError::AlreadyAdvanced { tick } => {
                write!(f, "run_sim requires a fresh engine (clock already at {tick})")
            }
            SimError::Load(msg) => write!(f, "failed to load task set: {msg}"),
            SimError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Load(format!("JSON parse error: {e}"))
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
