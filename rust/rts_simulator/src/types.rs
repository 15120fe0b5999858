//! Newtype wrappers and type aliases for domain concepts.
//!
//! Task identifiers are a newtype so they cannot be confused with tick
//! counts or priorities. Virtual time and priorities are plain aliases:
//! they take part in arithmetic and comparisons everywhere.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Task identifier, unique within a task set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Reserved for the synthetic idle task of every task set.
    pub const IDLE: TaskId = TaskId(0);

    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated time in ticks. One tick is 100us in the CLI's unit conversions,
/// but the engine itself is unit-agnostic.
pub type Tick = u64;

/// Static task priority. 1 is the lowest; larger values are more urgent.
pub type Priority = u32;
