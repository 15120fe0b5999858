//! Job: one release of a task.

use crate::task::Task;
use crate::types::{TaskId, Tick};

/// A concrete release of a [`Task`] with its own remaining-time countdown.
///
/// `remaining` only decreases while the job occupies the processor, and
/// `started` only decides whether a logged interval opens with `Start` or
/// `Resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Release index within the owning task, starting at 0.
    pub seq: u64,
    pub task: TaskId,
    pub remaining: Tick,
    /// Arrival instant.
    pub release: Tick,
    pub absolute_deadline: Tick,
    pub started: bool,
}

impl Job {
    pub fn new(task: &Task, seq: u64, release: Tick, exec_time: Tick) -> Self {
        Job {
            seq,
            task: task.id,
            remaining: exec_time,
            release,
            absolute_deadline: release.saturating_add(task.deadline),
            started: false,
        }
    }

    /// Whether the job has been released at `tick`.
    pub fn has_arrived(&self, tick: Tick) -> bool {
        self.release <= tick
    }

    /// Completion time if the job ran uninterrupted from `tick`.
    pub fn finish_time_from(&self, tick: Tick) -> Option<Tick> {
        tick.checked_add(self.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_deadline() {
        let task = Task::new(1, 50, 10).with_offset(20);
        let job = Job::new(&task, 0, 20, 10);
        assert_eq!(job.absolute_deadline, 70);
        assert!(!job.started);
        assert!(!job.has_arrived(19));
        assert!(job.has_arrived(20));
        assert_eq!(job.finish_time_from(25), Some(35));
    }
}
