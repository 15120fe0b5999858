//! Job-release bookkeeping.
//!
//! For every task the [`ReleaseManager`] holds the next job that has not
//! finished yet, whether it has arrived or still lies in the future. The map
//! is keyed by [`TaskId`] in a `BTreeMap` so that every scan visits tasks in
//! ascending id order.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{Result, SimError};
use crate::job::Job;
use crate::task::{Task, TaskSet};
use crate::types::{TaskId, Tick};
use crate::variation::Variation;

#[derive(Debug, Clone, Default)]
pub struct ReleaseManager {
    jobs: BTreeMap<TaskId, Job>,
}

impl ReleaseManager {
    /// Create the first job of every task at its initial offset.
    ///
    /// Execution demands are drawn in ascending task-id order.
    pub fn initialize_first_jobs(tasks: &TaskSet, variation: &mut dyn Variation) -> Result<Self> {
        let mut jobs = BTreeMap::new();
        for id in tasks.ids_sorted() {
            let task = tasks.get(id).ok_or_else(|| SimError::InvalidTask {
                id,
                reason: "task vanished from its set".into(),
            })?;
            let exec = checked_execution_time(task, variation.execution_time(task))?;
            jobs.insert(id, Job::new(task, 0, task.initial_offset, exec));
        }
        Ok(ReleaseManager { jobs })
    }

    /// Replace `task`'s finished job with its next release.
    ///
    /// Only called once the current job's remaining time reached zero. For
    /// sporadic tasks the inter-arrival gap is drawn before the execution
    /// demand.
    pub fn update_task_job(&mut self, task: &Task, variation: &mut dyn Variation) -> Result<&Job> {
        let (last_release, last_seq) = match self.jobs.get(&task.id) {
            Some(job) if job.remaining == 0 => (job.release, job.seq),
            Some(job) => {
                return Err(SimError::PolicyContract {
                    task: task.id,
                    tick: job.release,
                    detail: format!("job replaced with {} ticks left", job.remaining),
                })
            }
            None => {
                return Err(SimError::InvalidTask {
                    id: task.id,
                    reason: "no job tracked for task".into(),
                })
            }
        };

        let gap = if task.is_sporadic() {
            let gap = variation.inter_arrival_time(task);
            if gap < task.period {
                return Err(SimError::VariationContract {
                    task: task.id,
                    detail: format!("inter-arrival {gap} below minimum {}", task.period),
                });
            }
            gap
        } else {
            task.period
        };
        let release = last_release
            .checked_add(gap)
            .ok_or(SimError::ClockOverflow {
                tick: last_release,
                delta: gap,
            })?;
        let exec = checked_execution_time(task, variation.execution_time(task))?;

        trace!(task = task.id.0, seq = last_seq + 1, release, exec, "next job");
        let job = Job::new(task, last_seq + 1, release, exec);
        self.jobs.insert(task.id, job);
        Ok(&self.jobs[&task.id])
    }

    /// The job with the smallest release time. Ties go to the lowest task id.
    pub fn earliest_arrived_job(&self) -> Option<&Job> {
        let mut earliest: Option<&Job> = None;
        for job in self.jobs.values() {
            match earliest {
                Some(e) if e.release <= job.release => {}
                _ => earliest = Some(job),
            }
        }
        earliest
    }

    pub fn get(&self, task: TaskId) -> Option<&Job> {
        self.jobs.get(&task)
    }

    pub(crate) fn get_mut(&mut self, task: TaskId) -> Option<&mut Job> {
        self.jobs.get_mut(&task)
    }

    /// Next job of every task, in ascending task-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn checked_execution_time(task: &Task, exec: Tick) -> Result<Tick> {
    if exec == 0 || exec > task.wcet {
        return Err(SimError::VariationContract {
            task: task.id,
            detail: format!("execution time {exec} outside 1..={}", task.wcet),
        });
    }
    Ok(exec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variation::Deterministic;

    struct Fixed {
        exec: Tick,
        gap: Tick,
    }

    impl Variation for Fixed {
        fn execution_time(&mut self, _task: &Task) -> Tick {
            self.exec
        }
        fn inter_arrival_time(&mut self, _task: &Task) -> Tick {
            self.gap
        }
    }

    fn set() -> TaskSet {
        TaskSet::new(vec![
            Task::new(2, 100, 30),
            Task::new(1, 50, 10).with_offset(20),
            Task::new(3, 80, 5).sporadic(),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_jobs_at_offsets() {
        let rm = ReleaseManager::initialize_first_jobs(&set(), &mut Deterministic).unwrap();
        assert_eq!(rm.len(), 3);
        assert_eq!(rm.get(TaskId(1)).unwrap().release, 20);
        assert_eq!(rm.get(TaskId(2)).unwrap().remaining, 30);
        let ids: Vec<_> = rm.iter().map(|j| j.task).collect();
        assert_eq!(ids, vec![TaskId(1), TaskId(2), TaskId(3)]);
    }

    #[test]
    fn test_earliest_tie_goes_to_lowest_id() {
        let rm = ReleaseManager::initialize_first_jobs(&set(), &mut Deterministic).unwrap();
        assert_eq!(rm.earliest_arrived_job().unwrap().task, TaskId(2));
    }

    #[test]
    fn test_update_requires_finished_job() {
        let tasks = set();
        let mut rm = ReleaseManager::initialize_first_jobs(&tasks, &mut Deterministic).unwrap();
        let task = tasks.get(TaskId(2)).unwrap();
        assert!(matches!(
            rm.update_task_job(task, &mut Deterministic),
            Err(SimError::PolicyContract { .. })
        ));
        rm.get_mut(TaskId(2)).unwrap().remaining = 0;
        let next = rm.update_task_job(task, &mut Deterministic).unwrap();
        assert_eq!((next.seq, next.release, next.remaining), (1, 100, 30));
    }

    #[test]
    fn test_sporadic_gap_below_period_rejected() {
        let tasks = set();
        let mut rm = ReleaseManager::initialize_first_jobs(&tasks, &mut Deterministic).unwrap();
        rm.get_mut(TaskId(3)).unwrap().remaining = 0;
        let mut short = Fixed { exec: 5, gap: 79 };
        assert!(matches!(
            rm.update_task_job(tasks.get(TaskId(3)).unwrap(), &mut short),
            Err(SimError::VariationContract { .. })
        ));
        let mut ok = Fixed { exec: 5, gap: 95 };
        let next = rm
            .update_task_job(tasks.get(TaskId(3)).unwrap(), &mut ok)
            .unwrap();
        assert_eq!(next.release, 95);
    }

    #[test]
    fn test_execution_time_out_of_range_rejected() {
        let mut bad = Fixed { exec: 0, gap: 100 };
        assert!(matches!(
            ReleaseManager::initialize_first_jobs(&set(), &mut bad),
            Err(SimError::VariationContract { .. })
        ));
    }
}
