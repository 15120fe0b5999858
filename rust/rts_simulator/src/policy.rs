//! Scheduling policies.
//!
//! A policy makes exactly two decisions for the engine: which job runs next
//! ([`SchedulingPolicy::next_job`]) and which job, if any, interrupts it
//! ([`SchedulingPolicy::preempting_job`]). Everything else (clock, release
//! bookkeeping, logging) is policy-independent and lives in the engine.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;
use crate::job::Job;
use crate::release::ReleaseManager;
use crate::task::TaskSet;
use crate::types::{Priority, Tick};

/// Decision hooks supplied by a concrete scheduling policy.
pub trait SchedulingPolicy {
    /// Short name used in logs and exported traces.
    fn name(&self) -> &'static str;

    /// Pick the job that occupies the processor from `tick` on.
    ///
    /// Among jobs released at or before `tick` the policy's winner is
    /// returned. If none has arrived, the job with the earliest future
    /// release is returned and the engine fast-forwards to it. `None` only
    /// for an empty release table.
    fn next_job<'a>(&self, tick: Tick, jobs: &'a ReleaseManager, tasks: &TaskSet)
        -> Option<&'a Job>;

    /// The earliest job of another task that arrives strictly inside
    /// `(tick, tick + run_job.remaining)` and strictly outranks `run_job`.
    /// A job arriving exactly when `run_job` finishes does not preempt it.
    fn preempting_job<'a>(
        &self,
        run_job: &Job,
        tick: Tick,
        jobs: &'a ReleaseManager,
        tasks: &TaskSet,
    ) -> Option<&'a Job>;
}

impl<P: SchedulingPolicy + ?Sized> SchedulingPolicy for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn next_job<'a>(
        &self,
        tick: Tick,
        jobs: &'a ReleaseManager,
        tasks: &TaskSet,
    ) -> Option<&'a Job> {
        (**self).next_job(tick, jobs, tasks)
    }

    fn preempting_job<'a>(
        &self,
        run_job: &Job,
        tick: Tick,
        jobs: &'a ReleaseManager,
        tasks: &TaskSet,
    ) -> Option<&'a Job> {
        (**self).preempting_job(run_job, tick, jobs, tasks)
    }
}

/// Jobs of other tasks released strictly inside `run_job`'s remaining window.
fn arrivals_during<'a>(
    run_job: &Job,
    tick: Tick,
    jobs: &'a ReleaseManager,
) -> impl Iterator<Item = &'a Job> {
    let owner = run_job.task;
    let finish = tick.saturating_add(run_job.remaining);
    jobs.iter()
        .filter(move |j| j.task != owner && j.release > tick && j.release < finish)
}

/// When nothing has arrived: the jobs sharing the earliest release, ranked
/// by `rank`.
fn earliest_upcoming<'a, K: Ord>(
    jobs: &'a ReleaseManager,
    rank: impl Fn(&Job) -> K,
) -> Option<&'a Job> {
    let first = jobs.earliest_arrived_job()?.release;
    jobs.iter().filter(|j| j.release == first).min_by_key(|j| rank(j))
}

/// Earliest-deadline-first. Equal deadlines are ordered by task id.
#[derive(Debug, Clone, Copy, Default)]
pub struct Edf;

impl SchedulingPolicy for Edf {
    fn name(&self) -> &'static str {
        "EDF"
    }

    fn next_job<'a>(
        &self,
        tick: Tick,
        jobs: &'a ReleaseManager,
        _tasks: &TaskSet,
    ) -> Option<&'a Job> {
        jobs.iter()
            .filter(|j| j.has_arrived(tick))
            .min_by_key(|j| (j.absolute_deadline, j.task))
            .or_else(|| earliest_upcoming(jobs, |j| (j.absolute_deadline, j.task)))
    }

    fn preempting_job<'a>(
        &self,
        run_job: &Job,
        tick: Tick,
        jobs: &'a ReleaseManager,
        _tasks: &TaskSet,
    ) -> Option<&'a Job> {
        arrivals_during(run_job, tick, jobs)
            .filter(|j| j.absolute_deadline < run_job.absolute_deadline)
            .min_by_key(|j| (j.release, j.absolute_deadline, j.task))
    }
}

/// Fixed-priority scheduling on the tasks' static priorities, which are
/// rate-monotonic when assigned by
/// [`TaskSet::assign_rate_monotonic_priorities`]. Equal priorities are
/// ordered by task id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateMonotonic;

/// Static priority of `job`'s task.
///
/// The engine builds its release table from the same `TaskSet` it hands to
/// the hooks, so the lookup only misses when a caller mixes tables. Such a
/// job gets priority 0, the lowest value, and never preempts.
fn priority_of(job: &Job, tasks: &TaskSet) -> Priority {
    tasks.get(job.task).map_or(0, |t| t.priority)
}

impl SchedulingPolicy for RateMonotonic {
    fn name(&self) -> &'static str {
        "RM"
    }

    fn next_job<'a>(
        &self,
        tick: Tick,
        jobs: &'a ReleaseManager,
        tasks: &TaskSet,
    ) -> Option<&'a Job> {
        jobs.iter()
            .filter(|j| j.has_arrived(tick))
            .min_by_key(|j| (Reverse(priority_of(j, tasks)), j.task))
            .or_else(|| earliest_upcoming(jobs, |j| (Reverse(priority_of(j, tasks)), j.task)))
    }

    fn preempting_job<'a>(
        &self,
        run_job: &Job,
        tick: Tick,
        jobs: &'a ReleaseManager,
        tasks: &TaskSet,
    ) -> Option<&'a Job> {
        let run_prio = priority_of(run_job, tasks);
        arrivals_during(run_job, tick, jobs)
            .filter(|j| priority_of(j, tasks) > run_prio)
            .min_by_key(|j| (j.release, Reverse(priority_of(j, tasks)), j.task))
    }
}

/// Policy selector, resolved before any engine state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Edf,
    RateMonotonic,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 2] = [PolicyKind::Edf, PolicyKind::RateMonotonic];

    /// Instantiate the selected policy.
    pub fn build(self) -> Box<dyn SchedulingPolicy + Send> {
        match self {
            PolicyKind::Edf => Box::new(Edf),
            PolicyKind::RateMonotonic => Box::new(RateMonotonic),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Edf => "EDF",
            PolicyKind::RateMonotonic => "RM",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edf" => Ok(PolicyKind::Edf),
            "rm" | "rate-monotonic" | "fp" => Ok(PolicyKind::RateMonotonic),
            _ => Err(SimError::UnknownPolicy(s.to_string())),
        }
    }
}
