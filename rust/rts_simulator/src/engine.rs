//! Event-driven scheduling engine.
//!
//! The engine owns the virtual clock, the per-task release table and the
//! event log. Each [`Simulator::advance`] call moves the clock to the next
//! scheduling point (a completion, a preemption, or the end of an idle gap)
//! and appends exactly one interval. The policy decides who runs and who
//! interrupts; nothing else here depends on the policy.

use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::fmt::set_sim_clock;
use crate::policy::SchedulingPolicy;
use crate::release::ReleaseManager;
use crate::task::TaskSet;
use crate::trace::{EventLog, ScheduleState};
use crate::types::{TaskId, Tick};
use crate::variation::{Deterministic, Variation};

/// A single-processor scheduling simulation under policy `P`.
///
/// Instances share no state; independent simulations may run on separate
/// threads.
pub struct Simulator<P: SchedulingPolicy> {
    policy: P,
    tasks: TaskSet,
    variation: Box<dyn Variation + Send>,
    releases: ReleaseManager,
    log: EventLog,
    tick: Tick,
    advanced: bool,
    /// First fatal error. Once set, the engine refuses to move.
    failed: Option<SimError>,
}

impl<P: SchedulingPolicy> Simulator<P> {
    /// Simulator where every job takes exactly its WCET.
    pub fn new(tasks: TaskSet, policy: P) -> Result<Self> {
        Self::with_variation(tasks, policy, Deterministic)
    }

    /// Simulator drawing execution times and sporadic gaps from `variation`.
    ///
    /// The first job of every task is created here, before any `advance()`.
    pub fn with_variation(
        tasks: TaskSet,
        policy: P,
        variation: impl Variation + Send + 'static,
    ) -> Result<Self> {
        let mut variation: Box<dyn Variation + Send> = Box::new(variation);
        let releases = ReleaseManager::initialize_first_jobs(&tasks, &mut variation)?;
        Ok(Simulator {
            policy,
            tasks,
            variation,
            releases,
            log: EventLog::new(),
            tick: 0,
            advanced: false,
            failed: None,
        })
    }

    /// Current virtual time.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn into_log(self) -> EventLog {
        self.log
    }

    /// Next unfinished job of every task.
    pub fn releases(&self) -> &ReleaseManager {
        &self.releases
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Run a fresh simulation until the clock passes `tick_limit`, then cut
    /// the log at `tick_limit`.
    ///
    /// The returned log tiles `[0, tick_limit)` without gaps, idle time
    /// being attributed to [`TaskId::IDLE`].
    pub fn run_sim(&mut self, tick_limit: Tick) -> Result<&EventLog> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.advanced {
            return Err(SimError::AlreadyAdvanced { tick: self.tick });
        }
        set_sim_clock(self.tick);
        info!(
            policy = self.policy.name(),
            tasks = self.tasks.len(),
            limit = tick_limit,
            "simulation started"
        );

        while self.tick <= tick_limit {
            self.advance()?;
        }
        self.log.trim_to(tick_limit);

        info!(intervals = self.log.len(), idle = self.log.idle_time(), "simulation finished");
        Ok(&self.log)
    }

    /// Move to the next scheduling point, appending exactly one interval.
    ///
    /// If the chosen job has not arrived yet, the gap up to its release is
    /// logged as idle time and the clock jumps there; the job itself is
    /// dispatched by the following call. Returns the new virtual time.
    ///
    /// An error is fatal: this and every later call return it unchanged.
    pub fn advance(&mut self) -> Result<Tick> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.advanced = true;
        set_sim_clock(self.tick);
        match self.step() {
            Ok(tick) => Ok(tick),
            Err(err) => {
                warn!(tick = self.tick, "simulation stopped: {err}");
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Error that stopped the simulation, if any.
    pub fn failure(&self) -> Option<&SimError> {
        self.failed.as_ref()
    }

    fn step(&mut self) -> Result<Tick> {
        let (task, release) = self
            .policy
            .next_job(self.tick, &self.releases, &self.tasks)
            .map(|job| (job.task, job.release))
            .ok_or(SimError::EmptyTaskSet)?;

        if release > self.tick {
            debug!(until = release, next = task.0, "idle");
            self.log.record(
                self.tick,
                release,
                TaskId::IDLE,
                ScheduleState::Start,
                ScheduleState::End,
            );
            self.tick = release;
        } else {
            self.tick = self.run_to_next_scheduling_point(self.tick, task)?;
        }

        set_sim_clock(self.tick);
        Ok(self.tick)
    }

    /// Run `task`'s current job from `tick` until it completes or is
    /// preempted, log the interval, and return the time it stopped.
    fn run_to_next_scheduling_point(&mut self, tick: Tick, task: TaskId) -> Result<Tick> {
        let run_job = self
            .releases
            .get(task)
            .ok_or_else(|| SimError::PolicyContract {
                task,
                tick,
                detail: "policy chose a task without a pending job".into(),
            })?;
        let preemption = self
            .policy
            .preempting_job(run_job, tick, &self.releases, &self.tasks)
            .map(|job| (job.task, job.release));

        let job = self
            .releases
            .get_mut(task)
            .ok_or_else(|| SimError::PolicyContract {
                task,
                tick,
                detail: "job vanished during dispatch".into(),
            })?;
        let entry = if job.started {
            ScheduleState::Resume
        } else {
            ScheduleState::Start
        };

        match preemption {
            None => {
                let finish = job.finish_time_from(tick).ok_or(SimError::ClockOverflow {
                    tick,
                    delta: job.remaining,
                })?;
                job.remaining = 0;
                job.started = true;
                debug!(task = task.0, seq = job.seq, finish, "job completed");
                self.log.record(tick, finish, task, entry, ScheduleState::End);
                // The clock follows the log even if the next release fails.
                self.tick = finish;

                let def = self.tasks.get(task).ok_or_else(|| SimError::InvalidTask {
                    id: task,
                    reason: "task missing from set".into(),
                })?;
                self.releases.update_task_job(def, &mut self.variation)?;
                Ok(finish)
            }
            Some((by, at)) => {
                let ran = at.checked_sub(tick).filter(|&ran| ran > 0);
                let remaining = ran
                    .and_then(|ran| job.remaining.checked_sub(ran))
                    .filter(|&left| left > 0)
                    .ok_or_else(|| SimError::PolicyContract {
                        task,
                        tick,
                        detail: format!(
                            "task {by} reported as preempting at {at}, outside ({tick}, {})",
                            tick.saturating_add(job.remaining)
                        ),
                    })?;
                job.remaining = remaining;
                job.started = true;
                debug!(task = task.0, seq = job.seq, at, by = by.0, remaining, "job preempted");
                self.log.record(tick, at, task, entry, ScheduleState::Suspend);
                Ok(at)
            }
        }
    }
}

impl Simulator<Box<dyn SchedulingPolicy + Send>> {
    /// Build a simulator from a configuration. The policy and the
    /// variation source are chosen by `config`.
    pub fn from_config(tasks: TaskSet, config: &SimConfig) -> Result<Self> {
        let policy = config.policy.build();
        if config.variation {
            Self::with_variation(tasks, policy, config.seeded_variation())
        } else {
            Self::new(tasks, policy)
        }
    }
}
