//! Per-task statistics over a finished event log: processor time, slice
//! lengths, job counts and the busy fraction of the horizon.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::trace::{EventLog, ScheduleState};
use crate::types::{TaskId, Tick};

/// Running summary of tick samples. Mean and variance use Welford's update.
#[derive(Debug, Clone, Default)]
pub struct DistributionStats {
    pub count: usize,
    pub min: Tick,
    pub max: Tick,
    pub sum: Tick,
    mean: f64,
    m2: f64,
}

impl DistributionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: Tick) {
        self.min = if self.count == 0 { value } else { self.min.min(value) };
        self.max = self.max.max(value);
        self.count += 1;
        self.sum += value;

        let x = value as f64;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// 0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation, 0 below two samples.
    pub fn stddev(&self) -> f64 {
        match self.count {
            0 | 1 => 0.0,
            n => (self.m2 / n as f64).max(0.0).sqrt(),
        }
    }
}

/// Per-task statistics computed from an event log.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub task: TaskId,
    /// Jobs dispatched for the first time.
    pub started_jobs: usize,
    pub completed_jobs: usize,
    pub preemptions: usize,
    /// Contiguous slices of processor time.
    pub slices: DistributionStats,
}

impl TaskStats {
    pub fn runtime(&self) -> Tick {
        self.slices.sum
    }
}

/// Statistics over one simulation run.
#[derive(Debug, Clone, Default)]
pub struct LogStats {
    /// Application tasks, by id.
    pub tasks: BTreeMap<TaskId, TaskStats>,
    pub idle_time: Tick,
    /// End of the last interval.
    pub horizon: Tick,
}

impl LogStats {
    pub fn from_log(log: &EventLog) -> Self {
        let mut stats = LogStats::default();
        for iv in log.intervals() {
            stats.horizon = stats.horizon.max(iv.end);
            if iv.is_idle() {
                stats.idle_time += iv.len();
                continue;
            }
            let ts = stats.tasks.entry(iv.task).or_insert_with(|| TaskStats {
                task: iv.task,
                ..Default::default()
            });
            ts.slices.add(iv.len());
            if iv.entry == ScheduleState::Start {
                ts.started_jobs += 1;
            }
            match iv.exit {
                ScheduleState::End => ts.completed_jobs += 1,
                ScheduleState::Suspend => ts.preemptions += 1,
                _ => {}
            }
        }
        stats
    }

    /// Busy fraction of the covered horizon (0 for an empty log).
    pub fn observed_utilization(&self) -> f64 {
        if self.horizon == 0 {
            0.0
        } else {
            (self.horizon - self.idle_time) as f64 / self.horizon as f64
        }
    }

    /// Human-readable report, one block per task.
    pub fn write_summary<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "horizon {} ticks, idle {} ticks, utilization {:.1}%",
            self.horizon,
            self.idle_time,
            100.0 * self.observed_utilization()
        )?;
        for ts in self.tasks.values() {
            let d = &ts.slices;
            writeln!(
                out,
                "task {:>4}  runtime {:>8}  jobs {}/{}  preempted {}  \
                 slices {} [{}..{}] mean {:.1} sd {:.1}",
                ts.task,
                ts.runtime(),
                ts.completed_jobs,
                ts.started_jobs,
                ts.preemptions,
                d.count,
                d.min,
                d.max,
                d.mean(),
                d.stddev()
            )?;
        }
        Ok(())
    }

    /// [`write_summary`](Self::write_summary) to stderr.
    pub fn print_summary(&self) {
        let _ = self.write_summary(io::stderr().lock());
    }
}
