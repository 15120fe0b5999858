//! Scheduling interval recording.
//!
//! Every span of processor time (a job running, or the processor idling) is
//! recorded as an [`Interval`] tagged with how the span opened and closed.
//! The [`EventLog`] keeps them in append order, which is also time order.

use serde::Serialize;

use crate::fmt::fmt_grouped;
use crate::types::{TaskId, Tick};

/// Boundary state of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleState {
    /// First dispatch of a job.
    Start,
    /// Later dispatch of a previously suspended job.
    Resume,
    /// Job was preempted (or cut off at the simulation horizon).
    Suspend,
    /// Job completed.
    End,
}

impl ScheduleState {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleState::Start => "start",
            ScheduleState::Resume => "resume",
            ScheduleState::Suspend => "suspend",
            ScheduleState::End => "end",
        }
    }
}

/// Half-open span `[start, end)` of processor time owned by one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: Tick,
    pub end: Tick,
    pub task: TaskId,
    pub entry: ScheduleState,
    pub exit: ScheduleState,
}

impl Interval {
    pub fn len(&self) -> Tick {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn is_idle(&self) -> bool {
        self.task.is_idle()
    }
}

/// Append-only log of intervals produced by one simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventLog {
    intervals: Vec<Interval>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        start: Tick,
        end: Tick,
        task: TaskId,
        entry: ScheduleState,
        exit: ScheduleState,
    ) {
        debug_assert!(start <= end, "interval [{start}, {end}) runs backwards");
        self.intervals.push(Interval {
            start,
            end,
            task,
            entry,
            exit,
        });
    }

    /// All intervals in chronological order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn last(&self) -> Option<&Interval> {
        self.intervals.last()
    }

    /// Cut the log at `limit`.
    ///
    /// Intervals starting at or after `limit` are dropped. A job interval
    /// crossing `limit` is truncated and closed with `Suspend`, since the
    /// job did not finish within the horizon; a crossing idle interval is
    /// only truncated.
    pub fn trim_to(&mut self, limit: Tick) {
        self.intervals.retain(|iv| iv.start < limit);
        if let Some(last) = self.intervals.last_mut() {
            if last.end > limit {
                last.end = limit;
                if !last.is_idle() {
                    last.exit = ScheduleState::Suspend;
                }
            }
        }
    }

    /// Total processor time attributed to `task`.
    pub fn total_runtime(&self, task: TaskId) -> Tick {
        self.intervals
            .iter()
            .filter(|iv| iv.task == task)
            .map(Interval::len)
            .sum()
    }

    /// Number of jobs of `task` that ran to completion.
    pub fn completed_jobs(&self, task: TaskId) -> usize {
        self.intervals
            .iter()
            .filter(|iv| iv.task == task && iv.exit == ScheduleState::End)
            .count()
    }

    /// Number of times `task` was preempted.
    pub fn preemption_count(&self, task: TaskId) -> usize {
        self.intervals
            .iter()
            .filter(|iv| iv.task == task && iv.exit == ScheduleState::Suspend)
            .count()
    }

    /// Time the processor spent idle.
    pub fn idle_time(&self) -> Tick {
        self.total_runtime(TaskId::IDLE)
    }

    /// Pretty-print the log for debugging.
    pub fn dump(&self) {
        for iv in &self.intervals {
            let who = if iv.is_idle() {
                "IDLE".to_string()
            } else {
                format!("task={}", iv.task)
            };
            eprintln!(
                "[{:>12} .. {:>12}] {:<9} {:>7} -> {}",
                fmt_grouped(iv.start),
                fmt_grouped(iv.end),
                who,
                iv.entry.as_str(),
                iv.exit.as_str()
            );
        }
    }
}
