//! Task model: static task descriptors and the task set handed to the engine.
//!
//! Tasks live in an arena owned by [`TaskSet`] and are addressed by
//! [`TaskId`]. Jobs refer to their task by id, never by reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::policy::PolicyKind;
use crate::types::{Priority, TaskId, Tick};

/// Whether a task is real workload or the synthetic idle filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskKind {
    #[default]
    Application,
    Idle,
}

/// How successive jobs of a task arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalKind {
    /// Jobs arrive exactly one period apart.
    #[default]
    Periodic,
    /// Jobs arrive at least one period apart; the actual gap is drawn.
    Sporadic,
}

/// A recurring workload. Read-only once the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Period, or minimum inter-arrival time for sporadic tasks.
    pub period: Tick,
    /// Relative deadline. Always equal to `period`.
    pub deadline: Tick,
    /// Nominal (worst-case) execution demand of one job.
    pub wcet: Tick,
    /// Release time of the first job.
    pub initial_offset: Tick,
    pub priority: Priority,
    pub kind: TaskKind,
    pub arrival: ArrivalKind,
}

impl Task {
    /// Periodic application task with implicit deadline, zero offset and
    /// the lowest priority.
    pub fn new(id: u32, period: Tick, wcet: Tick) -> Self {
        Task {
            id: TaskId(id),
            name: format!("APP{id}"),
            period,
            deadline: period,
            wcet,
            initial_offset: 0,
            priority: 1,
            kind: TaskKind::Application,
            arrival: ArrivalKind::Periodic,
        }
    }

    pub fn with_offset(self, initial_offset: Tick) -> Self {
        Self {
            initial_offset,
            ..self
        }
    }

    pub fn with_priority(self, priority: Priority) -> Self {
        Self { priority, ..self }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn sporadic(self) -> Self {
        Self {
            arrival: ArrivalKind::Sporadic,
            ..self
        }
    }

    fn idle() -> Self {
        Task {
            id: TaskId::IDLE,
            name: "IDLE".to_string(),
            period: 0,
            deadline: 0,
            wcet: 0,
            initial_offset: 0,
            priority: 0,
            kind: TaskKind::Idle,
            arrival: ArrivalKind::Periodic,
        }
    }

    pub fn is_sporadic(&self) -> bool {
        self.arrival == ArrivalKind::Sporadic
    }

    pub fn utilization(&self) -> f64 {
        self.wcet as f64 / self.period as f64
    }

    /// Check the per-task invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| SimError::InvalidTask {
            id: self.id,
            reason: reason.to_string(),
        };
        if self.id.is_idle() {
            return Err(invalid("id 0 is reserved for the idle task"));
        }
        if self.period == 0 {
            return Err(invalid("period must be positive"));
        }
        if self.wcet == 0 {
            return Err(invalid("wcet must be positive"));
        }
        if self.wcet > self.period {
            return Err(invalid("wcet exceeds period"));
        }
        if self.deadline != self.period {
            return Err(invalid("deadline must equal period"));
        }
        Ok(())
    }
}

/// An ordered collection of application tasks plus the idle task.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
    idle: Task,
}

impl TaskSet {
    /// Build a task set, rejecting empty sets, duplicate ids and tasks that
    /// break [`Task::validate`]. Utilization is not checked here.
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        if tasks.is_empty() {
            return Err(SimError::EmptyTaskSet);
        }
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            task.validate()?;
            if index.insert(task.id, i).is_some() {
                return Err(SimError::DuplicateTask(task.id));
            }
        }
        Ok(TaskSet {
            tasks,
            index,
            idle: Task::idle(),
        })
    }

    /// Application tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Application task ids in ascending order.
    pub fn ids_sorted(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        ids.sort();
        ids
    }

    /// Look up a task by id. The idle task is found under [`TaskId::IDLE`].
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        if id.is_idle() {
            return Some(&self.idle);
        }
        self.index.get(&id).map(|&i| &self.tasks[i])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Total utilization over application tasks.
    pub fn utilization(&self) -> f64 {
        self.tasks.iter().map(Task::utilization).sum()
    }

    /// Overwrite priorities rate-monotonically: the shortest period gets the
    /// highest priority, equal periods are ordered by id (lower id wins).
    /// The longest period ends up with priority 1.
    pub fn assign_rate_monotonic_priorities(&mut self) {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (&self.tasks[a], &self.tasks[b]);
            b.period.cmp(&a.period).then_with(|| b.id.cmp(&a.id))
        });
        for (rank, i) in order.into_iter().enumerate() {
            self.tasks[i].priority = rank as Priority + 1;
        }
    }

    /// Sufficient utilization test for the given policy: `U <= 1` for EDF,
    /// the Liu & Layland bound `n(2^(1/n) - 1)` for rate-monotonic.
    pub fn passes_utilization_bound(&self, policy: PolicyKind) -> bool {
        let u = self.utilization();
        match policy {
            PolicyKind::Edf => u <= 1.0,
            PolicyKind::RateMonotonic => {
                let n = self.tasks.len() as f64;
                u <= n * (2f64.powf(1.0 / n) - 1.0)
            }
        }
    }

    /// Least common multiple of all periods, or `None` on overflow.
    pub fn hyper_period(&self) -> Option<Tick> {
        self.tasks.iter().try_fold(1 as Tick, |acc, t| {
            let g = gcd(acc, t.period);
            (acc / g).checked_mul(t.period)
        })
    }

    /// Largest initial offset, useful as a warm-up horizon.
    pub fn max_offset(&self) -> Tick {
        self.tasks
            .iter()
            .map(|t| t.initial_offset)
            .max()
            .unwrap_or(0)
    }
}

fn gcd(mut a: Tick, mut b: Tick) -> Tick {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
