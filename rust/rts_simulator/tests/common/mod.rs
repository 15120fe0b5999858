#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use rts_simulator::{EventLog, ScheduleState, SimFormat, Task, TaskId, TaskSet, Tick, Variation};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .event_format(SimFormat)
        .try_init();
}

/// Intervals as `(start, end, task, entry, exit)` tuples for compact asserts.
pub fn tuples(log: &EventLog) -> Vec<(Tick, Tick, u32, ScheduleState, ScheduleState)> {
    log.intervals()
        .iter()
        .map(|iv| (iv.start, iv.end, iv.task.0, iv.entry, iv.exit))
        .collect()
}

/// The log tiles `[0, limit)` with no gaps or overlaps.
pub fn assert_coverage(log: &EventLog, limit: Tick) {
    if limit == 0 {
        assert!(log.is_empty(), "zero horizon should give an empty log");
        return;
    }
    let mut cursor = 0;
    for iv in log.intervals() {
        assert_eq!(iv.start, cursor, "gap or overlap at {cursor}: {iv:?}");
        assert!(iv.end > iv.start, "empty interval {iv:?}");
        cursor = iv.end;
    }
    assert_eq!(cursor, limit, "log ends at {cursor}, expected {limit}");
}

/// Every task alternates Start → (Suspend → Resume)* → End, and idle
/// intervals are always Start → End.
pub fn assert_start_resume(log: &EventLog) {
    let mut suspended: HashMap<TaskId, bool> = HashMap::new();
    for iv in log.intervals() {
        if iv.is_idle() {
            assert_eq!(
                (iv.entry, iv.exit),
                (ScheduleState::Start, ScheduleState::End),
                "idle interval {iv:?}"
            );
            continue;
        }
        let was_suspended = suspended.get(&iv.task).copied().unwrap_or(false);
        let expected = if was_suspended {
            ScheduleState::Resume
        } else {
            ScheduleState::Start
        };
        assert_eq!(iv.entry, expected, "wrong entry state for {iv:?}");
        assert!(
            matches!(iv.exit, ScheduleState::Suspend | ScheduleState::End),
            "wrong exit state for {iv:?}"
        );
        suspended.insert(iv.task, iv.exit == ScheduleState::Suspend);
    }
}

/// Every completed job received exactly `exec(task)` ticks, and a job cut
/// off at the horizon received less.
pub fn assert_conservation(log: &EventLog, exec: impl Fn(TaskId) -> Tick) {
    let mut received: HashMap<TaskId, Tick> = HashMap::new();
    for iv in log.intervals().iter().filter(|iv| !iv.is_idle()) {
        let got = received.entry(iv.task).or_insert(0);
        *got += iv.len();
        if iv.exit == ScheduleState::End {
            assert_eq!(*got, exec(iv.task), "job of task {} ending at {}", iv.task, iv.end);
            *got = 0;
        }
    }
    for (task, got) in received {
        assert!(got < exec(task), "unfinished job of task {task} over-served: {got}");
    }
}

/// Execution times drawn per task, in job order.
pub type Draws = Arc<Mutex<HashMap<TaskId, VecDeque<Tick>>>>;

/// Passes draws through from `inner` and remembers every execution time.
pub struct Recording<V> {
    inner: V,
    draws: Draws,
}

impl<V: Variation> Recording<V> {
    pub fn new(inner: V) -> (Self, Draws) {
        let draws = Draws::default();
        let recording = Recording {
            inner,
            draws: Arc::clone(&draws),
        };
        (recording, draws)
    }
}

impl<V: Variation> Variation for Recording<V> {
    fn execution_time(&mut self, task: &Task) -> Tick {
        let exec = self.inner.execution_time(task);
        self.draws
            .lock()
            .unwrap()
            .entry(task.id)
            .or_default()
            .push_back(exec);
        exec
    }

    fn inter_arrival_time(&mut self, task: &Task) -> Tick {
        self.inner.inter_arrival_time(task)
    }
}

/// Every `End` closes a job that received exactly its drawn execution time,
/// and a job still running at the horizon received less than its draw.
pub fn assert_conservation_drawn(log: &EventLog, draws: &Draws) {
    let mut draws = draws.lock().unwrap().clone();
    let mut received: HashMap<TaskId, Tick> = HashMap::new();
    let mut completed = 0;
    for iv in log.intervals().iter().filter(|iv| !iv.is_idle()) {
        let got = received.entry(iv.task).or_insert(0);
        *got += iv.len();
        if iv.exit == ScheduleState::End {
            let drawn = draws
                .get_mut(&iv.task)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| panic!("task {} finished a job it never drew", iv.task));
            assert_eq!(*got, drawn, "job of task {} ending at {}", iv.task, iv.end);
            *got = 0;
            completed += 1;
        }
    }
    for (task, got) in received.into_iter().filter(|&(_, got)| got > 0) {
        let drawn = draws.get(&task).and_then(|q| q.front().copied()).unwrap_or(0);
        assert!(got < drawn, "unfinished job of task {task} over-served: {got} of {drawn}");
    }
    assert!(completed > 0, "no job completed");
}

/// All three structural properties of a deterministic run.
pub fn assert_well_formed(log: &EventLog, tasks: &TaskSet, limit: Tick) {
    assert_coverage(log, limit);
    assert_start_resume(log);
    assert_conservation(log, |id| tasks.get(id).map(|t| t.wcet).unwrap_or(0));
}

/// Generate a suite of policy-generic tests.
///
/// `$policy` is an expression producing a fresh `SchedulingPolicy` value.
///
/// Usage:
/// ```ignore
/// mod common;
/// policy_tests!(Edf);
/// ```
#[macro_export]
macro_rules! policy_tests {
    ($policy:expr) => {
        /// Three tasks at U ~ 0.71 with staggered offsets.
        fn mixed_set() -> TaskSet {
            TaskSet::new(vec![
                Task::new(1, 40, 8).with_priority(3),
                Task::new(2, 70, 15).with_offset(5).with_priority(2),
                Task::new(3, 120, 35).with_offset(12).with_priority(1),
            ])
            .unwrap()
        }

        /// A task alone never gets preempted.
        #[test]
        fn test_single_task_no_preemption() {
            common::setup_test();
            let tasks = TaskSet::new(vec![Task::new(1, 100, 40)]).unwrap();
            let mut sim = Simulator::new(tasks, $policy).unwrap();
            let log = sim.run_sim(40).unwrap();
            assert_eq!(
                common::tuples(log),
                vec![(0, 40, 1, ScheduleState::Start, ScheduleState::End)]
            );
        }

        #[test]
        fn test_well_formed_schedule() {
            common::setup_test();
            let tasks = mixed_set();
            for limit in [0, 1, 7, 40, 333, 5_000] {
                let mut sim = Simulator::new(tasks.clone(), $policy).unwrap();
                let log = sim.run_sim(limit).unwrap();
                common::assert_well_formed(log, &tasks, limit);
            }
        }

        #[test]
        fn test_well_formed_with_variation() {
            common::setup_test();
            let tasks = mixed_set();
            let variation = SeededVariation::new(7, VariationConfig::default());
            let mut sim = Simulator::with_variation(tasks, $policy, variation).unwrap();
            let log = sim.run_sim(10_000).unwrap();
            common::assert_coverage(log, 10_000);
            common::assert_start_resume(log);
        }

        /// Each finished job ran for exactly the execution time drawn for it.
        #[test]
        fn test_drawn_execution_time_conserved() {
            common::setup_test();
            for seed in [7, 8, 9] {
                let variation = SeededVariation::new(seed, VariationConfig::default());
                let (recording, draws) = common::Recording::new(variation);
                let mut sim = Simulator::with_variation(mixed_set(), $policy, recording).unwrap();
                let log = sim.run_sim(20_000).unwrap();
                common::assert_conservation_drawn(log, &draws);
            }
        }

        #[test]
        fn test_clock_is_monotonic() {
            common::setup_test();
            let mut sim = Simulator::new(mixed_set(), $policy).unwrap();
            let mut last = sim.tick();
            for _ in 0..500 {
                let now = sim.advance().unwrap();
                assert!(now > last, "clock went from {last} to {now}");
                assert_eq!(sim.log().last().unwrap().end, now);
                last = now;
            }
            assert_eq!(sim.log().len(), 500);
        }

        #[test]
        fn test_idle_before_first_release() {
            common::setup_test();
            let tasks = TaskSet::new(vec![
                Task::new(1, 50, 10).with_offset(25),
                Task::new(2, 50, 10).with_offset(30),
            ])
            .unwrap();
            let mut sim = Simulator::new(tasks, $policy).unwrap();
            let log = sim.run_sim(45).unwrap();
            assert_eq!(
                common::tuples(log),
                vec![
                    (0, 25, 0, ScheduleState::Start, ScheduleState::End),
                    (25, 35, 1, ScheduleState::Start, ScheduleState::End),
                    (35, 45, 2, ScheduleState::Start, ScheduleState::End),
                ]
            );
        }

        #[test]
        fn test_same_seed_same_schedule() {
            common::setup_test();
            let run = |seed| {
                let mut sim = Simulator::with_variation(
                    mixed_set(),
                    $policy,
                    SeededVariation::new(seed, VariationConfig::default()),
                )
                .unwrap();
                sim.run_sim(20_000).unwrap().clone()
            };
            assert_eq!(run(42), run(42));
            assert_ne!(run(42), run(43));
        }

        #[test]
        fn test_horizon_cut_suspends_job() {
            common::setup_test();
            let tasks = TaskSet::new(vec![Task::new(1, 100, 40)]).unwrap();
            let mut sim = Simulator::new(tasks, $policy).unwrap();
            let log = sim.run_sim(25).unwrap();
            assert_eq!(
                common::tuples(log),
                vec![(0, 25, 1, ScheduleState::Start, ScheduleState::Suspend)]
            );
        }
    };
}
