use rts_simulator::*;

mod common;

policy_tests!(RateMonotonic);

use ScheduleState::*;

/// High-priority task A (id 1) arrives at 20 and preempts low-priority B.
#[test]
fn test_simple_preemption() {
    common::setup_test();
    let tasks = TaskSet::new(vec![
        Task::new(1, 50, 10).with_offset(20).with_priority(2),
        Task::new(2, 100, 30).with_priority(1),
    ])
    .unwrap();
    let mut sim = Simulator::new(tasks.clone(), RateMonotonic).unwrap();
    let log = sim.run_sim(130).unwrap();
    assert_eq!(
        common::tuples(log),
        vec![
            (0, 20, 2, Start, Suspend),
            (20, 30, 1, Start, End),
            (30, 40, 2, Resume, End),
            (40, 70, 0, Start, End),
            (70, 80, 1, Start, End),
            (80, 100, 0, Start, End),
            (100, 120, 2, Start, Suspend),
            (120, 130, 1, Start, End),
        ]
    );
    common::assert_well_formed(log, &tasks, 130);
    assert_eq!(log.preemption_count(TaskId(2)), 2);
}

/// Rate-monotonic priorities differ from EDF: the short-period task always
/// wins, even with a later deadline.
#[test]
fn test_assigned_priorities_preempt() {
    common::setup_test();
    let mut tasks = TaskSet::new(vec![Task::new(1, 5, 2), Task::new(2, 7, 4)]).unwrap();
    tasks.assign_rate_monotonic_priorities();
    let mut sim = Simulator::new(tasks, RateMonotonic).unwrap();
    let log = sim.run_sim(15).unwrap();
    assert_eq!(
        common::tuples(log),
        vec![
            (0, 2, 1, Start, End),
            (2, 5, 2, Start, Suspend),
            (5, 7, 1, Start, End),
            (7, 8, 2, Resume, End),
            (8, 10, 2, Start, Suspend),
            (10, 12, 1, Start, End),
            (12, 14, 2, Resume, End),
            (14, 15, 2, Start, Suspend),
        ]
    );
}

/// Equal priorities never preempt each other.
#[test]
fn test_equal_priority_no_preemption() {
    common::setup_test();
    let tasks = TaskSet::new(vec![
        Task::new(2, 100, 30),
        Task::new(1, 100, 30).with_offset(10),
    ])
    .unwrap();
    let mut sim = Simulator::new(tasks, RateMonotonic).unwrap();
    let log = sim.run_sim(60).unwrap();
    assert_eq!(
        common::tuples(log),
        vec![(0, 30, 2, Start, End), (30, 60, 1, Start, End)]
    );
}

/// Below the Liu & Layland bound every job completes within its period.
#[test]
fn test_utilization_bound() {
    let mut tasks = TaskSet::new(vec![Task::new(1, 10, 3), Task::new(2, 15, 4)]).unwrap();
    tasks.assign_rate_monotonic_priorities();
    assert!(tasks.passes_utilization_bound(PolicyKind::RateMonotonic));

    let mut sim = Simulator::new(tasks, RateMonotonic).unwrap();
    let log = sim.run_sim(300).unwrap();
    assert_eq!(log.completed_jobs(TaskId(1)), 30);
    assert_eq!(log.completed_jobs(TaskId(2)), 20);
}
