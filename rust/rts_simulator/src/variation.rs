//! Execution-time and inter-arrival variation sources.
//!
//! The engine never draws randomness itself. It asks an injected
//! [`Variation`] for each job's execution demand and, for sporadic tasks,
//! for the gap to the next release. Draws happen in a fixed order (first
//! jobs by ascending task id, then once per completion), so a seeded source
//! reproduces the same schedule run after run.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::task::Task;
use crate::types::Tick;

/// Supplies per-job execution demand and sporadic inter-arrival gaps.
///
/// Implementations must return an execution time in `1..=task.wcet` and an
/// inter-arrival time of at least `task.period`; the engine reports any
/// other value as a contract violation.
pub trait Variation {
    fn execution_time(&mut self, task: &Task) -> Tick;
    fn inter_arrival_time(&mut self, task: &Task) -> Tick;
}

impl<V: Variation + ?Sized> Variation for Box<V> {
    fn execution_time(&mut self, task: &Task) -> Tick {
        (**self).execution_time(task)
    }

    fn inter_arrival_time(&mut self, task: &Task) -> Tick {
        (**self).inter_arrival_time(task)
    }
}

/// Every job demands exactly its WCET and sporadic tasks arrive at their
/// minimum inter-arrival time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deterministic;

impl Variation for Deterministic {
    fn execution_time(&mut self, task: &Task) -> Tick {
        task.wcet
    }

    fn inter_arrival_time(&mut self, task: &Task) -> Tick {
        task.period
    }
}

/// Shape of the random variation, expressed as per-mille ratios of the
/// task's WCET or period.
#[derive(Debug, Clone)]
pub struct VariationConfig {
    /// Draw execution times at random. When false, every job takes its WCET
    /// and only sporadic inter-arrival gaps vary.
    pub vary_execution: bool,
    /// Mean execution time as a fraction of WCET. Default: 800 (80%).
    pub exec_mean_permille: u64,
    /// Standard deviation of execution time as a fraction of WCET.
    /// Default: 100 (10%).
    pub exec_stddev_permille: u64,
    /// Standard deviation of the extra sporadic gap beyond the period, as a
    /// fraction of the period. Default: 250 (25%).
    pub inter_arrival_stddev_permille: u64,
}

impl Default for VariationConfig {
    fn default() -> Self {
        VariationConfig {
            vary_execution: true,
            exec_mean_permille: 800,
            exec_stddev_permille: 100,
            inter_arrival_stddev_permille: 250,
        }
    }
}

/// Seeded pseudo-random variation.
#[derive(Debug, Clone)]
pub struct SeededVariation {
    rng: SmallRng,
    config: VariationConfig,
}

impl SeededVariation {
    pub fn new(seed: u32, config: VariationConfig) -> Self {
        SeededVariation {
            rng: SmallRng::seed_from_u64(seed as u64),
            config,
        }
    }

    /// Approximately normal noise via Irwin-Hall (sum of 4 uniforms),
    /// centered at 0 with the given stddev.
    fn sample_normal(&mut self, stddev: Tick) -> i64 {
        if stddev == 0 {
            return 0;
        }
        // Sum of 4 uniform [0,1000) values: mean=2000, sigma ~ 577.
        let sum: u64 = (0..4).map(|_| (self.rng.next_u32() as u64) % 1000).sum();
        let centered = sum as i64 - 2000;
        (centered * stddev as i64) / 577
    }
}

fn permille(value: Tick, ratio: u64) -> Tick {
    ((value as u128 * ratio as u128) / 1000) as Tick
}

impl Variation for SeededVariation {
    fn execution_time(&mut self, task: &Task) -> Tick {
        if !self.config.vary_execution {
            return task.wcet;
        }
        let mean = permille(task.wcet, self.config.exec_mean_permille) as i64;
        let noise = self.sample_normal(permille(task.wcet, self.config.exec_stddev_permille));
        (mean + noise).clamp(1, task.wcet as i64) as Tick
    }

    fn inter_arrival_time(&mut self, task: &Task) -> Tick {
        let stddev = permille(task.period, self.config.inter_arrival_stddev_permille);
        let extra = self.sample_normal(stddev).unsigned_abs();
        task.period.saturating_add(extra)
    }
}
