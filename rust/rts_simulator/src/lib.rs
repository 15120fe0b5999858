//! rts_simulator - Event-driven simulator for preemptive uniprocessor
//! real-time scheduling.
//!
//! A task set of periodic and sporadic tasks is scheduled on one processor
//! under a pluggable policy. The engine jumps from one scheduling point to
//! the next and records every span of processor time in an event log.
//!
//! # Architecture
//!
//! - **Tasks**: static task descriptors and the task set (plus idle task)
//! - **Releases**: the pending job of every task
//! - **Policies**: `next_job` / `preempting_job` hooks (EDF, rate-monotonic)
//! - **Engine**: virtual clock, `advance()` and `run_sim()`
//! - **Trace**: intervals tagged start/resume/suspend/end
//!
//! # Usage
//!
//! ```rust,no_run
//! use rts_simulator::*;
//!
//! let tasks = TaskSet::new(vec![
//!     Task::new(1, 50, 10).with_offset(20).with_priority(2),
//!     Task::new(2, 100, 30),
//! ])?;
//!
//! let mut sim = Simulator::new(tasks, RateMonotonic)?;
//! sim.run_sim(100)?.dump();
//! # Ok::<(), SimError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod fmt;
pub mod job;
pub mod loader;
pub mod policy;
pub mod release;
pub mod stats;
pub mod task;
pub mod trace;
pub mod types;
pub mod variation;

// Re-export the main public types for convenience.
pub use config::{parse_seed, parse_ticks, SimConfig, DEFAULT_SEED, TICKS_PER_MS};
pub use engine::Simulator;
pub use error::{Result, SimError};
pub use export::{export_to_file, write_json, write_text, ExportFormat};
pub use fmt::{sim_clock, FmtTick, SimFormat};
pub use job::Job;
pub use loader::{load_task_sets, parse_task_sets, TaskSetContainer};
pub use policy::{Edf, PolicyKind, RateMonotonic, SchedulingPolicy};
pub use release::ReleaseManager;
pub use stats::{DistributionStats, LogStats, TaskStats};
pub use task::{ArrivalKind, Task, TaskKind, TaskSet};
pub use trace::{EventLog, Interval, ScheduleState};
pub use types::{Priority, TaskId, Tick};
pub use variation::{Deterministic, SeededVariation, Variation, VariationConfig};
