//! rtsim: run real-time schedule simulations from task-set files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rts_simulator::{
    export_to_file, load_task_sets, parse_seed, parse_ticks, ExportFormat, LogStats, PolicyKind,
    SimConfig, SimFormat, Simulator, Task,
};

/// Run real-time schedule simulations from task-set files.
#[derive(Parser)]
#[command(name = "rtsim", version)]
struct Cli {
    /// Task-set JSON file.
    #[arg(short, long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Scheduling policy ("edf" or "rm"; see --options).
    #[arg(short, long, default_value = "edf")]
    policy: String,

    /// Simulation duration.
    ///
    /// A bare number is interpreted as ticks of 100us. Also accepts "ms"
    /// and "s" suffixes: "10ms" is 100 ticks.
    #[arg(short, long, value_name = "DURATION", default_value = "10000")]
    duration: String,

    /// Output file (repeatable). The format follows the extension:
    /// ".txt" for plain text, ".json" or ".rtschedule" for JSON.
    #[arg(short, long, value_name = "FILE")]
    out: Vec<PathBuf>,

    /// Number of simulation rounds.
    #[arg(short, long, default_value_t = 1)]
    rounds: u32,

    /// Enable execution-time and sporadic inter-arrival variation.
    #[arg(short = 'v', long)]
    evar: bool,

    /// PRNG seed (u32 integer or "entropy" for OS randomness).
    ///
    /// Only used with --evar. Round r is seeded with seed + r - 1.
    /// Falls back to the RTSIM_SEED env var, then to 42.
    #[arg(long, env = "RTSIM_SEED")]
    seed: Option<String>,

    /// Index of the task set to simulate within the input file.
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    set: usize,

    /// Overwrite task priorities rate-monotonically before simulating.
    #[arg(long)]
    assign_rm: bool,

    /// Print the schedule to stderr.
    #[arg(long)]
    dump_trace: bool,

    /// Print per-task statistics to stderr.
    #[arg(long)]
    stats: bool,

    /// List supported scheduling policies and exit.
    #[arg(long)]
    options: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.options {
        list_policies();
        return Ok(());
    }

    let input = cli
        .input
        .as_ref()
        .context("missing required argument: --in <FILE>")?;
    let policy: PolicyKind = cli.policy.parse()?;
    let tick_limit = parse_ticks(&cli.duration)
        .map_err(anyhow::Error::msg)
        .context("--duration")?;
    let seed = parse_seed(cli.seed.as_deref())
        .map_err(anyhow::Error::msg)
        .context("--seed")?;
    if cli.rounds == 0 {
        bail!("--rounds must be at least 1");
    }
    for path in &cli.out {
        if ExportFormat::from_path(path).is_none() {
            bail!("{}: unsupported output extension", path.display());
        }
    }

    let container = load_task_sets(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let mut tasks = container
        .get(cli.set)
        .cloned()
        .with_context(|| format!("--set {}: file holds {} task set(s)", cli.set, container.len()))?;
    if cli.assign_rm {
        tasks.assign_rate_monotonic_priorities();
    }
    if !tasks.passes_utilization_bound(policy) {
        warn!(
            utilization = tasks.utilization(),
            "task set fails the {policy} utilization bound; deadlines may be missed"
        );
    }
    if !tasks.tasks().iter().any(Task::is_sporadic) {
        match tasks.hyper_period().and_then(|h| h.checked_add(tasks.max_offset())) {
            Some(cycle) if tick_limit < cycle => {
                info!(cycle, "duration ends before the schedule starts repeating")
            }
            Some(_) => {}
            None => info!("hyper-period exceeds the tick range"),
        }
    }

    for round in 1..=cli.rounds {
        let config = SimConfig::new(policy)
            .variation(cli.evar)
            .seed(seed.wrapping_add(round - 1));
        let mut sim = Simulator::from_config(tasks.clone(), &config)?;
        sim.run_sim(tick_limit).with_context(|| format!("round {round}"))?;
        let policy_name = sim.policy_name();
        let log = sim.into_log();

        if cli.dump_trace {
            log.dump();
        }
        if cli.stats {
            LogStats::from_log(&log).print_summary();
        }
        for path in &cli.out {
            let path = round_path(path, round, cli.rounds);
            export_to_file(&log, policy_name, tick_limit, &path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote schedule to {}", path.display());
        }
    }
    Ok(())
}

/// With several rounds, `out.txt` becomes `out_<round>.txt`.
fn round_path(path: &Path, round: u32, rounds: u32) -> PathBuf {
    if rounds <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{round}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{round}"),
    };
    path.with_file_name(name)
}

fn list_policies() {
    for kind in PolicyKind::ALL {
        println!("{kind}");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .event_format(SimFormat)
        .try_init();
}
