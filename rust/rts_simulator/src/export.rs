//! Event log writers.
//!
//! Two formats are supported, picked from the output file's extension:
//!
//! - `.txt`: a `# policy=<name>` header followed by one
//!   `start end task_id entry exit` line per interval.
//! - `.json` (or `.rtschedule`): `{"policy": .., "tick_limit": ..,
//!   "intervals": [..]}`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SimError};
use crate::trace::{EventLog, Interval};
use crate::types::Tick;

/// Output format of an exported event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    /// Format implied by `path`'s extension, if it names one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(ExportFormat::Text),
            "json" | "rtschedule" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct JsonTrace<'a> {
    policy: &'a str,
    tick_limit: Tick,
    intervals: &'a [Interval],
}

/// Write `log` as whitespace-separated text.
pub fn write_text<W: Write>(log: &EventLog, policy: &str, mut out: W) -> Result<()> {
    writeln!(out, "# policy={policy}")?;
    for iv in log.intervals() {
        writeln!(
            out,
            "{} {} {} {} {}",
            iv.start,
            iv.end,
            iv.task,
            iv.entry.as_str(),
            iv.exit.as_str()
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write `log` as a single JSON document.
pub fn write_json<W: Write>(
    log: &EventLog,
    policy: &str,
    tick_limit: Tick,
    mut out: W,
) -> Result<()> {
    let doc = JsonTrace {
        policy,
        tick_limit,
        intervals: log.intervals(),
    };
    serde_json::to_writer_pretty(&mut out, &doc).map_err(|e| SimError::Io(e.to_string()))?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Create `path` and write `log` in the format its extension selects.
pub fn export_to_file(
    log: &EventLog,
    policy: &str,
    tick_limit: Tick,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path).ok_or_else(|| {
        SimError::Io(format!("{}: unsupported output extension", path.display()))
    })?;
    let file = File::create(path)
        .map_err(|e| SimError::Io(format!("{}: {e}", path.display())))?;
    let out = BufWriter::new(file);
    match format {
        ExportFormat::Text => write_text(log, policy, out),
        ExportFormat::Json => write_json(log, policy, tick_limit, out),
    }
}
