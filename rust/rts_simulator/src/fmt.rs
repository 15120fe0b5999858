//! Log formatting: virtual-clock timestamps and the tracing event format.

use std::cell::Cell;
use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::types::Tick;

thread_local! {
    /// Virtual clock of the engine running on this thread, if any.
    static SIM_CLOCK: Cell<Option<Tick>> = const { Cell::new(None) };
}

/// Current virtual time as last published by an engine on this thread.
pub fn sim_clock() -> Option<Tick> {
    SIM_CLOCK.with(|c| c.get())
}

/// Publish the virtual clock for [`SimFormat`]. The engine calls this
/// whenever its clock moves.
pub fn set_sim_clock(tick: Tick) {
    SIM_CLOCK.with(|c| c.set(Some(tick)));
}

/// Digits of `v` in groups of three separated by underscores.
pub(crate) fn fmt_grouped(v: u64) -> String {
    let digits = v.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() * 4 / 3);
    out.push_str(&digits[..head]);
    for (i, group) in digits.as_bytes()[head..].chunks(3).enumerate() {
        if head > 0 || i > 0 {
            out.push('_');
        }
        // ASCII digits only.
        out.extend(group.iter().map(|&b| b as char));
    }
    out
}

/// Tick timestamp, right-aligned with underscore grouping: `12_345:T`.
/// Outside a simulation the timestamp reads `-`.
pub struct FmtTick(pub Option<Tick>);

impl fmt::Display for FmtTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.map(fmt_grouped);
        write!(f, "{:>15}:T", text.as_deref().unwrap_or("-"))
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// Event formatter that stamps each line with the virtual clock instead of
/// wall-clock time:
///
/// ```text
/// [         12_000:T] DEBUG engine: job completed task=2 seq=4 finish=12000
/// ```
pub struct SimFormat;

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let level = *meta.level();
        write!(writer, "[{}] ", FmtTick(sim_clock()))?;
        if writer.has_ansi_escapes() {
            write!(writer, "{}{level:>5}\x1b[0m ", level_color(level))?;
        } else {
            write!(writer, "{level:>5} ")?;
        }

        // Module name without the crate path.
        let target = meta.target();
        let module = target.rsplit("::").next().unwrap_or(target);

        let mut line = LineBuilder::default();
        event.record(&mut line);
        writeln!(writer, "{module}: {}{}", line.message, line.fields)
    }
}

/// Renders an event as its message followed by ` key=value` pairs.
#[derive(Default)]
struct LineBuilder {
    message: String,
    fields: String,
}

impl Visit for LineBuilder {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}
