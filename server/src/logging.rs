//! Structured logging setup, following the teacher's `flux::logging`
//! terminal-sink pattern (`server/lib/flux/src/logging.rs`) but reading
//! the level from `Config` instead of a hard-coded TOML literal, and
//! building the `sloggers` config directly rather than through
//! `serdeconv`.

use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

pub fn init(level: &str) -> slog::Logger {
    let severity = match level {
        "trace" => Severity::Trace,
        "debug" => Severity::Debug,
        "warning" | "warn" => Severity::Warning,
        "error" => Severity::Error,
        "critical" => Severity::Critical,
        _ => Severity::Info,
    };

    let mut builder = TerminalLoggerBuilder::new();
    builder.level(severity);
    builder.destination(Destination::Stderr);
    builder.build().expect("terminal logger destination is always buildable")
}
