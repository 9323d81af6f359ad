//! Append-only structured trace of inbound/outbound protocol events
//! (§2 component 9). Behind `logMutex`, the innermost lock in §5's
//! ordering. Disabled by config, this becomes a no-op sink — the
//! audit log is always wired, only its destination changes.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::ids::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub ts_us: u64,
    /// `None` for a broadcast with no single originating connection
    /// (e.g. a tick-driven lock expiry).
    pub connection_id: Option<usize>,
    pub direction: Direction,
    pub kind: String,
    pub dataset_id: Option<u32>,
    pub sd_id: Option<u32>,
    pub headset_id: Option<u32>,
}

impl AuditEvent {
    pub fn new(ts_us: u64, connection_id: Option<ConnectionId>, direction: Direction, kind: impl Into<String>) -> Self {
        AuditEvent {
            ts_us,
            connection_id: connection_id.map(|c| c.0),
            direction,
            kind: kind.into(),
            dataset_id: None,
            sd_id: None,
            headset_id: None,
        }
    }

    pub fn with_dataset(mut self, id: u32) -> Self {
        self.dataset_id = Some(id);
        self
    }

    pub fn with_sd(mut self, id: u32) -> Self {
        self.sd_id = Some(id);
        self
    }

    pub fn with_headset(mut self, id: u32) -> Self {
        self.headset_id = Some(id);
        self
    }
}

pub trait AuditSink: Send {
    fn record(&mut self, event: &AuditEvent);
}

/// One JSON object per line.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink { writer }
    }
}

impl<W: Write + Send> AuditSink for WriterSink<W> {
    fn record(&mut self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}

pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&mut self, _event: &AuditEvent) {}
}

/// Owns the sink behind a mutex — this *is* `logMutex`.
pub struct AuditLog {
    sink: Mutex<Box<dyn AuditSink>>,
}

impl AuditLog {
    pub fn new(sink: Box<dyn AuditSink>) -> Self {
        AuditLog { sink: Mutex::new(sink) }
    }

    pub fn disabled() -> Self {
        AuditLog::new(Box::new(NullSink))
    }

    pub fn record(&self, event: AuditEvent) {
        self.sink.lock().expect("audit log mutex poisoned").record(&event);
    }
}
