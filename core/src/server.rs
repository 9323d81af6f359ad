//! The `Server` value (§9): replaces the source's global singletons
//! (process-wide `InternalData`, a bare server pointer, a static
//! palette, a static next-headset-ID) with one owned value holding all
//! mutable state. Lock order is part of this type's API: every method
//! that needs more than one lock acquires them in the §5 order and
//! nothing public allows the reverse.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use slog::Logger;

use crate::audit::{AuditEvent, AuditLog, Direction};
use crate::config::Config;
use crate::ids::ConnectionId;
use crate::loader::DatasetLoader;
use crate::net::outbound::OutboundMessage;
use crate::selection::{NullSelectionSink, SelectionSink};
use crate::session::table::ConnectionTable;
use crate::world::World;

pub struct Server {
    world: Mutex<World>,
    connections: Mutex<ConnectionTable>,
    pub audit: AuditLog,
    pub config: Config,
    pub loader: Box<dyn DatasetLoader>,
    pub selection: Box<dyn SelectionSink>,
    pub log: Logger,
    start: Instant,
}

impl Server {
    pub fn new(config: Config, loader: Box<dyn DatasetLoader>, log: Logger) -> Self {
        let audit = if config.audit_enabled {
            match &config.audit_path {
                Some(path) => std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(|f| AuditLog::new(Box::new(crate::audit::WriterSink::new(f))))
                    .unwrap_or_else(|_| AuditLog::disabled()),
                None => AuditLog::disabled(),
            }
        } else {
            AuditLog::disabled()
        };
        Server {
            world: Mutex::new(World::new()),
            connections: Mutex::new(ConnectionTable::new()),
            audit,
            config,
            loader,
            selection: Box::new(NullSelectionSink),
            log,
            start: Instant::now(),
        }
    }

    /// Overrides the default no-op selection sink — the runtime binary
    /// calls this with a channel sender feeding the compute thread.
    pub fn with_selection_sink(mut self, sink: Box<dyn SelectionSink>) -> Self {
        self.selection = sink;
        self
    }

    /// Monotonic microsecond clock used for `lastModification` and
    /// lock-owner expiry — never wall-clock, so expiry is immune to
    /// clock adjustments.
    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Lock order position 1. Never call while holding `connections`.
    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().expect("world mutex poisoned")
    }

    /// Lock order position 2. May be nested inside a `world()` guard;
    /// must never be held when acquiring `world()`.
    pub fn connections(&self) -> MutexGuard<'_, ConnectionTable> {
        self.connections.lock().expect("connections mutex poisoned")
    }

    pub fn broadcast_all(&self, table: &ConnectionTable, msg: &OutboundMessage) {
        let frame = msg.encode();
        for conn in table.iter() {
            conn.send(frame.clone());
        }
        self.audit.record(AuditEvent::new(self.now_us(), None, Direction::Outbound, format!("{:?}", msg.tag())));
    }

    pub fn broadcast_except(&self, table: &ConnectionTable, except: ConnectionId, msg: &OutboundMessage) {
        let frame = msg.encode();
        for conn in table.iter() {
            if conn.id != except {
                conn.send(frame.clone());
            }
        }
        self.audit
            .record(AuditEvent::new(self.now_us(), Some(except), Direction::Outbound, format!("{:?}", msg.tag())));
    }

    pub fn send_to(&self, table: &ConnectionTable, target: ConnectionId, msg: &OutboundMessage) {
        if let Some(conn) = table.get(target) {
            conn.send(msg.encode());
            self.audit
                .record(AuditEvent::new(self.now_us(), Some(target), Direction::Outbound, format!("{:?}", msg.tag())));
        }
    }
}
