//! Accept/IO Runtime (§5): wires `coviz-core`'s socket-agnostic state
//! and handlers to real `TcpStream`s and OS threads. Thread-per-role,
//! not a reactor — a fixed read-thread pool, one writer thread per
//! connection, one tick thread, one compute thread, matching the
//! concurrency model the teacher's endpoint/channel pool implies
//! (`t51core/src/net/endpoint.rs`) but made concrete with blocking I/O
//! and channels instead of a poller.

mod compute;
mod connection;
mod listener;
mod pool;
mod tick;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use coviz_core::Server;

use crate::runtime::compute::ChannelSelectionSink;

/// Issues strictly increasing `ConnectionId`s for the lifetime of the
/// process; connection IDs are never reused even after a disconnect.
static NEXT_CONNECTION_ID: AtomicUsize = AtomicUsize::new(0);

pub fn next_connection_id() -> coviz_core::ids::ConnectionId {
    coviz_core::ids::ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Starts every long-running thread and blocks the calling thread in
/// the accept loop. Returns only on a listener bind/accept failure.
/// Takes ownership of `server` so the selection sink can be attached
/// before anything else gets a shared reference to it.
pub fn run(server: Server) -> io::Result<()> {
    let (selection_tx, selection_rx) = std::sync::mpsc::channel();
    let server = Arc::new(server.with_selection_sink(Box::new(ChannelSelectionSink::new(selection_tx))));

    compute::spawn(server.clone(), selection_rx);
    tick::spawn(server.clone());
    let pool = pool::ReadPool::spawn(server.clone(), server.config.read_threads.max(1));
    listener::accept_loop(server, pool)
}
