//! Fixed-size read-thread pool (§5: "a bounded pool of reader threads,
//! reassigned on accept" — not one thread per connection). Each worker
//! owns one connection's blocking read loop at a time; the listener
//! hands off newly accepted sockets round-robin and a worker simply
//! waits for its next assignment once a connection ends.

use std::net::TcpStream;
use std::sync::mpsc;
use std::sync::Arc;

use slog::{info, warn};

use coviz_core::Server;

use crate::runtime::{connection, next_connection_id};

pub struct ReadPool {
    senders: Vec<mpsc::Sender<TcpStream>>,
    next: std::sync::atomic::AtomicUsize,
}

impl ReadPool {
    pub fn spawn(server: Arc<Server>, size: usize) -> Self {
        let senders = (0..size)
            .map(|worker_id| {
                let (tx, rx) = mpsc::channel::<TcpStream>();
                let server = server.clone();
                std::thread::spawn(move || worker_loop(worker_id, server, rx));
                tx
            })
            .collect();
        ReadPool { senders, next: std::sync::atomic::AtomicUsize::new(0) }
    }

    /// Hands a freshly accepted socket to the next pool slot in
    /// round-robin order. A slot still busy with a prior connection
    /// simply queues it behind that one.
    pub fn dispatch(&self, stream: TcpStream) {
        let i = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed) % self.senders.len();
        let _ = self.senders[i].send(stream);
    }
}

fn worker_loop(worker_id: usize, server: Arc<Server>, rx: mpsc::Receiver<TcpStream>) {
    for stream in rx {
        let remote_ip = match stream.peer_addr() {
            Ok(addr) => addr.ip().to_string(),
            Err(_) => continue,
        };
        let id = next_connection_id();
        info!(server.log, "connection accepted"; "worker" => worker_id, "connection" => id.0, "ip" => %remote_ip);
        if let Err(e) = connection::handle(server.clone(), stream, id, remote_ip) {
            warn!(server.log, "connection ended with an io error"; "connection" => id.0, "error" => %e);
        }
    }
}
