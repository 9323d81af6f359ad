//! Per-connection read loop and write-queue sink (§4.2, §5). One of
//! these runs on whichever read-pool thread the listener assigned the
//! socket to; the paired writer thread is spawned alongside it and
//! lives until the socket closes from either direction.

use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::sync::Arc;

use slog::{debug, warn};

use coviz_core::error::ErrorAction;
use coviz_core::handlers;
use coviz_core::ids::ConnectionId;
use coviz_core::net::buffer::Buffer;
use coviz_core::net::parser::Parser;
use coviz_core::session::connection::{Connection, OutboundSink};
use coviz_core::Server;

/// Bridges `Connection::send` to the per-connection write-queue
/// channel; the writer thread on the other end owns the actual socket
/// write and the backpressure-counter decrement.
struct ChannelSink(mpsc::Sender<Vec<u8>>);

impl OutboundSink for ChannelSink {
    fn send(&self, frame: Vec<u8>) {
        // The receiver only goes away once the writer thread has
        // already torn down after the socket closed; dropping the
        // frame on the floor at that point is correct, not a bug.
        let _ = self.0.send(frame);
    }
}

fn spawn_writer(
    mut stream: TcpStream,
    rx: mpsc::Receiver<Vec<u8>>,
    outstanding: Arc<std::sync::atomic::AtomicUsize>,
    log: slog::Logger,
) {
    std::thread::spawn(move || {
        for frame in rx {
            let len = frame.len();
            if let Err(e) = stream.write_all(&frame) {
                debug!(log, "write failed, closing connection"; "error" => %e);
                break;
            }
            outstanding.fetch_sub(len, std::sync::atomic::Ordering::AcqRel);
        }
        let _ = stream.shutdown(std::net::Shutdown::Both);
    });
}

/// Owns one accepted socket end to end: registers the connection,
/// drives the blocking read loop through `Buffer`/`Parser`, dispatches
/// every completed message, and runs the disconnect sweep once the
/// socket closes or a fatal protocol error forces it closed.
pub fn handle(server: Arc<Server>, mut stream: TcpStream, id: ConnectionId, remote_ip: String) -> io::Result<()> {
    let write_half = stream.try_clone()?;
    let (tx, rx) = mpsc::channel();

    let conn = Connection::new(id, remote_ip, Box::new(ChannelSink(tx)));
    let outstanding = conn.outstanding_handle();
    spawn_writer(write_half, rx, outstanding, server.log.clone());

    {
        let mut table = server.connections();
        table.insert(conn);
    }

    let mut buffer = Buffer::new();
    let mut parser = Parser::new();

    let result = (|| -> io::Result<()> {
        loop {
            let n = buffer.ingress(&mut stream)?;
            if n == 0 {
                return Ok(());
            }

            // `Parser::feed` always drains the entire slice it is given,
            // either into a completed message or into its own carried
            // state — so the buffer always advances by the whole
            // readable length, never a partial count.
            let readable_len = buffer.readable_slice().len();
            let messages = parser.feed(buffer.readable_slice());
            buffer.advance(readable_len);

            let messages = match messages {
                Ok(m) => m,
                Err(e) => {
                    warn!(server.log, "protocol error, closing connection"; "connection" => id.0, "error" => %e);
                    return Ok(());
                }
            };

            for msg in messages {
                if let Err(e) = handlers::dispatch(&server, id, msg) {
                    match e.action() {
                        ErrorAction::CloseConnection => {
                            warn!(server.log, "closing connection after error"; "connection" => id.0, "error" => %e);
                            return Ok(());
                        }
                        ErrorAction::WarnAndDrop => {
                            warn!(server.log, "dropping message after error"; "connection" => id.0, "error" => %e);
                        }
                        ErrorAction::Ignore => {}
                    }
                }
            }
        }
    })();

    handlers::handle_disconnect(&server, id);
    result
}
