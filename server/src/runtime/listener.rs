//! Accept loop (§5): binds the client-facing TCP port and hands every
//! accepted socket to the read-thread pool. Runs on the thread that
//! called `runtime::run` — the only thing left blocking once every
//! other role has its own thread.

use std::io;
use std::net::TcpListener;
use std::sync::Arc;

use slog::info;

use coviz_core::Server;

use crate::runtime::pool::ReadPool;

pub fn accept_loop(server: Arc<Server>, pool: ReadPool) -> io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", server.config.client_port))?;
    info!(server.log, "listening"; "port" => server.config.client_port);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                pool.dispatch(stream);
            }
            Err(e) => {
                slog::warn!(server.log, "accept failed"; "error" => %e);
            }
        }
    }
    Ok(())
}
