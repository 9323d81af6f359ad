//! Tick thread (§4.7): calls `coviz_core::broadcast::tick` once per
//! `config.tick_period()`. The sleep drifts by however long the tick
//! itself took, same as a plain scheduling loop — at 10 Hz and a
//! tick body measured in microseconds this is not worth correcting for.

use std::sync::Arc;

use coviz_core::Server;

pub fn spawn(server: Arc<Server>) {
    std::thread::spawn(move || loop {
        std::thread::sleep(server.config.tick_period());
        coviz_core::broadcast::tick(&server);
    });
}
