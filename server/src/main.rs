//! `coviz-server` entry point: load configuration, stand up logging,
//! and hand off to the runtime. All protocol and world-state logic
//! lives in `coviz-core`; this crate only supplies real sockets,
//! threads, and process plumbing.

mod logging;
mod runtime;

use std::path::PathBuf;

use coviz_core::config::{Config, TrackingMode};
use coviz_core::loader::NullLoader;
use coviz_core::Server;
use slog::{error, info};

/// `COVIZ_CONFIG` names a TOML file to load; unset falls back to
/// defaults, but a path that's set and unreadable is an error, not a
/// silent fallback — a typo'd path should fail loudly, not run with
/// surprise defaults.
fn load_config() -> Config {
    let mut config = match std::env::var_os("COVIZ_CONFIG") {
        Some(path) => Config::load(&PathBuf::from(path)).unwrap_or_else(|e| {
            eprintln!("failed to read COVIZ_CONFIG: {e}");
            std::process::exit(1);
        }),
        None => Config::default(),
    };
    if let Ok(mode) = std::env::var("TRACKING_MODE") {
        config.tracking_mode = TrackingMode::from_env_value(&mode);
    }
    config
}

fn main() {
    let config = load_config();
    let log = logging::init(&config.log_level);

    info!(log, "starting coviz-server";
        "client_port" => config.client_port,
        "read_threads" => config.read_threads,
        "tick_hz" => config.tick_hz,
    );

    // A real VTK/point-cloud loader is an external collaborator this
    // crate doesn't carry yet; `NullLoader` makes `AddVtkDataset`/
    // `AddCloudPointDataset` fail cleanly with `DatasetLoadFailure`
    // instead of silently pretending to load something.
    let server = Server::new(config, Box::new(NullLoader), log.clone());

    if let Err(e) = runtime::run(server) {
        error!(log, "runtime exited"; "error" => %e);
        std::process::exit(1);
    }
}
