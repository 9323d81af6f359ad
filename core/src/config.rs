//! Server configuration, following the teacher's `GameConfig`/TOML
//! pattern: a plain `serde`-derived struct with a `Default` impl and a
//! `load` that falls back to defaults when unset.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLIENT_PORT: u16 = 8000;
pub const DEFAULT_LOCATION_PORT: u16 = 8100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    #[default]
    None,
    Vuforia,
    Vicon,
}

impl TrackingMode {
    pub fn from_env_value(v: &str) -> TrackingMode {
        match v {
            "1" => TrackingMode::Vuforia,
            "2" => TrackingMode::Vicon,
            _ => TrackingMode::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_port: u16,
    pub location_port: u16,
    pub read_threads: usize,
    pub tick_hz: u32,
    pub backpressure_threshold_bytes: usize,
    pub max_owner_time_us: u64,
    pub audit_enabled: bool,
    pub audit_path: Option<String>,
    pub log_level: String,
    #[serde(skip)]
    pub tracking_mode: TrackingMode,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            client_port: DEFAULT_CLIENT_PORT,
            location_port: DEFAULT_LOCATION_PORT,
            read_threads: 4,
            tick_hz: 10,
            backpressure_threshold_bytes: 64 * 1024,
            max_owner_time_us: 1_000_000,
            audit_enabled: false,
            audit_path: None,
            log_level: "info".to_string(),
            tracking_mode: TrackingMode::None,
        }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Config, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }
}
