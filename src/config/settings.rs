use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the in-process mock backend.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Artificial latency applied to every mock remote call.
    pub remote_latency: Duration,
    /// Where the mock backend persists its state as JSON. `None` keeps it
    /// purely in memory.
    pub data_path: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Self {
        let latency_ms: u64 = env::var("SNAPVERSE_REMOTE_LATENCY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let data_path = env::var("SNAPVERSE_DATA_PATH").ok().map(PathBuf::from);

        Self {
            remote_latency: Duration::from_millis(latency_ms),
            data_path,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_latency: Duration::ZERO,
            data_path: None,
        }
    }
}
