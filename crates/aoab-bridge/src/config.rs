use std::time::Duration;

/// Default wait between accessory polls while detecting.
pub const DEFAULT_CONNECT_COOLDOWN: Duration = Duration::from_millis(100);

/// Default wait before retrying a read that was not ready.
pub const DEFAULT_READ_COOLDOWN: Duration = Duration::from_millis(100);

/// Bridge worker configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Wait between accessory polls while detecting. Default: 100 ms.
    pub connect_cooldown: Duration,
    /// Wait before retrying a decode that was not ready. Default: 100 ms.
    pub read_cooldown: Duration,
    /// Consecutive failed reads (I/O error or EOF, no bytes received) after
    /// which the link is treated as closed. Default: `None`, retry forever.
    pub max_read_failures: Option<u32>,
    /// Number of detection polls after which the bridge gives up and shuts
    /// down. Default: `None`, poll until shutdown is requested.
    pub max_detect_attempts: Option<u32>,
    /// Name of the worker thread.
    pub worker_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_cooldown: DEFAULT_CONNECT_COOLDOWN,
            read_cooldown: DEFAULT_READ_COOLDOWN,
            max_read_failures: None,
            max_detect_attempts: None,
            worker_name: "aoab-bridge".to_string(),
        }
    }
}
