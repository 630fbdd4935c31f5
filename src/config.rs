use std::time::Duration;

/// Width of the identifier space in bits, and the number of finger table entries.
pub const M: usize = 160;

/// Maximum number of entries in a successor list.
pub const SUCCESSOR_LIST_LEN: usize = 20;

pub const DEFAULT_MAINTAIN_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Pause between two maintenance cycles.
    pub maintain_interval: Duration,
    /// Dial timeout of a single liveness probe attempt.
    pub ping_timeout: Duration,
    /// Attempts made by every dial and probe before the peer is considered dead.
    pub retry_attempts: usize,
    /// Pause between two dial attempts.
    pub retry_backoff: Duration,
    /// Deadline of a single remote call.
    pub rpc_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            maintain_interval: DEFAULT_MAINTAIN_INTERVAL,
            ping_timeout: DEFAULT_MAINTAIN_INTERVAL / 2,
            retry_attempts: 3,
            retry_backoff: DEFAULT_MAINTAIN_INTERVAL * 2,
            rpc_timeout: Duration::from_secs(10),
        }
    }
}

impl NodeConfig {
    /// Sets the maintenance interval and rescales the timeouts derived from it.
    pub fn with_maintain_interval(self, maintain_interval: Duration) -> Self {
        NodeConfig {
            maintain_interval,
            ping_timeout: maintain_interval / 2,
            retry_backoff: maintain_interval * 2,
            ..self
        }
    }

    /// Delay before notifying a successor adopted from deeper in the successor list,
    /// leaving it a maintenance cycle to drop its dead predecessor first.
    pub fn successor_grace(&self) -> Duration {
        self.maintain_interval * 6 / 5
    }
}

#[test]
fn test_maintain_interval_rescales_timeouts() {
    let config = NodeConfig::default().with_maintain_interval(Duration::from_millis(100));

    assert_eq!(config.ping_timeout, Duration::from_millis(50));
    assert_eq!(config.retry_backoff, Duration::from_millis(200));
    assert_eq!(config.successor_grace(), Duration::from_millis(120));
    assert_eq!(config.retry_attempts, 3);
}
