//! Configuration constants and tunable settings

use std::time::Duration;

use crate::error::LanwatchError;

/// Timeout for a single layer-2 discovery probe
pub const ARP_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Timeout for the fallback ICMP echo
pub const PING_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for one reverse name lookup
pub const DNS_TIMEOUT: Duration = Duration::from_millis(1000);

/// Timeout for one web-port connect attempt
pub const SERVICE_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Timeout for consulting the OS neighbor table
pub const NEIGHBOR_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1000);

/// Well-known web ports checked during service detection
pub const WEB_PORTS: &[u16] = &[80, 443];

/// Floor for reported latencies, so a sub-millisecond reply is
/// distinguishable from "unmeasured"
pub const MIN_LATENCY_MS: f64 = 0.5;

/// Default worker bound for a scan pass
pub const DEFAULT_SCAN_CONCURRENCY: usize = 64;

/// Default interval between monitoring ticks
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(2);

/// Bounded wait when joining a stopping monitor task
pub const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default per-device sample history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Per-device monitoring settings
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub history_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Alerting thresholds and delivery tuning
///
/// Validated synchronously before monitoring starts; everything past
/// validation is treated as trusted by the evaluator and dispatcher.
#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Latency ceiling in milliseconds above which a sample qualifies as
    /// a high-latency condition
    pub latency_threshold_ms: f64,
    /// Consecutive qualifying samples required before an alert is emitted
    pub consecutive_failures: u32,
    /// Minimum time between two alerts for the same address
    pub cooldown: Duration,
    /// Collect events and deliver them as one grouped notification
    pub batch_alerts: bool,
    /// How long a batch accumulates before it is flushed
    pub batch_interval: Duration,
    pub alert_on_down: bool,
    pub alert_on_high_latency: bool,
    /// Recipient identifiers handed to the sender capability
    pub recipients: Vec<String>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            latency_threshold_ms: 1000.0,
            consecutive_failures: 3,
            cooldown: Duration::from_secs(5 * 60),
            batch_alerts: false,
            batch_interval: Duration::from_secs(15 * 60),
            alert_on_down: true,
            alert_on_high_latency: true,
            recipients: Vec::new(),
        }
    }
}

impl AlertSettings {
    pub fn validate(&self) -> Result<(), LanwatchError> {
        if !self.latency_threshold_ms.is_finite() || self.latency_threshold_ms <= 0.0 {
            return Err(LanwatchError::InvalidThreshold(format!(
                "latency threshold must be a positive number of milliseconds, got {}",
                self.latency_threshold_ms
            )));
        }
        if self.consecutive_failures == 0 {
            return Err(LanwatchError::InvalidThreshold(
                "consecutive failure count must be at least 1".to_string(),
            ));
        }
        if self.batch_alerts && self.batch_interval.is_zero() {
            return Err(LanwatchError::InvalidThreshold(
                "batch interval must be non-zero when batching is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
