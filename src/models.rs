//! Data models shared across scanning, monitoring, and alerting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Liveness of a device as seen by a scan pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "Online",
            DeviceStatus::Offline => "Offline",
        }
    }
}

/// Outcome of a single monitoring tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleStatus {
    Up,
    Down,
}

impl SampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::Up => "up",
            SampleStatus::Down => "down",
        }
    }
}

/// A discovered host
///
/// Immutable once returned from a scan pass; a later pass produces a new
/// value rather than mutating an old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip: Ipv4Addr,
    /// Normalized uppercase colon-separated hardware address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    pub hostname: String,
    pub vendor: String,
    /// Round-trip time in milliseconds; `None` when unreachable/unmeasured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<f64>,
    /// Synthesized endpoint URL when a web port answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_service: Option<String>,
    pub status: DeviceStatus,
}

impl DeviceRecord {
    /// Canonical minimal constructor to avoid field drift across call-sites.
    pub fn new(ip: Ipv4Addr, status: DeviceStatus) -> Self {
        Self {
            ip,
            mac: None,
            hostname: "unknown".to_string(),
            vendor: "unknown".to_string(),
            response_time_ms: None,
            web_service: None,
            status,
        }
    }
}

/// One monitoring observation for a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// `None` means undefined (probe failed or produced no number)
    pub latency_ms: Option<f64>,
    pub status: SampleStatus,
}

impl Sample {
    /// Non-finite latencies are coerced to `None` so a NaN from a broken
    /// parse can never leak a numeric sentinel into the history.
    pub fn new(timestamp: DateTime<Utc>, latency_ms: Option<f64>, status: SampleStatus) -> Self {
        let latency_ms = latency_ms.filter(|v| v.is_finite());
        Self {
            timestamp,
            latency_ms,
            status,
        }
    }
}

/// Summary of one scan pass, for display surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub range: String,
    pub scanned: usize,
    pub found: usize,
    pub duration_ms: u64,
    pub devices: Vec<DeviceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_coerces_non_finite_latency() {
        let now = Utc::now();
        let s = Sample::new(now, Some(f64::NAN), SampleStatus::Down);
        assert_eq!(s.latency_ms, None);

        let s = Sample::new(now, Some(f64::INFINITY), SampleStatus::Down);
        assert_eq!(s.latency_ms, None);

        let s = Sample::new(now, Some(12.5), SampleStatus::Up);
        assert_eq!(s.latency_ms, Some(12.5));
    }
}
