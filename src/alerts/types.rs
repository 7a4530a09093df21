//! Alert vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::models::DeviceRecord;

/// The two threshold conditions that can raise an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    DeviceDown,
    HighLatency,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::DeviceDown => "Device Down",
            AlertKind::HighLatency => "High Latency",
        }
    }
}

/// Identity of the affected device, carried into notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceContext {
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub mac: Option<String>,
}

impl DeviceContext {
    pub fn from_record(record: &DeviceRecord) -> Self {
        Self {
            hostname: Some(record.hostname.clone()),
            vendor: Some(record.vendor.clone()),
            mac: record.mac.clone(),
        }
    }
}

/// One qualifying evaluation, produced once and consumed exactly once by
/// the dispatcher (individually or folded into a batch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub ip: Ipv4Addr,
    pub kind: AlertKind,
    /// Observed latency in milliseconds; `None` for a down device
    pub latency_ms: Option<f64>,
    pub device: DeviceContext,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(ip: Ipv4Addr, kind: AlertKind, latency_ms: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            ip,
            kind,
            latency_ms,
            device: DeviceContext::default(),
            timestamp,
        }
    }

    pub fn with_device(mut self, device: DeviceContext) -> Self {
        self.device = device;
        self
    }
}

/// Events of one flush, grouped by address for message composition
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub events: BTreeMap<Ipv4Addr, Vec<AlertEvent>>,
    pub total: usize,
    /// The configured accumulation interval, echoed for the message body
    pub interval: Duration,
}

impl BatchReport {
    pub fn from_events(drained: Vec<AlertEvent>, interval: Duration) -> Self {
        let total = drained.len();
        let mut events: BTreeMap<Ipv4Addr, Vec<AlertEvent>> = BTreeMap::new();
        for event in drained {
            events.entry(event.ip).or_default().push(event);
        }
        Self {
            events,
            total,
            interval,
        }
    }
}
