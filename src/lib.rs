//! lanwatch — LAN host discovery, liveness monitoring, and alerting
//!
//! This crate provides the core of a network monitor:
//! - CIDR range expansion into candidate host addresses
//! - A multi-strategy probe chain (ARP, ICMP fallback, enrichment)
//! - Bounded-concurrency scanning with progress and cancellation
//! - Long-running per-device monitors with bounded sample history
//! - Threshold alerting with cooldown and batched delivery
//!
//! Rendering, configuration persistence, and alert transport are the
//! caller's concern; the core consumes a range string, thresholds, and a
//! sender capability, and produces device records and alert events.

pub mod alerts;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod network;
pub mod probe;
pub mod range;
pub mod scan;

pub use alerts::{
    compose_alert_message, compose_batch_message, AlertEvaluator, AlertEvent, AlertKind,
    AlertSender, BatchReport, DeviceContext, NotificationDispatcher,
};
pub use config::{AlertSettings, MonitorSettings};
pub use error::LanwatchError;
pub use models::{DeviceRecord, DeviceStatus, Sample, SampleStatus, ScanReport};
pub use monitor::{
    DeviceMonitor, HistoryBuffer, HistoryCallback, MonitorRegistry, MonitorState, SampleCallback,
};
pub use network::{
    find_valid_interface, list_valid_interfaces, lookup_neighbor_mac, lookup_vendor,
    normalize_mac, resolve_hostname, InterfaceInfo,
};
pub use probe::{ArpClient, LivenessProbeFn, LivenessReport, ProbeStack};
pub use range::enumerate_hosts;
pub use scan::{run_scan, CancelToken, ProgressCallback, RecordCallback, ScanOptions};
