//! Probe strategy chain
//!
//! For one candidate address, ordered strategies run under independent
//! timeouts: layer-2 discovery, then an ICMP echo fallback, then
//! enrichment (neighbor-table backfill, vendor, reverse name, web
//! service). Every step's failure is non-fatal to the others; a host
//! that fails both liveness steps is reported as unreachable.

mod arp;
mod ping;
mod service;

pub use arp::ArpClient;
pub use ping::{make_icmp_client, ping_once};
pub use service::detect_web_service;

use std::future::Future;
use std::net::Ipv4Addr;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{ARP_PROBE_TIMEOUT, MIN_LATENCY_MS, PING_TIMEOUT};
use crate::models::{DeviceRecord, DeviceStatus};
use crate::network::{lookup_neighbor_mac, lookup_vendor, normalize_mac, resolve_hostname, InterfaceInfo};

/// Result of the liveness portion of the chain (steps 1–2 only)
#[derive(Debug, Clone)]
pub struct LivenessReport {
    /// Hardware address when layer-2 discovery answered
    pub mac: Option<String>,
    pub latency_ms: Option<f64>,
    pub up: bool,
}

impl LivenessReport {
    pub fn unreachable() -> Self {
        Self {
            mac: None,
            latency_ms: None,
            up: false,
        }
    }
}

/// Injected liveness probe used by device monitors
pub type LivenessProbeFn = Arc<
    dyn Fn(Ipv4Addr) -> Pin<Box<dyn Future<Output = LivenessReport> + Send>> + Send + Sync,
>;

/// The probing strategies available to a session
///
/// Each strategy degrades independently: without privileges for a raw
/// datalink channel the ARP step is skipped, without a raw ICMP socket
/// the echo step is skipped.
pub struct ProbeStack {
    arp: Option<Arc<ArpClient>>,
    icmp: Option<Arc<surge_ping::Client>>,
}

impl ProbeStack {
    pub fn new(interface: Option<&InterfaceInfo>) -> Self {
        let arp = interface.and_then(|iface| match ArpClient::new(iface) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("layer-2 discovery unavailable: {}", e);
                None
            }
        });

        let icmp = make_icmp_client();

        if arp.is_none() && icmp.is_none() {
            tracing::warn!("no liveness strategy available; every host will appear unreachable");
        }

        Self { arp, icmp }
    }

    /// Steps 1–2: layer-2 discovery, then the echo fallback.
    pub async fn liveness(&self, ip: Ipv4Addr) -> LivenessReport {
        if let Some(arp) = &self.arp {
            if let Some((mac, rtt)) = arp.probe(ip, ARP_PROBE_TIMEOUT).await {
                let latency = (rtt.as_secs_f64() * 1000.0).max(MIN_LATENCY_MS);
                return LivenessReport {
                    mac: normalize_mac(&mac.to_string()),
                    latency_ms: Some(latency),
                    up: true,
                };
            }
        }

        if let Some(icmp) = &self.icmp {
            if let Some(latency) = ping_once(icmp, ip, PING_TIMEOUT).await {
                return LivenessReport {
                    mac: None,
                    latency_ms: Some(latency),
                    up: true,
                };
            }
        }

        LivenessReport::unreachable()
    }

    /// The full chain: liveness plus enrichment. Returns `None` when the
    /// host failed every liveness step.
    pub async fn probe_device(&self, ip: Ipv4Addr) -> Option<DeviceRecord> {
        let live = self.liveness(ip).await;
        if !live.up {
            return None;
        }

        let mut record = DeviceRecord::new(ip, DeviceStatus::Online);
        record.response_time_ms = live.latency_ms;

        // Step 3: neighbor-table backfill when discovery gave no MAC.
        let mac = match live.mac {
            Some(mac) => Some(mac),
            None => lookup_neighbor_mac(ip).await,
        };

        // Steps 4–6: each yields "unknown"/absent on failure.
        record.vendor = lookup_vendor(mac.as_deref());
        record.mac = mac;
        record.hostname = resolve_hostname(ip)
            .await
            .unwrap_or_else(|| "unknown".to_string());
        record.web_service = detect_web_service(ip).await;

        Some(record)
    }

    /// A cloneable liveness closure for device monitors.
    pub fn liveness_probe(self: &Arc<Self>) -> LivenessProbeFn {
        let stack = Arc::clone(self);
        Arc::new(move |ip| {
            let stack = Arc::clone(&stack);
            Box::pin(async move { stack.liveness(ip).await })
        })
    }
}
