//! ICMP echo fallback probing

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_ping::{Client, Config, PingIdentifier, PingSequence};

use crate::config::MIN_LATENCY_MS;

/// Generates a random ping identifier
fn rand_id() -> u16 {
    use std::time::SystemTime;
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    ((duration.as_nanos() % 0xFFFF) as u16).wrapping_add(1)
}

/// Builds the shared ICMP client, or `None` when raw sockets are not
/// available; callers degrade to the remaining strategies.
pub fn make_icmp_client() -> Option<Arc<Client>> {
    match Client::new(&Config::default()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("ICMP client unavailable ({}), echo probing disabled", e);
            None
        }
    }
}

/// Sends a single echo and returns the round trip in milliseconds.
///
/// The reply's reported time wins when present; otherwise the measured
/// wall-clock elapsed stands in. Sub-millisecond results are floored at
/// `MIN_LATENCY_MS` so they stay distinguishable from "unmeasured".
pub async fn ping_once(client: &Client, ip: Ipv4Addr, timeout: Duration) -> Option<f64> {
    let payload = [0u8; 56];
    let started = Instant::now();

    match client
        .pinger(IpAddr::V4(ip), PingIdentifier(rand_id()))
        .await
        .timeout(timeout)
        .ping(PingSequence(0), &payload)
        .await
    {
        Ok((_packet, rtt)) => {
            let reported = rtt.as_secs_f64() * 1000.0;
            let measured = started.elapsed().as_secs_f64() * 1000.0;
            let latency = if reported > 0.0 { reported } else { measured };
            Some(latency.max(MIN_LATENCY_MS))
        }
        Err(_) => None,
    }
}
