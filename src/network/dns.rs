//! Reverse name resolution
//!
//! The underlying resolver call is blocking, so lookups run on the
//! blocking pool under a hard timeout.

use dns_lookup::lookup_addr;
use std::net::{IpAddr, Ipv4Addr};

use crate::config::DNS_TIMEOUT;

/// Reverse-resolve a single address, synchronously.
///
/// An answer that merely echoes the address back is treated as no answer.
pub fn reverse_lookup(ip: Ipv4Addr) -> Option<String> {
    match lookup_addr(&IpAddr::V4(ip)) {
        Ok(hostname) if hostname != ip.to_string() => Some(hostname),
        _ => None,
    }
}

/// Reverse-resolve with a bounded wait; timeouts and failures yield `None`.
pub async fn resolve_hostname(ip: Ipv4Addr) -> Option<String> {
    let lookup = tokio::time::timeout(
        DNS_TIMEOUT,
        tokio::task::spawn_blocking(move || reverse_lookup(ip)),
    )
    .await;

    match lookup {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!("reverse lookup worker failed for {}: {}", ip, e);
            None
        }
        Err(_) => {
            tracing::debug!("reverse lookup timed out for {}", ip);
            None
        }
    }
}
