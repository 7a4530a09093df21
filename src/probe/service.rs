//! Web service detection

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpStream;

use crate::config::{SERVICE_PROBE_TIMEOUT, WEB_PORTS};

/// Attempts a bounded connect to the well-known web ports; the first one
/// that answers yields a synthesized endpoint URL.
pub async fn detect_web_service(ip: Ipv4Addr) -> Option<String> {
    for &port in WEB_PORTS {
        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        if let Ok(Ok(_stream)) =
            tokio::time::timeout(SERVICE_PROBE_TIMEOUT, TcpStream::connect(addr)).await
        {
            let scheme = if port == 443 { "https" } else { "http" };
            return Some(format!("{scheme}://{ip}"));
        }
    }
    None
}
