//! Local interface detection and selection

use anyhow::{anyhow, Result};
use pnet::datalink::{self, NetworkInterface};
use pnet::util::MacAddr;
use std::net::{IpAddr, Ipv4Addr};

/// A usable local interface with its IPv4 assignment
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub prefix_len: u8,
    pub pnet_interface: NetworkInterface,
}

fn is_virtual_adapter_name(name_lower: &str) -> bool {
    name_lower.contains("vmware")
        || name_lower.contains("virtualbox")
        || name_lower.contains("docker")
        || name_lower.contains("vethernet")
        || name_lower.contains("hyper-v")
        || name_lower.contains("wsl")
}

fn is_link_local(ip: Ipv4Addr) -> bool {
    ip.octets()[0] == 169 && ip.octets()[1] == 254
}

fn collect_candidates(interfaces: &[NetworkInterface]) -> Vec<InterfaceInfo> {
    let mut candidates = Vec::new();

    for iface in interfaces {
        if iface.is_loopback() || !iface.is_up() {
            continue;
        }

        let mac = match iface.mac {
            Some(m) if m != MacAddr::zero() => m,
            _ => continue,
        };

        if is_virtual_adapter_name(&iface.name.to_lowercase()) {
            tracing::debug!("skipping virtual adapter: {}", iface.name);
            continue;
        }

        for assignment in &iface.ips {
            let IpAddr::V4(ipv4) = assignment.ip() else {
                continue;
            };
            if ipv4.is_unspecified() || assignment.prefix() == 0 || is_link_local(ipv4) {
                continue;
            }

            candidates.push(InterfaceInfo {
                name: iface.name.clone(),
                ip: ipv4,
                mac,
                prefix_len: assignment.prefix(),
                pnet_interface: iface.clone(),
            });
        }
    }

    candidates
}

/// Scores an address for interface selection priority; typical LAN
/// ranges win over carrier-grade or virtual-looking assignments.
pub fn interface_score(ip: &Ipv4Addr) -> u32 {
    let octets = ip.octets();
    match octets[0] {
        192 if octets[1] == 168 => 100,
        10 => 90,
        172 if (16..=31).contains(&octets[1]) => 50,
        _ => 70,
    }
}

/// Finds the best usable IPv4 interface, preferring physical adapters on
/// private LAN ranges.
pub fn find_valid_interface() -> Result<InterfaceInfo> {
    let interfaces = datalink::interfaces();
    let mut candidates = collect_candidates(&interfaces);

    candidates.sort_by(|a, b| interface_score(&b.ip).cmp(&interface_score(&a.ip)));

    candidates.into_iter().next().ok_or_else(|| {
        anyhow!(
            "no valid IPv4 network interface found; \
             ensure an active network connection"
        )
    })
}

/// Valid interface names in priority order, deduplicated.
pub fn list_valid_interfaces() -> Vec<String> {
    let interfaces = datalink::interfaces();
    let mut candidates = collect_candidates(&interfaces);

    candidates.sort_by(|a, b| interface_score(&b.ip).cmp(&interface_score(&a.ip)));

    let mut names: Vec<String> = Vec::new();
    for candidate in candidates {
        if !names.contains(&candidate.name) {
            names.push(candidate.name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_score_prefers_home_lan() {
        let home: Ipv4Addr = "192.168.0.5".parse().unwrap();
        let office: Ipv4Addr = "10.1.2.3".parse().unwrap();
        let maybe_virtual: Ipv4Addr = "172.17.0.2".parse().unwrap();
        assert!(interface_score(&home) > interface_score(&office));
        assert!(interface_score(&office) > interface_score(&maybe_virtual));
    }

    #[test]
    fn test_virtual_adapter_names() {
        assert!(is_virtual_adapter_name("vmware network adapter"));
        assert!(is_virtual_adapter_name("docker0"));
        assert!(!is_virtual_adapter_name("eth0"));
        assert!(!is_virtual_adapter_name("wlp3s0"));
    }

    #[test]
    fn test_link_local_detection() {
        assert!(is_link_local("169.254.10.20".parse().unwrap()));
        assert!(!is_link_local("192.168.1.1".parse().unwrap()));
    }
}
