//! OS neighbor-table lookup
//!
//! Backfills a hardware address for hosts that answered a ping but not
//! our layer-2 probe (typical when a previous exchange left a cached
//! entry). Reads `/proc/net/arp` where available and falls back to
//! parsing `arp -an` output.

use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::NEIGHBOR_LOOKUP_TIMEOUT;
use crate::network::vendor::normalize_mac;

static MAC_PATTERN: OnceLock<Regex> = OnceLock::new();

fn mac_pattern() -> &'static Regex {
    MAC_PATTERN.get_or_init(|| {
        Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}").expect("static MAC pattern")
    })
}

/// Extract the hardware address for `ip` from `/proc/net/arp` content.
///
/// Incomplete entries (all-zero hardware address) are skipped.
fn parse_proc_net_arp(content: &str, ip: Ipv4Addr) -> Option<String> {
    let needle = ip.to_string();
    for line in content.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let Some(entry_ip) = fields.next() else {
            continue;
        };
        if entry_ip != needle {
            continue;
        }
        // IP address  HW type  Flags  HW address  Mask  Device
        let mac = fields.nth(2)?;
        if mac == "00:00:00:00:00:00" {
            return None;
        }
        return normalize_mac(mac);
    }
    None
}

/// Extract the hardware address for `ip` from `arp -an` style output.
fn parse_arp_command_output(output: &str, ip: Ipv4Addr) -> Option<String> {
    let needle = format!("({ip})");
    let bare = ip.to_string();
    for line in output.lines() {
        if !line.contains(&needle) && !line.split_whitespace().any(|tok| tok == bare) {
            continue;
        }
        if let Some(m) = mac_pattern().find(line) {
            let normalized = normalize_mac(m.as_str())?;
            if normalized == "00:00:00:00:00:00" {
                return None;
            }
            return Some(normalized);
        }
    }
    None
}

async fn read_proc_net_arp(ip: Ipv4Addr) -> Option<String> {
    let content = tokio::task::spawn_blocking(|| std::fs::read_to_string("/proc/net/arp"))
        .await
        .ok()?
        .ok()?;
    parse_proc_net_arp(&content, ip)
}

async fn query_arp_command(ip: Ipv4Addr, timeout: Duration) -> Option<String> {
    let flag = if cfg!(windows) { "-a" } else { "-an" };
    let output = tokio::time::timeout(
        timeout,
        tokio::process::Command::new("arp")
            .arg(flag)
            .kill_on_drop(true)
            .output(),
    )
    .await;

    match output {
        Ok(Ok(out)) if out.status.success() => {
            parse_arp_command_output(&String::from_utf8_lossy(&out.stdout), ip)
        }
        Ok(Ok(_)) | Ok(Err(_)) => None,
        Err(_) => {
            tracing::debug!("neighbor table query timed out for {}", ip);
            None
        }
    }
}

/// Look up a cached neighbor-table mapping for `ip`.
///
/// Best effort: a missing table, a timeout, or an incomplete entry all
/// yield `None`.
pub async fn lookup_neighbor_mac(ip: Ipv4Addr) -> Option<String> {
    if cfg!(target_os = "linux") {
        if let Some(mac) = read_proc_net_arp(ip).await {
            return Some(mac);
        }
    }
    query_arp_command(ip, NEIGHBOR_LOOKUP_TIMEOUT).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_SAMPLE: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         a4:2b:b0:c9:00:11     *        eth0
192.168.1.50     0x1         0x0         00:00:00:00:00:00     *        eth0
192.168.1.77     0x1         0x2         0c:9d:92:aa:bb:cc     *        wlan0
";

    #[test]
    fn test_parse_proc_net_arp_hit() {
        let ip: Ipv4Addr = "192.168.1.1".parse().unwrap();
        assert_eq!(
            parse_proc_net_arp(PROC_SAMPLE, ip),
            Some("A4:2B:B0:C9:00:11".to_string())
        );
    }

    #[test]
    fn test_parse_proc_net_arp_skips_incomplete() {
        let ip: Ipv4Addr = "192.168.1.50".parse().unwrap();
        assert_eq!(parse_proc_net_arp(PROC_SAMPLE, ip), None);
    }

    #[test]
    fn test_parse_proc_net_arp_miss() {
        let ip: Ipv4Addr = "10.0.0.9".parse().unwrap();
        assert_eq!(parse_proc_net_arp(PROC_SAMPLE, ip), None);
    }

    #[test]
    fn test_parse_arp_command_output_unix_style() {
        let output = "\
? (192.168.1.1) at a4:2b:b0:c9:00:11 [ether] on eth0
? (192.168.1.20) at <incomplete> on eth0
";
        let hit: Ipv4Addr = "192.168.1.1".parse().unwrap();
        let miss: Ipv4Addr = "192.168.1.20".parse().unwrap();
        assert_eq!(
            parse_arp_command_output(output, hit),
            Some("A4:2B:B0:C9:00:11".to_string())
        );
        assert_eq!(parse_arp_command_output(output, miss), None);
    }

    #[test]
    fn test_parse_arp_command_output_windows_style() {
        let output = "\
Interface: 192.168.1.10 --- 0xb
  Internet Address      Physical Address      Type
  192.168.1.1           a4-2b-b0-c9-00-11     dynamic
";
        let hit: Ipv4Addr = "192.168.1.1".parse().unwrap();
        assert_eq!(
            parse_arp_command_output(output, hit),
            Some("A4:2B:B0:C9:00:11".to_string())
        );
    }

    #[test]
    fn test_does_not_match_prefix_addresses() {
        let output = "? (192.168.1.100) at aa:bb:cc:dd:ee:ff [ether] on eth0\n";
        let ip: Ipv4Addr = "192.168.1.1".parse().unwrap();
        assert_eq!(parse_arp_command_output(output, ip), None);
    }
}
