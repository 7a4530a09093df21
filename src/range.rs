//! Network range expansion

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

use crate::error::LanwatchError;

/// Widest prefix the enumerator will expand (a /8 is sixteen million hosts)
const MIN_PREFIX_LEN: u8 = 8;

/// Checks if an IP address is the network or broadcast address of a subnet
pub fn is_special_address(ip: Ipv4Addr, subnet: &Ipv4Network) -> bool {
    ip == subnet.network() || ip == subnet.broadcast()
}

/// Expands a CIDR range into its usable host addresses, ascending.
///
/// Host bits below the prefix are masked off, so `"192.168.1.17/24"`
/// enumerates the same hosts as `"192.168.1.0/24"`. Network and broadcast
/// addresses are excluded. A `/32` yields exactly the named address; a
/// `/31` has no usable hosts after exclusion and is rejected, as is any
/// unparsable input.
pub fn enumerate_hosts(range: &str) -> Result<Vec<Ipv4Addr>, LanwatchError> {
    let parsed: Ipv4Network = range
        .trim()
        .parse()
        .map_err(|e| LanwatchError::invalid_range(range, format!("{e}")))?;

    // Re-anchor on the canonical network address in case the caller gave
    // a host address inside the block.
    let subnet = Ipv4Network::new(parsed.network(), parsed.prefix())
        .map_err(|e| LanwatchError::invalid_range(range, format!("{e}")))?;

    if subnet.prefix() == 32 {
        return Ok(vec![subnet.ip()]);
    }

    // A handful of octets short of the whole internet; enumerating a /0
    // would materialize four billion addresses.
    if subnet.prefix() < MIN_PREFIX_LEN {
        return Err(LanwatchError::invalid_range(
            range,
            format!("prefix /{} is too wide to enumerate (minimum /{MIN_PREFIX_LEN})", subnet.prefix()),
        ));
    }

    let hosts: Vec<Ipv4Addr> = subnet
        .iter()
        .filter(|ip| !is_special_address(*ip, &subnet))
        .collect();

    if hosts.is_empty() {
        return Err(LanwatchError::invalid_range(
            range,
            "range contains no usable host addresses",
        ));
    }

    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_c_host_count() {
        let hosts = enumerate_hosts("192.168.1.0/24").unwrap();
        assert_eq!(hosts.len(), 254);
        assert!(!hosts.contains(&"192.168.1.0".parse().unwrap()));
        assert!(!hosts.contains(&"192.168.1.255".parse().unwrap()));
        assert!(hosts.contains(&"192.168.1.1".parse().unwrap()));
        assert!(hosts.contains(&"192.168.1.254".parse().unwrap()));
    }

    #[test]
    fn test_slash_30_yields_two_hosts() {
        let hosts = enumerate_hosts("10.0.0.0/30").unwrap();
        assert_eq!(
            hosts,
            vec![
                "10.0.0.1".parse::<Ipv4Addr>().unwrap(),
                "10.0.0.2".parse::<Ipv4Addr>().unwrap()
            ]
        );
    }

    #[test]
    fn test_host_bits_are_masked() {
        let anchored = enumerate_hosts("192.168.1.0/28").unwrap();
        let offset = enumerate_hosts("192.168.1.5/28").unwrap();
        assert_eq!(anchored, offset);
    }

    #[test]
    fn test_slash_32_yields_single_address() {
        let hosts = enumerate_hosts("10.1.2.3/32").unwrap();
        assert_eq!(hosts, vec!["10.1.2.3".parse::<Ipv4Addr>().unwrap()]);
    }

    #[test]
    fn test_slash_31_is_rejected() {
        assert!(enumerate_hosts("10.0.0.0/31").is_err());
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert!(enumerate_hosts("").is_err());
        assert!(enumerate_hosts("not-a-range").is_err());
        assert!(enumerate_hosts("300.0.0.0/24").is_err());
        assert!(enumerate_hosts("10.0.0.0/33").is_err());
    }

    #[test]
    fn test_too_wide_ranges_are_rejected() {
        assert!(enumerate_hosts("0.0.0.0/0").is_err());
        assert!(enumerate_hosts("10.0.0.0/7").is_err());
    }

    #[test]
    fn test_hosts_are_ascending() {
        let hosts = enumerate_hosts("172.16.4.0/26").unwrap();
        let mut sorted = hosts.clone();
        sorted.sort_by_key(|ip| u32::from(*ip));
        assert_eq!(hosts, sorted);
    }
}
