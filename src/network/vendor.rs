//! Hardware-address normalization and vendor lookup
//!
//! Vendor names come from the embedded OUI database. Lookups never fail:
//! absent or malformed input yields `"unknown"`.

use mac_oui::Oui;
use std::sync::OnceLock;

/// Global OUI database instance (loaded once)
static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn get_oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!("OUI database unavailable: {}", e);
                None
            }
        })
        .as_ref()
}

/// Normalizes a hardware address to uppercase colon-separated hex.
///
/// Accepts colon, dash, or dot separators as well as bare hex; anything
/// that does not contain exactly twelve hex digits yields `None`.
/// Normalizing an already-normalized address returns it unchanged.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let separators_only = raw
        .chars()
        .all(|c| c.is_ascii_hexdigit() || matches!(c, ':' | '-' | '.'));

    if digits.len() != 12 || !separators_only {
        return None;
    }

    let upper = digits.to_ascii_uppercase();
    let pairs: Vec<&str> = (0..6).map(|i| &upper[i * 2..i * 2 + 2]).collect();
    Some(pairs.join(":"))
}

/// Check if a hardware address is locally administered (randomized or
/// virtual). Bit 2 of the first octet set means locally administered.
pub fn is_locally_administered(mac: &str) -> bool {
    let first: String = mac
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(2)
        .collect();

    if first.len() < 2 {
        return false;
    }

    match u8::from_str_radix(&first, 16) {
        Ok(byte) => (byte & 0x02) != 0,
        Err(_) => false,
    }
}

/// Resolve the vendor name for a hardware address.
///
/// Randomized addresses report as private devices rather than a bogus
/// database hit. Never errors.
pub fn lookup_vendor(mac: Option<&str>) -> String {
    let Some(mac) = mac else {
        return "unknown".to_string();
    };

    let Some(normalized) = normalize_mac(mac) else {
        return "unknown".to_string();
    };

    if is_locally_administered(&normalized) {
        return "Private (randomized MAC)".to_string();
    }

    if let Some(db) = get_oui_db() {
        if let Ok(Some(entry)) = db.lookup_by_mac(&normalized) {
            return entry.company_name.clone();
        }
    }

    "unknown".to_string()
}
