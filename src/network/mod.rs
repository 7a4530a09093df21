//! Network collaborators: interface selection, name/vendor lookups, and
//! neighbor-table access

mod dns;
mod interface;
mod neighbor;
mod vendor;

pub use dns::{resolve_hostname, reverse_lookup};
pub use interface::{find_valid_interface, interface_score, list_valid_interfaces, InterfaceInfo};
pub use neighbor::lookup_neighbor_mac;
pub use vendor::{is_locally_administered, lookup_vendor, normalize_mac};
