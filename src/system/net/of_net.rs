// Interface MAC address lookup
//
// Sources are consulted in a fixed order: flash partitions referenced by
// mtd-mac-address*, then the plain "mac-address", "local-mac-address" and
// "address" properties. The first valid address wins.

use super::mac::MacAddress;
use super::mtd_mac::of_get_mac_address_mtd;
use crate::error::MacError;
use crate::mtd::MtdTable;
use crate::of::{ConfigTree, NodeId};
use bitflags::bitflags;

bitflags! {
    /// Which address sources a lookup may use
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MacSources: u8 {
        /// `mtd-mac-address` / `mtd-mac-address-ascii`
        const MTD = 1 << 0;
        const MAC_ADDRESS = 1 << 1;
        const LOCAL_MAC_ADDRESS = 1 << 2;
        const ADDRESS = 1 << 3;
    }
}

impl Default for MacSources {
    fn default() -> Self {
        MacSources::all()
    }
}

const PROPERTY_SOURCES: [(MacSources, &str); 3] = [
    (MacSources::MAC_ADDRESS, "mac-address"),
    (MacSources::LOCAL_MAC_ADDRESS, "local-mac-address"),
    (MacSources::ADDRESS, "address"),
];

/// Read a 6-byte address property, if present and valid
pub fn of_get_mac_addr<T: ConfigTree + ?Sized>(tree: &T, node: NodeId, name: &str) -> Option<MacAddress> {
    let mac = MacAddress::from_slice(tree.property(node, name)?)?;
    if mac.is_valid() {
        Some(mac)
    } else {
        None
    }
}

/// Resolve the MAC address of `node` using every source
pub fn of_get_mac_address<T: ConfigTree + ?Sized>(
    tree: &mut T,
    mtds: &MtdTable,
    node: NodeId,
) -> Result<MacAddress, MacError> {
    of_get_mac_address_with(tree, mtds, node, MacSources::default())
}

/// Resolve the MAC address of `node` using only `sources`
///
/// Resolution mutates the node (the MTD path caches its result), so callers
/// resolving the same node from several threads must serialize the calls.
pub fn of_get_mac_address_with<T: ConfigTree + ?Sized>(
    tree: &mut T,
    mtds: &MtdTable,
    node: NodeId,
    sources: MacSources,
) -> Result<MacAddress, MacError> {
    if sources.contains(MacSources::MTD) {
        match of_get_mac_address_mtd(tree, mtds, node) {
            Ok(mac) => return Ok(mac),
            Err(MacError::NotConfigured) => {}
            Err(e) => log::debug!("{}: mtd lookup failed: {}", tree.node_name(node).unwrap_or("?"), e),
        }
    }

    for (flag, name) in PROPERTY_SOURCES {
        if !sources.contains(flag) {
            continue;
        }
        if let Some(mac) = of_get_mac_addr(tree, node, name) {
            log::debug!("{}: MAC {} from {}", tree.node_name(node).unwrap_or("?"), mac, name);
            return Ok(mac);
        }
    }

    Err(MacError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_tree::DeviceTree;
    use crate::mtd::RamMtd;

    fn mtd_board(stored: [u8; 6]) -> (DeviceTree, MtdTable, NodeId) {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        let art = tree.add_node(root, "art").unwrap();
        tree.set_property(art, "phandle", &7u32.to_be_bytes()).unwrap();
        let eth = tree.add_node(root, "ethernet@0").unwrap();
        tree.set_property(eth, "mtd-mac-address", &[0, 0, 0, 7, 0, 0, 0, 0]).unwrap();

        let mut mtds = MtdTable::new();
        mtds.add_partition("art", RamMtd::new(stored.to_vec()));
        (tree, mtds, eth)
    }

    #[test]
    fn test_mtd_before_properties() {
        let (mut tree, mtds, eth) = mtd_board([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        tree.set_property(eth, "local-mac-address", &[0x02, 0, 0, 0, 0, 1]).unwrap();

        let mac = of_get_mac_address(&mut tree, &mtds, eth).unwrap();
        assert_eq!(mac, MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
    }

    #[test]
    fn test_invalid_mtd_falls_through_to_properties() {
        let (mut tree, mtds, eth) = mtd_board([0xff; 6]);
        tree.set_property(eth, "local-mac-address", &[0x02, 0, 0, 0, 0, 1]).unwrap();

        let mac = of_get_mac_address(&mut tree, &mtds, eth).unwrap();
        assert_eq!(mac, MacAddress::new([0x02, 0, 0, 0, 0, 1]));
    }

    #[test]
    fn test_property_order() {
        let mut tree = DeviceTree::new();
        let eth = tree.add_node(tree.root(), "ethernet@0").unwrap();
        tree.set_property(eth, "mac-address", &[0; 6]).unwrap();
        tree.set_property(eth, "local-mac-address", &[0x00, 0x0a, 0, 0, 0, 1]).unwrap();
        tree.set_property(eth, "address", &[0x00, 0x0b, 0, 0, 0, 1]).unwrap();

        let mtds = MtdTable::new();
        let mac = of_get_mac_address(&mut tree, &mtds, eth).unwrap();
        assert_eq!(mac, MacAddress::new([0x00, 0x0a, 0, 0, 0, 1]));
    }

    #[test]
    fn test_sources_can_be_restricted() {
        let (mut tree, mtds, eth) = mtd_board([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        tree.set_property(eth, "address", &[0x00, 0x0b, 0, 0, 0, 1]).unwrap();

        let mac = of_get_mac_address_with(&mut tree, &mtds, eth, MacSources::ADDRESS).unwrap();
        assert_eq!(mac, MacAddress::new([0x00, 0x0b, 0, 0, 0, 1]));
        assert_eq!(tree.property(eth, "mac-address"), None);
    }

    #[test]
    fn test_nothing_found() {
        let mut tree = DeviceTree::new();
        let eth = tree.add_node(tree.root(), "ethernet@0").unwrap();
        tree.set_property(eth, "mac-address", &[1, 2, 3]).unwrap();

        let mtds = MtdTable::new();
        assert_eq!(of_get_mac_address(&mut tree, &mtds, eth), Err(MacError::NotFound));
    }
}
