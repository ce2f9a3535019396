// MAC addresses stored in flash partitions
//
// An interface node points at a partition node and a byte offset:
//
//   mtd-mac-address       = <&art 0x1002>;     6 raw bytes
//   mtd-mac-address-ascii = <&uboot_env 0x40>; "001122334455" or "00:11:22:33:44:55"
//
// and may ask for one byte of the stored address to be bumped, so that
// several interfaces can share one factory address:
//
//   mtd-mac-address-increment-byte = <5>;      defaults to the last byte
//   mtd-mac-address-increment = <1>;
//
// The result is cached on the node as a regular "mac-address" property.

use super::mac::{MacAddress, ETH_ALEN};
use crate::error::MacError;
use crate::mtd::{MtdHandle, MtdTable};
use crate::of::{base_name, ConfigTree, NodeId};
use crate::TreeError;

const INCREMENT_BYTE_PROP: &str = "mtd-mac-address-increment-byte";
const INCREMENT_PROP: &str = "mtd-mac-address-increment";
const MAC_ADDRESS_PROP: &str = "mac-address";
const LABEL_PROP: &str = "label";

const DEFAULT_INCREMENT_BYTE: u32 = 5;

// "XXXXXXXXXXXX" and "XX:XX:XX:XX:XX:XX"
const ASCII_PLAIN_LEN: usize = 2 * ETH_ALEN;
const ASCII_COLON_LEN: usize = 3 * ETH_ALEN - 1;

/// How an address is laid out in the partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacFormat {
    /// Six raw bytes
    Binary,
    /// Hex digits, with or without colon separators
    Ascii,
}

/// A device tree property naming a partition that holds an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSource {
    pub name: &'static str,
    pub format: MacFormat,
}

/// Storage sources in priority order; the first one that decodes wins
pub static MAC_ADDRESS_SOURCES: [AddressSource; 2] = [
    AddressSource {
        name: "mtd-mac-address",
        format: MacFormat::Binary,
    },
    AddressSource {
        name: "mtd-mac-address-ascii",
        format: MacFormat::Ascii,
    },
];

impl MacFormat {
    pub fn decode(self, mtd: &MtdHandle<'_>, offset: u64) -> Result<MacAddress, MacError> {
        match self {
            MacFormat::Binary => read_binary(mtd, offset),
            MacFormat::Ascii => read_ascii(mtd, offset),
        }
    }
}

/// Read six raw bytes at `offset`
pub fn read_binary(mtd: &MtdHandle<'_>, offset: u64) -> Result<MacAddress, MacError> {
    let mut mac = [0u8; ETH_ALEN];
    mtd.read_exact(offset, &mut mac)?;
    Ok(MacAddress(mac))
}

/// Read a hex-encoded address at `offset`
///
/// The plain 12-digit form is tried first. Only if it does not parse are
/// five more bytes read to try the colon-separated form.
pub fn read_ascii(mtd: &MtdHandle<'_>, offset: u64) -> Result<MacAddress, MacError> {
    let mut buf = [0u8; ASCII_COLON_LEN];
    mtd.read_exact(offset, &mut buf[..ASCII_PLAIN_LEN])?;

    if let Some(mut mac) = parse_hex_plain(&buf[..ASCII_PLAIN_LEN]) {
        if mac[0] == 0 && mac[1] == 0 {
            fixup_short_prefix(&buf[..4], &mut mac);
        }
        return Ok(MacAddress(mac));
    }

    mtd.read_exact(offset + ASCII_PLAIN_LEN as u64, &mut buf[ASCII_PLAIN_LEN..])?;
    parse_hex_colon(&buf).map(MacAddress).ok_or(MacError::Decode)
}

fn parse_hex_digit(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

fn parse_hex_byte(pair: &[u8]) -> Option<u8> {
    Some(parse_hex_digit(pair[0])? << 4 | parse_hex_digit(pair[1])?)
}

/// Parse `XXXXXXXXXXXX`
pub fn parse_hex_plain(text: &[u8]) -> Option<[u8; ETH_ALEN]> {
    if text.len() != ASCII_PLAIN_LEN {
        return None;
    }
    let mut mac = [0u8; ETH_ALEN];
    for (byte, pair) in mac.iter_mut().zip(text.chunks_exact(2)) {
        *byte = parse_hex_byte(pair)?;
    }
    Some(mac)
}

/// Parse `XX:XX:XX:XX:XX:XX`
pub fn parse_hex_colon(text: &[u8]) -> Option<[u8; ETH_ALEN]> {
    if text.len() != ASCII_COLON_LEN {
        return None;
    }
    let mut mac = [0u8; ETH_ALEN];
    for (i, byte) in mac.iter_mut().enumerate() {
        let group = &text[i * 3..i * 3 + 2];
        if i + 1 < ETH_ALEN && text[i * 3 + 2] != b':' {
            return None;
        }
        *byte = parse_hex_byte(group)?;
    }
    Some(mac)
}

// Some boot loaders store the leading 16 bits as a bare 4-digit value.
// Reinterpret those 4 characters as one big-endian u16.
fn fixup_short_prefix(text: &[u8], mac: &mut [u8; ETH_ALEN]) {
    let prefix = match text.get(..4) {
        Some(prefix) => prefix,
        None => return,
    };
    if let (Some(hi), Some(lo)) = (parse_hex_byte(&prefix[..2]), parse_hex_byte(&prefix[2..])) {
        let value = u16::from_be_bytes([hi, lo]);
        mac[..2].copy_from_slice(&value.to_be_bytes());
    }
}

/// Open the partition described by `partition`
///
/// The partition is looked up by its `label`, falling back to the node name
/// without unit address.
pub fn open_partition<'m, T: ConfigTree + ?Sized>(
    tree: &T,
    mtds: &'m MtdTable,
    partition: NodeId,
) -> Result<MtdHandle<'m>, MacError> {
    let name = match tree.read_string(partition, LABEL_PROP) {
        Ok(label) => label,
        Err(_) => base_name(tree.node_name(partition).ok_or(MacError::StorageUnavailable)?),
    };
    mtds.get_device_nm(name).map_err(|e| {
        log::debug!("mtd: cannot open partition \"{}\": {}", name, e);
        MacError::StorageUnavailable
    })
}

fn read_source<T: ConfigTree + ?Sized>(
    tree: &T,
    mtds: &MtdTable,
    node: NodeId,
    source: &AddressSource,
) -> Result<MacAddress, MacError> {
    let (phandle, offset) = tree.read_u32_pair(node, source.name)?;
    // Phandle 0 never names a node, whatever the tree implementation says
    if phandle == 0 {
        return Err(MacError::NotConfigured);
    }
    let partition = tree
        .find_node_by_phandle(phandle)
        .ok_or(MacError::NotConfigured)?;

    // Handle is released when it goes out of scope, on every path
    let mtd = open_partition(tree, mtds, partition)?;
    source.format.decode(&mtd, offset as u64)
}

/// Bump one byte of `mac` as configured on `node`
pub fn apply_increment<T: ConfigTree + ?Sized>(
    tree: &T,
    node: NodeId,
    mac: &mut MacAddress,
) -> Result<(), MacError> {
    let index = tree
        .read_u32(node, INCREMENT_BYTE_PROP)
        .unwrap_or(DEFAULT_INCREMENT_BYTE);
    if index as usize >= ETH_ALEN {
        return Err(MacError::IncrementIndex(index));
    }

    if let Ok(increment) = tree.read_u32(node, INCREMENT_PROP) {
        let byte = &mut mac.0[index as usize];
        *byte = byte.wrapping_add(increment as u8);
    }
    Ok(())
}

/// Cache `mac` on `node` as its `mac-address` property
///
/// An existing property is overwritten in place; otherwise a new one is
/// attached.
pub fn store_mac_address<T: ConfigTree + ?Sized>(
    tree: &mut T,
    node: NodeId,
    mac: MacAddress,
) -> Result<MacAddress, MacError> {
    if let Some(slot) = tree.property_mut(node, MAC_ADDRESS_PROP) {
        let slot = slot
            .get_mut(..ETH_ALEN)
            .ok_or(MacError::Tree(TreeError::BadLength))?;
        slot.copy_from_slice(&mac.0);
        return Ok(mac);
    }

    tree.add_property(node, MAC_ADDRESS_PROP, &mac.0)?;
    Ok(mac)
}

/// Resolve the MAC address of `node` from the partitions it references
///
/// Storage sources are tried in [`MAC_ADDRESS_SOURCES`] order; a source that
/// is missing, cannot be opened or does not decode is skipped. Once a source
/// decodes, an increment, validation or cache failure ends the search.
pub fn of_get_mac_address_mtd<T: ConfigTree + ?Sized>(
    tree: &mut T,
    mtds: &MtdTable,
    node: NodeId,
) -> Result<MacAddress, MacError> {
    let mut last_error = MacError::NotConfigured;
    let mut found = None;

    for source in MAC_ADDRESS_SOURCES.iter() {
        match read_source(tree, mtds, node, source) {
            Ok(mac) => {
                found = Some((source, mac));
                break;
            }
            Err(MacError::NotConfigured) => {}
            Err(e) => {
                log::debug!("{}: {} skipped: {}", tree.node_name(node).unwrap_or("?"), source.name, e);
                last_error = e;
            }
        }
    }

    let (source, mut mac) = found.ok_or(last_error)?;
    apply_increment(tree, node, &mut mac)?;

    if !mac.is_valid() {
        log::warn!(
            "{}: {} yields invalid address {}",
            tree.node_name(node).unwrap_or("?"),
            source.name,
            mac
        );
        return Err(MacError::InvalidAddress);
    }

    let mac = store_mac_address(tree, node, mac).map_err(|e| {
        log::warn!("{}: cannot cache mac-address: {}", tree.node_name(node).unwrap_or("?"), e);
        e
    })?;
    log::info!("{}: MAC {} from {}", tree.node_name(node).unwrap_or("?"), mac, source.name);
    Ok(mac)
}
