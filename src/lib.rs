// of_mtd_mac - MAC address resolution for device-tree described interfaces
//
// Boards often keep the factory MAC address in a raw flash partition rather
// than in the device tree. This crate finds it: it follows the
// `mtd-mac-address` / `mtd-mac-address-ascii` references of an interface
// node, decodes the stored bytes, applies the configured increment,
// validates the result and caches it back as the node's `mac-address`.
//
// The device tree and the partition layer are reached through the
// `of::ConfigTree` and `mtd::Mtd` traits, so both can be swapped for
// test doubles. `device_tree::DeviceTree` and `mtd::MtdTable` are the
// in-tree implementations.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod device_tree;
pub mod error;
pub mod mtd;
pub mod of;
pub mod system;

pub use error::{MacError, MtdError, TreeError};
pub use system::net::mac::MacAddress;
pub use system::net::of_net::{of_get_mac_address, of_get_mac_address_with, MacSources};
