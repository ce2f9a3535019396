// Network interface configuration

pub mod mac;
pub mod mtd_mac;
pub mod of_net;

// Re-export commonly used types
pub use mac::{format_mac, MacAddress};
pub use mtd_mac::{of_get_mac_address_mtd, AddressSource, MAC_ADDRESS_SOURCES};
pub use of_net::{of_get_mac_address, of_get_mac_address_with, MacSources};
