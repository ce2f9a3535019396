// Ethernet MAC address value
//
// The unicast/multicast/broadcast predicates come from smoltcp's
// EthernetAddress so the rules match what the network stack enforces.

use core::fmt;
use smoltcp::wire::EthernetAddress;

/// Length of an Ethernet hardware address
pub const ETH_ALEN: usize = 6;

/// 6-byte Ethernet hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; ETH_ALEN]);

impl MacAddress {
    pub const fn new(octets: [u8; ETH_ALEN]) -> Self {
        MacAddress(octets)
    }

    /// Build from a slice that must be exactly 6 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; ETH_ALEN] = bytes.try_into().ok()?;
        Some(MacAddress(octets))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ETH_ALEN]
    }

    /// Group bit set; the broadcast address is also multicast
    pub fn is_multicast(&self) -> bool {
        EthernetAddress(self.0).is_multicast()
    }

    pub fn is_broadcast(&self) -> bool {
        EthernetAddress(self.0).is_broadcast()
    }

    pub fn is_locally_administered(&self) -> bool {
        EthernetAddress(self.0).is_local()
    }

    /// Usable as an interface address: not 00:00:00:00:00:00 and not multicast
    pub fn is_valid(&self) -> bool {
        !self.is_zero() && EthernetAddress(self.0).is_unicast()
    }
}

impl From<MacAddress> for EthernetAddress {
    fn from(mac: MacAddress) -> Self {
        EthernetAddress(mac.0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Format MAC address as string
pub fn format_mac(mac: [u8; ETH_ALEN]) -> alloc::string::String {
    alloc::format!("{}", MacAddress(mac))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_broadcast() {
        assert!(!MacAddress::new([0; 6]).is_valid());
        assert!(!MacAddress::new([0xff; 6]).is_valid());
        assert!(MacAddress::new([0xff; 6]).is_broadcast());
    }

    #[test]
    fn test_rejects_multicast() {
        let mac = MacAddress::new([0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
        assert!(mac.is_multicast());
        assert!(!mac.is_valid());

        // Group bit lives in the low bit of the first octet
        assert!(!MacAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]).is_valid());
        assert!(MacAddress::new([0x10, 0x22, 0x33, 0x44, 0x55, 0x66]).is_valid());
    }

    #[test]
    fn test_accepts_unicast() {
        assert!(MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]).is_valid());
        let local = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert!(local.is_valid());
        assert!(local.is_locally_administered());
    }

    #[test]
    fn test_from_slice_needs_six_bytes() {
        assert_eq!(MacAddress::from_slice(&[1, 2, 3, 4, 5, 6]), Some(MacAddress::new([1, 2, 3, 4, 5, 6])));
        assert_eq!(MacAddress::from_slice(&[1, 2, 3]), None);
    }

    #[test]
    fn test_converts_to_ethernet_address() {
        let addr = EthernetAddress::from(MacAddress::new([0x10, 0x22, 0x33, 0x44, 0x55, 0x66]));
        assert_eq!(addr, EthernetAddress([0x10, 0x22, 0x33, 0x44, 0x55, 0x66]));
        assert!(addr.is_unicast());
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac([0xaa, 0xbb, 0xcc, 0x0d, 0x0e, 0x0f]), "aa:bb:cc:0d:0e:0f");
    }
}
