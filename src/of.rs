// Configuration tree access
//
// The resolver never touches a concrete tree. It goes through ConfigTree,
// which exposes the handful of primitives it needs: property lookup,
// in-place property update, property insertion and phandle resolution.

use crate::error::TreeError;

/// Phandle cell value as stored in the tree
pub type Phandle = u32;

/// Opaque handle to a node in a [`ConfigTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// Key-value view of a device tree
pub trait ConfigTree {
    /// Full node name, including any unit address (`partition@40000`)
    fn node_name(&self, node: NodeId) -> Option<&str>;

    /// Raw property value
    fn property(&self, node: NodeId, name: &str) -> Option<&[u8]>;

    /// Mutable access to an existing property's storage
    fn property_mut(&mut self, node: NodeId, name: &str) -> Option<&mut [u8]>;

    /// Attach a new property to `node`
    ///
    /// Fails with `Exists` if the name is taken and `NoMemory` if the
    /// property storage cannot be allocated.
    fn add_property(&mut self, node: NodeId, name: &str, value: &[u8]) -> Result<(), TreeError>;

    /// Resolve a phandle to the node that declares it
    fn find_node_by_phandle(&self, phandle: Phandle) -> Option<NodeId>;

    /// Read the first big-endian cell of a property
    fn read_u32(&self, node: NodeId, name: &str) -> Result<u32, TreeError> {
        let value = self.property(node, name).ok_or(TreeError::NotFound)?;
        let cell = value.get(..4).ok_or(TreeError::BadLength)?;
        Ok(u32::from_be_bytes([cell[0], cell[1], cell[2], cell[3]]))
    }

    /// Read a property that must be exactly two big-endian cells
    fn read_u32_pair(&self, node: NodeId, name: &str) -> Result<(u32, u32), TreeError> {
        let value = self.property(node, name).ok_or(TreeError::NotFound)?;
        if value.len() != 8 {
            return Err(TreeError::BadLength);
        }
        let first = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
        let second = u32::from_be_bytes([value[4], value[5], value[6], value[7]]);
        Ok((first, second))
    }

    /// Read a NUL-terminated string property
    fn read_string(&self, node: NodeId, name: &str) -> Result<&str, TreeError> {
        let value = self.property(node, name).ok_or(TreeError::NotFound)?;
        let len = value.iter().position(|&b| b == 0).unwrap_or(value.len());
        core::str::from_utf8(&value[..len]).map_err(|_| TreeError::BadLength)
    }
}

/// Node name with the unit address stripped (`partition@40000` -> `partition`)
pub fn base_name(full_name: &str) -> &str {
    match full_name.find('@') {
        Some(at) => &full_name[..at],
        None => full_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_tree::DeviceTree;

    #[test]
    fn test_read_u32_takes_first_cell() {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        tree.set_property(root, "cells", &[0, 0, 0, 7, 0, 0, 0, 9]).unwrap();
        assert_eq!(tree.read_u32(root, "cells"), Ok(7));
        assert_eq!(tree.read_u32(root, "missing"), Err(TreeError::NotFound));

        tree.set_property(root, "short", &[1, 2]).unwrap();
        assert_eq!(tree.read_u32(root, "short"), Err(TreeError::BadLength));
    }

    #[test]
    fn test_read_u32_pair_requires_exact_size() {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        tree.set_property(root, "pair", &[0, 0, 0, 1, 0, 0, 0x10, 0]).unwrap();
        assert_eq!(tree.read_u32_pair(root, "pair"), Ok((1, 0x1000)));

        tree.set_property(root, "triple", &[0; 12]).unwrap();
        assert_eq!(tree.read_u32_pair(root, "triple"), Err(TreeError::BadLength));
    }

    #[test]
    fn test_read_string() {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        tree.set_property(root, "label", b"art\0").unwrap();
        assert_eq!(tree.read_string(root, "label"), Ok("art"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("partition@40000"), "partition");
        assert_eq!(base_name("art"), "art");
    }
}
