// Device tree storage and Flattened Device Tree (FDT) loader
//
// Nodes live in an arena indexed by NodeId. Phandles declared through
// "phandle" or "linux,phandle" are indexed as properties are stored, so
// find_node_by_phandle is a map lookup.

use crate::error::{FdtError, TreeError};
use crate::of::{ConfigTree, NodeId, Phandle};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

// FDT Magic number (big-endian 0xd00dfeed)
const FDT_MAGIC: u32 = 0xd00dfeed;

// DTB structure tokens
const FDT_BEGIN_NODE: u32 = 0x00000001;
const FDT_END_NODE: u32 = 0x00000002;
const FDT_PROP: u32 = 0x00000003;
const FDT_NOP: u32 = 0x00000004;
const FDT_END: u32 = 0x00000009;

/// Read big-endian u32 from a blob
fn read_be(data: &[u8], offset: usize) -> Result<u32, FdtError> {
    let bytes = data
        .get(offset..offset.checked_add(4).ok_or(FdtError::Truncated)?)
        .ok_or(FdtError::Truncated)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a null-terminated string starting at `offset`
fn read_cstring(data: &[u8], offset: usize) -> Result<&str, FdtError> {
    let tail = data.get(offset..).ok_or(FdtError::Truncated)?;
    let len = tail.iter().position(|&b| b == 0).ok_or(FdtError::Truncated)?;
    core::str::from_utf8(&tail[..len]).map_err(|_| FdtError::BadString)
}

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

fn is_phandle_property(name: &str) -> bool {
    name == "phandle" || name == "linux,phandle"
}

#[derive(Debug, Clone)]
struct Property {
    name: String,
    value: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    properties: Vec<Property>,
}

/// In-memory device tree
#[derive(Debug, Clone)]
pub struct DeviceTree {
    nodes: Vec<Node>,
    phandles: BTreeMap<Phandle, NodeId>,
}

impl DeviceTree {
    /// Create a tree holding only an empty root node
    pub fn new() -> Self {
        let mut tree = DeviceTree {
            nodes: Vec::new(),
            phandles: BTreeMap::new(),
        };
        tree.push_node(None, "");
        tree
    }

    /// Parse a flattened device tree blob
    pub fn from_fdt(blob: &[u8]) -> Result<Self, FdtError> {
        let magic = read_be(blob, 0)?;
        if magic != FDT_MAGIC {
            return Err(FdtError::BadMagic);
        }

        let totalsize = read_be(blob, 4)? as usize;
        let off_dt_struct = read_be(blob, 8)? as usize;
        let off_dt_strings = read_be(blob, 12)? as usize;

        let dtb_data = blob.get(..totalsize).ok_or(FdtError::Truncated)?;
        let struct_data = dtb_data.get(off_dt_struct..).ok_or(FdtError::Truncated)?;
        let strings_data = dtb_data.get(off_dt_strings..).ok_or(FdtError::Truncated)?;

        let mut tree = DeviceTree {
            nodes: Vec::new(),
            phandles: BTreeMap::new(),
        };
        let mut open: Vec<NodeId> = Vec::new();
        let mut offset = 0;

        loop {
            let token = read_be(struct_data, offset)?;
            offset += 4;

            match token {
                FDT_BEGIN_NODE => {
                    // A second top-level node means the root was already closed
                    if open.is_empty() && !tree.nodes.is_empty() {
                        return Err(FdtError::Unbalanced);
                    }
                    let name = read_cstring(struct_data, offset)?;
                    offset = align4(offset + name.len() + 1);
                    let id = tree.push_node(open.last().copied(), name);
                    open.push(id);
                }

                FDT_END_NODE => {
                    open.pop().ok_or(FdtError::Unbalanced)?;
                }

                FDT_PROP => {
                    let len = read_be(struct_data, offset)? as usize;
                    let nameoff = read_be(struct_data, offset + 4)? as usize;
                    offset += 8;

                    let end = offset.checked_add(len).ok_or(FdtError::Truncated)?;
                    let value = struct_data.get(offset..end).ok_or(FdtError::Truncated)?;
                    let name = read_cstring(strings_data, nameoff)?;
                    let node = *open.last().ok_or(FdtError::Unbalanced)?;
                    tree.store_property(node, name, value);

                    offset = align4(end);
                }

                FDT_NOP => {}

                FDT_END => break,

                other => return Err(FdtError::UnknownToken(other)),
            }
        }

        if !open.is_empty() || tree.nodes.is_empty() {
            return Err(FdtError::Unbalanced);
        }

        log::debug!("device tree loaded: {} nodes, {} phandles", tree.nodes.len(), tree.phandles.len());
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Add a child node under `parent`
    pub fn add_node(&mut self, parent: NodeId, name: &str) -> Result<NodeId, TreeError> {
        if parent.0 >= self.nodes.len() {
            return Err(TreeError::BadNode);
        }
        Ok(self.push_node(Some(parent), name))
    }

    /// Insert or replace a property
    pub fn set_property(&mut self, node: NodeId, name: &str, value: &[u8]) -> Result<(), TreeError> {
        if node.0 >= self.nodes.len() {
            return Err(TreeError::BadNode);
        }
        self.store_property(node, name, value);
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Number of properties attached to `node`
    pub fn property_count(&self, node: NodeId) -> usize {
        self.nodes.get(node.0).map(|n| n.properties.len()).unwrap_or(0)
    }

    /// Look up a node by absolute path, e.g. `/soc/ethernet@19000000`
    pub fn find_node_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = *self
                .children(current)
                .iter()
                .find(|&&child| self.nodes[child.0].name == component)?;
        }
        Some(current)
    }

    fn push_node(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: String::from(name),
            parent,
            children: Vec::new(),
            properties: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    // Caller guarantees `node` is in range
    fn store_property(&mut self, node: NodeId, name: &str, value: &[u8]) {
        self.index_phandle(node, name, value);
        let properties = &mut self.nodes[node.0].properties;
        match properties.iter_mut().find(|p| p.name == name) {
            Some(prop) => prop.value = value.to_vec(),
            None => properties.push(Property {
                name: String::from(name),
                value: value.to_vec(),
            }),
        }
    }

    fn index_phandle(&mut self, node: NodeId, name: &str, value: &[u8]) {
        if is_phandle_property(name) && value.len() == 4 {
            let phandle = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
            if phandle != 0 {
                self.phandles.insert(phandle, node);
            }
        }
    }
}

impl Default for DeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTree for DeviceTree {
    fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.name.as_str())
    }

    fn property(&self, node: NodeId, name: &str) -> Option<&[u8]> {
        self.nodes
            .get(node.0)?
            .properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_slice())
    }

    fn property_mut(&mut self, node: NodeId, name: &str) -> Option<&mut [u8]> {
        self.nodes
            .get_mut(node.0)?
            .properties
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| p.value.as_mut_slice())
    }

    fn add_property(&mut self, node: NodeId, name: &str, value: &[u8]) -> Result<(), TreeError> {
        if self.property(node, name).is_some() {
            return Err(TreeError::Exists);
        }
        let target = self.nodes.get_mut(node.0).ok_or(TreeError::BadNode)?;

        // Nothing is attached until every allocation has succeeded
        let mut prop_name = String::new();
        prop_name.try_reserve_exact(name.len()).map_err(|_| TreeError::NoMemory)?;
        prop_name.push_str(name);
        let mut prop_value = Vec::new();
        prop_value.try_reserve_exact(value.len()).map_err(|_| TreeError::NoMemory)?;
        prop_value.extend_from_slice(value);
        target.properties.try_reserve(1).map_err(|_| TreeError::NoMemory)?;

        self.index_phandle(node, name, value);
        self.nodes[node.0].properties.push(Property {
            name: prop_name,
            value: prop_value,
        });
        Ok(())
    }

    fn find_node_by_phandle(&self, phandle: Phandle) -> Option<NodeId> {
        if phandle == 0 {
            return None;
        }
        self.phandles.get(&phandle).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal FDT: / { eth { phandle = <1>; }; }
    fn tiny_blob() -> Vec<u8> {
        let strings = b"phandle\0";
        let mut structure = Vec::new();
        structure.extend_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
        structure.extend_from_slice(&[0, 0, 0, 0]);
        structure.extend_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
        structure.extend_from_slice(b"eth\0");
        structure.extend_from_slice(&FDT_PROP.to_be_bytes());
        structure.extend_from_slice(&4u32.to_be_bytes());
        structure.extend_from_slice(&0u32.to_be_bytes());
        structure.extend_from_slice(&1u32.to_be_bytes());
        structure.extend_from_slice(&FDT_NOP.to_be_bytes());
        structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
        structure.extend_from_slice(&FDT_END_NODE.to_be_bytes());
        structure.extend_from_slice(&FDT_END.to_be_bytes());

        let off_struct = 40u32;
        let off_strings = off_struct + structure.len() as u32;
        let total = off_strings + strings.len() as u32;

        let mut blob = Vec::new();
        for word in [FDT_MAGIC, total, off_struct, off_strings, 0, 17, 16, 0, strings.len() as u32, structure.len() as u32] {
            blob.extend_from_slice(&word.to_be_bytes());
        }
        blob.extend_from_slice(&structure);
        blob.extend_from_slice(strings);
        blob
    }

    #[test]
    fn test_parse_fdt_nodes_and_phandles() {
        let tree = DeviceTree::from_fdt(&tiny_blob()).unwrap();
        let eth = tree.find_node_by_path("/eth").unwrap();
        assert_eq!(tree.node_name(eth), Some("eth"));
        assert_eq!(tree.parent(eth), Some(tree.root()));
        assert_eq!(tree.find_node_by_phandle(1), Some(eth));
        assert_eq!(tree.find_node_by_phandle(0), None);
    }

    #[test]
    fn test_parse_fdt_rejects_bad_magic() {
        let mut blob = tiny_blob();
        blob[0] = 0;
        assert_eq!(DeviceTree::from_fdt(&blob).unwrap_err(), FdtError::BadMagic);
    }

    #[test]
    fn test_parse_fdt_rejects_truncated_blob() {
        let blob = tiny_blob();
        assert_eq!(DeviceTree::from_fdt(&blob[..30]).unwrap_err(), FdtError::Truncated);
    }

    #[test]
    fn test_parse_fdt_rejects_oversized_property() {
        // Length word of the phandle property, 20 bytes into the structure block
        let mut blob = tiny_blob();
        blob[60..64].copy_from_slice(&u32::MAX.to_be_bytes());
        assert_eq!(DeviceTree::from_fdt(&blob).unwrap_err(), FdtError::Truncated);
    }

    #[test]
    fn test_add_property_refuses_duplicates() {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        tree.add_property(root, "mac-address", &[0; 6]).unwrap();
        assert_eq!(tree.add_property(root, "mac-address", &[1; 6]), Err(TreeError::Exists));
        assert_eq!(tree.property_count(root), 1);
    }

    #[test]
    fn test_property_mut_writes_in_place() {
        let mut tree = DeviceTree::new();
        let root = tree.root();
        tree.set_property(root, "mac-address", &[0; 6]).unwrap();
        tree.property_mut(root, "mac-address").unwrap()[5] = 0x42;
        assert_eq!(tree.property(root, "mac-address"), Some(&[0, 0, 0, 0, 0, 0x42][..]));
    }

    #[test]
    fn test_find_node_by_path() {
        let mut tree = DeviceTree::new();
        let soc = tree.add_node(tree.root(), "soc").unwrap();
        let eth = tree.add_node(soc, "ethernet@19000000").unwrap();
        assert_eq!(tree.find_node_by_path("/soc/ethernet@19000000"), Some(eth));
        assert_eq!(tree.find_node_by_path("/soc/ethernet"), None);
        assert_eq!(tree.find_node_by_path("/"), Some(tree.root()));
    }
}
