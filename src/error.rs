// Error types
//
// One enum per collaborator plus `MacError` for the resolver itself.
// Collaborator errors convert into `MacError` so resolution code can use `?`.

use core::fmt;

/// Configuration tree errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Property (or node) not present
    NotFound,
    /// Property present but its length does not fit the requested format
    BadLength,
    /// Property with this name already exists on the node
    Exists,
    /// Allocation for a new property failed
    NoMemory,
    /// Node id does not belong to this tree
    BadNode,
}

/// Storage partition errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtdError {
    /// No partition registered under the requested name
    NoDevice,
    /// Read starts beyond the end of the partition
    OutOfBounds,
    /// Device returned fewer bytes than requested
    ShortRead,
    /// Underlying device failure
    Io(&'static str),
}

/// Flattened device tree blob errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    /// Header magic is not 0xd00dfeed
    BadMagic,
    /// Header or block offsets point past the end of the blob
    Truncated,
    /// Structure block contains a token we do not know
    UnknownToken(u32),
    /// END_NODE without matching BEGIN_NODE, or END before the root closed
    Unbalanced,
    /// Node or property name is not valid UTF-8
    BadString,
}

/// MAC resolution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacError {
    /// Source property missing or malformed
    NotConfigured,
    /// Partition could not be opened
    StorageUnavailable,
    /// Partition read failed
    Storage(MtdError),
    /// Bytes read could not be decoded in any supported format
    Decode,
    /// `mtd-mac-address-increment-byte` is greater than 5
    IncrementIndex(u32),
    /// Decoded address is zero, multicast or broadcast
    InvalidAddress,
    /// Cache property could not be allocated
    NoMemory,
    /// Cache property could not be written
    Tree(TreeError),
    /// Every configured source failed
    NotFound,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::NotFound => write!(f, "property not found"),
            TreeError::BadLength => write!(f, "property has unexpected length"),
            TreeError::Exists => write!(f, "property already exists"),
            TreeError::NoMemory => write!(f, "out of memory"),
            TreeError::BadNode => write!(f, "invalid node"),
        }
    }
}

impl fmt::Display for MtdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtdError::NoDevice => write!(f, "no such mtd device"),
            MtdError::OutOfBounds => write!(f, "read beyond end of partition"),
            MtdError::ShortRead => write!(f, "short read"),
            MtdError::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdtError::BadMagic => write!(f, "invalid device tree magic"),
            FdtError::Truncated => write!(f, "device tree blob truncated"),
            FdtError::UnknownToken(t) => write!(f, "unknown DTB token {:#x}", t),
            FdtError::Unbalanced => write!(f, "unbalanced node tokens"),
            FdtError::BadString => write!(f, "name is not valid UTF-8"),
        }
    }
}

impl fmt::Display for MacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacError::NotConfigured => write!(f, "source not configured"),
            MacError::StorageUnavailable => write!(f, "partition unavailable"),
            MacError::Storage(e) => write!(f, "partition read failed: {}", e),
            MacError::Decode => write!(f, "stored bytes are not a MAC address"),
            MacError::IncrementIndex(idx) => write!(f, "increment byte {} out of range", idx),
            MacError::InvalidAddress => write!(f, "invalid ethernet address"),
            MacError::NoMemory => write!(f, "out of memory"),
            MacError::Tree(e) => write!(f, "device tree: {}", e),
            MacError::NotFound => write!(f, "no MAC address found"),
        }
    }
}

impl From<MtdError> for MacError {
    fn from(e: MtdError) -> Self {
        match e {
            MtdError::NoDevice => MacError::StorageUnavailable,
            other => MacError::Storage(other),
        }
    }
}

impl From<TreeError> for MacError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::NoMemory => MacError::NoMemory,
            TreeError::NotFound | TreeError::BadLength => MacError::NotConfigured,
            other => MacError::Tree(other),
        }
    }
}
