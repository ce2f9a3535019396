// RAM-backed partition

use super::Mtd;
use crate::error::MtdError;
use alloc::vec::Vec;

/// Partition whose contents live in memory
#[derive(Debug, Clone)]
pub struct RamMtd {
    data: Vec<u8>,
}

impl RamMtd {
    pub fn new(data: Vec<u8>) -> Self {
        RamMtd { data }
    }

    /// Erased partition of `size` bytes (all 0xFF, as flash reads after erase)
    pub fn erased(size: usize) -> Self {
        RamMtd {
            data: alloc::vec![0xFF; size],
        }
    }

    /// Overwrite bytes starting at `offset`, growing the image if needed
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0xFF);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }
}

impl Mtd for RamMtd {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, MtdError> {
        let start = usize::try_from(offset).map_err(|_| MtdError::OutOfBounds)?;
        if start > self.data.len() {
            return Err(MtdError::OutOfBounds);
        }
        let n = core::cmp::min(buf.len(), self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}
