// Partition window over a sector-addressed block device
//
// Byte reads are served sector by sector: the first and last sectors may be
// partial, everything in between is copied whole.

use super::Mtd;
use crate::error::MtdError;

pub const SECTOR_SIZE: usize = 512;

/// Block device that reads whole 512-byte sectors
pub trait SectorDevice: Send {
    fn read_sector(&mut self, sector: u64, buffer: &mut [u8; SECTOR_SIZE]) -> Result<(), &'static str>;
}

/// Byte-addressed partition of `len` bytes starting at `start_sector`
pub struct BlockMtd<D: SectorDevice> {
    device: D,
    start_sector: u64,
    len: u64,
}

impl<D: SectorDevice> BlockMtd<D> {
    pub fn new(device: D, start_sector: u64, len: u64) -> Self {
        BlockMtd {
            device,
            start_sector,
            len,
        }
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: SectorDevice> Mtd for BlockMtd<D> {
    fn size(&self) -> u64 {
        self.len
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, MtdError> {
        if offset > self.len {
            return Err(MtdError::OutOfBounds);
        }
        let wanted = core::cmp::min(buf.len() as u64, self.len - offset) as usize;

        let mut sector_buffer = [0u8; SECTOR_SIZE];
        let mut bytes_read = 0;
        while bytes_read < wanted {
            let pos = offset + bytes_read as u64;
            let sector = self.start_sector + pos / SECTOR_SIZE as u64;
            let within = (pos % SECTOR_SIZE as u64) as usize;

            self.device
                .read_sector(sector, &mut sector_buffer)
                .map_err(MtdError::Io)?;

            let bytes_to_copy = core::cmp::min(SECTOR_SIZE - within, wanted - bytes_read);
            buf[bytes_read..bytes_read + bytes_to_copy]
                .copy_from_slice(&sector_buffer[within..within + bytes_to_copy]);
            bytes_read += bytes_to_copy;
        }

        Ok(bytes_read)
    }
}
