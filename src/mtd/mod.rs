// Storage partitions (MTD)
//
// A partition is anything that can serve offset-based reads. Partitions are
// registered by name in an `MtdTable`; `MtdTable::get_device_nm` hands
// out an `MtdHandle` that counts as one user of the partition until it is
// dropped.

pub mod block;
pub mod ram;

pub use block::{BlockMtd, SectorDevice, SECTOR_SIZE};
pub use ram::RamMtd;

use crate::error::MtdError;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

/// Offset-addressed read-only storage
///
/// Reads are blocking. A read that starts inside the partition but runs past
/// its end returns the bytes that exist; callers needing an exact length use
/// [`MtdHandle::read_exact`].
pub trait Mtd: Send {
    /// Partition size in bytes
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes at `offset`, returning the count read
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, MtdError>;
}

struct MtdPartition {
    name: String,
    device: Mutex<Box<dyn Mtd>>,
    use_count: AtomicUsize,
}

/// Named partition registry
pub struct MtdTable {
    partitions: Vec<MtdPartition>,
}

impl MtdTable {
    pub const fn new() -> Self {
        MtdTable {
            partitions: Vec::new(),
        }
    }

    /// Register a partition under `name`
    pub fn add_partition<M: Mtd + 'static>(&mut self, name: &str, device: M) {
        log::debug!("mtd: registered partition \"{}\" ({} bytes)", name, device.size());
        self.partitions.push(MtdPartition {
            name: String::from(name),
            device: Mutex::new(Box::new(device)),
            use_count: AtomicUsize::new(0),
        });
    }

    /// Open a partition by name
    pub fn get_device_nm(&self, name: &str) -> Result<MtdHandle<'_>, MtdError> {
        let partition = self
            .partitions
            .iter()
            .find(|p| p.name == name)
            .ok_or(MtdError::NoDevice)?;
        partition.use_count.fetch_add(1, Ordering::AcqRel);
        Ok(MtdHandle { partition })
    }

    /// Number of live handles on `name`, if it exists
    pub fn use_count(&self, name: &str) -> Option<usize> {
        self.partitions
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.use_count.load(Ordering::Acquire))
    }
}

impl Default for MtdTable {
    fn default() -> Self {
        Self::new()
    }
}

/// An open partition; released when dropped
pub struct MtdHandle<'a> {
    partition: &'a MtdPartition,
}

impl<'a> MtdHandle<'a> {
    pub fn name(&self) -> &str {
        &self.partition.name
    }

    pub fn size(&self) -> u64 {
        self.partition.device.lock().size()
    }

    pub fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize, MtdError> {
        self.partition.device.lock().read(offset, buf)
    }

    /// Read exactly `buf.len()` bytes or fail
    pub fn read_exact(&self, offset: u64, buf: &mut [u8]) -> Result<(), MtdError> {
        let retlen = self.read(offset, buf)?;
        if retlen != buf.len() {
            log::debug!(
                "mtd: short read on \"{}\" at {:#x}: {} of {} bytes",
                self.name(),
                offset,
                retlen,
                buf.len()
            );
            return Err(MtdError::ShortRead);
        }
        Ok(())
    }
}

impl Drop for MtdHandle<'_> {
    fn drop(&mut self) {
        self.partition.use_count.fetch_sub(1, Ordering::AcqRel);
    }
}
