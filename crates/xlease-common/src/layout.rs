//! Volume geometry for the lease index.
//!
//! The index lives in the first lease-sized slot of the volume:
//!
//! ```text
//! block       used for
//! ---------------------------------
//! 0-3         metadata
//! 4-503       lease records 0-3999
//! 504-2047    unused
//! ```
//!
//! Block numbers above are for 512-byte blocks. Lease data for record `n`
//! starts at `lease_base + n * lease_size`.

use serde::{Deserialize, Serialize};

/// Default logical block size in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Block size of 4K native devices.
pub const BLOCK_SIZE_4K: usize = 4096;

/// Number of blocks in a lock manager lease.
pub const LEASE_BLOCKS: usize = 2048;

/// Number of blocks reserved for index metadata.
pub const METADATA_BLOCKS: usize = 4;

/// Size of one lease record in bytes.
pub const RECORD_SIZE: usize = 64;

/// Number of lease records in the index.
pub const MAX_RECORDS: usize = 4000;

/// Lease size for the default block size.
pub const LEASE_SIZE: u64 = (LEASE_BLOCKS * BLOCK_SIZE) as u64;

/// The first lease slot holds the index itself.
pub const LEASE_BASE: u64 = LEASE_SIZE;

/// Offset of record 0 for the default block size.
pub const RECORD_BASE: usize = METADATA_BLOCKS * BLOCK_SIZE;

/// Size of the index region for the default block size.
pub const INDEX_SIZE: usize = RECORD_BASE + MAX_RECORDS * RECORD_SIZE;

/// Placeholder lease id stored in free records.
pub const BLANK_UUID: &str = "00000000-0000-0000-0000-000000000000";

const _: () = {
    assert!(RECORD_SIZE.is_power_of_two());
    assert!(BLOCK_SIZE % RECORD_SIZE == 0);
    assert!(INDEX_SIZE % BLOCK_SIZE == 0);
    assert!(INDEX_SIZE <= LEASE_SIZE as usize);
};

/// Zero-based index into the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordNumber(pub u32);

impl RecordNumber {
    /// Returns the record number as a table index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RecordNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record:{}", self.0)
    }
}

/// Byte layout of the index volume for a given block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    block_size: usize,
}

impl Geometry {
    /// Creates the geometry for `block_size` byte blocks.
    ///
    /// # Panics
    ///
    /// Panics if the block size is not a power of two holding whole records.
    pub fn new(block_size: usize) -> Self {
        assert!(block_size.is_power_of_two());
        assert!(block_size >= RECORD_SIZE);
        Self { block_size }
    }

    /// Returns the logical block size.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Size of one lease slot in bytes.
    #[inline]
    pub fn lease_size(&self) -> u64 {
        (LEASE_BLOCKS * self.block_size) as u64
    }

    /// Offset of the lease area; slot 0 is reserved for the index.
    #[inline]
    pub fn lease_base(&self) -> u64 {
        self.lease_size()
    }

    /// Offset of record 0.
    #[inline]
    pub fn record_base(&self) -> usize {
        METADATA_BLOCKS * self.block_size
    }

    /// End of the record table.
    #[inline]
    pub fn index_size(&self) -> usize {
        self.record_base() + MAX_RECORDS * RECORD_SIZE
    }

    /// Size of the in-memory mirror, rounded up to whole blocks.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.index_size().div_ceil(self.block_size) * self.block_size
    }

    /// Byte offset of record `recnum` in the index.
    #[inline]
    pub fn record_offset(&self, recnum: RecordNumber) -> usize {
        debug_assert!(recnum.index() < MAX_RECORDS);
        self.record_base() + recnum.index() * RECORD_SIZE
    }

    /// Record number containing byte `offset` of the record table.
    #[inline]
    pub fn record_number(&self, offset: usize) -> RecordNumber {
        debug_assert!(offset >= self.record_base());
        RecordNumber(((offset - self.record_base()) / RECORD_SIZE) as u32)
    }

    /// Offset of the lease data area for record `recnum`.
    #[inline]
    pub fn lease_offset(&self, recnum: RecordNumber) -> u64 {
        self.lease_base() + recnum.0 as u64 * self.lease_size()
    }

    /// Start of the block containing `offset`.
    #[inline]
    pub fn block_start(&self, offset: usize) -> usize {
        offset - offset % self.block_size
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(BLOCK_SIZE)
    }
}
