//! On-disk layout of an index snapshot
//!
//! ```text
//! [Header: SnapshotHeader (64 bytes)]
//! [Directory: page_count × U128]
//! [Records: record_count × RecordEntry (36 bytes)]
//! [Symbol tables: JSON]
//! [Metadata: JSON]
//! ```
//!
//! Every integer is little-endian and every struct is `Unaligned`, so the
//! sections can be viewed in place straight out of a memory map. The header
//! checksum is xxh64 over everything after the header.

use zerocopy::little_endian::{U128, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Magic bytes identifying a snapshot
pub const MAGIC: &[u8; 8] = b"CIPLKSNP";

/// Current snapshot version
pub const VERSION: u32 = 1;

/// Seed for the body checksum
pub const CHECKSUM_SEED: u64 = 0;

/// Snapshot file header (64 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SnapshotHeader {
    /// Magic bytes: "CIPLKSNP"
    pub magic: [u8; 8],
    /// Format version
    pub version: U32,
    /// Maximum records per page
    pub page_size: U32,
    /// Number of pages, and of directory entries
    pub page_count: U32,
    /// Number of record entries
    pub record_count: U32,
    /// Length of the symbol tables JSON
    pub tables_len: U64,
    /// Length of the metadata JSON
    pub metadata_len: U64,
    /// xxh64 of all bytes following the header
    pub checksum: U64,
    /// Reserved, written as zero
    pub reserved: [u8; 16],
}

impl SnapshotHeader {
    pub(crate) fn new(
        page_size: u32,
        page_count: u32,
        record_count: u32,
        tables_len: u64,
        metadata_len: u64,
    ) -> Self {
        Self {
            magic: *MAGIC,
            version: U32::new(VERSION),
            page_size: U32::new(page_size),
            page_count: U32::new(page_count),
            record_count: U32::new(record_count),
            tables_len: U64::new(tables_len),
            metadata_len: U64::new(metadata_len),
            checksum: U64::new(0),
            reserved: [0; 16],
        }
    }
}

/// One record in the records section (36 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RecordEntry {
    /// Start address in the unified keyspace
    pub start: U128,
    /// Prefix length
    pub prefix_length: u8,
    /// Address family tag: 4 or 6
    pub family: u8,
    /// Reserved, written as zero
    pub reserved: [u8; 2],
    /// Provider code
    pub provider: U32,
    /// Service code
    pub service: U32,
    /// Region code
    pub region: U32,
    /// Features code
    pub features: U32,
}

/// Size of the header in bytes
pub const HEADER_SIZE: usize = std::mem::size_of::<SnapshotHeader>();

/// Size of one directory entry in bytes
pub const DIRECTORY_ENTRY_SIZE: usize = std::mem::size_of::<U128>();

/// Size of one record entry in bytes
pub const RECORD_ENTRY_SIZE: usize = std::mem::size_of::<RecordEntry>();
