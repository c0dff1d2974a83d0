//! Snapshot save and load
//!
//! A snapshot persists a [`RangeIndex`] with its symbol tables and
//! metadata so a process can start serving without rebuilding from feeds.
//! `load(save(x))` answers every lookup exactly as `x` does, and saving
//! the same index twice produces identical bytes.
//!
//! Loading is all-or-nothing: any structural problem rejects the snapshot
//! and the caller decides whether to rebuild.
//!
//! # Example
//!
//! ```
//! use cloudiplookup::{build, snapshot, RangeRecord};
//!
//! let index = build(vec![
//!     RangeRecord::from_cidr("3.3.3.0/24", "AWS", "S3", "us-east-1")?,
//! ])?;
//! let bytes = snapshot::save(&index)?;
//! let loaded = snapshot::load(&bytes)?;
//! assert!(loaded.lookup("3.3.3.5")?.is_match());
//! # Ok::<(), cloudiplookup::IndexError>(())
//! ```

pub mod format;

use crate::address::{AddressFamily, AddressKey};
use crate::error::{IndexError, Result};
use crate::file_reader;
use crate::index::{Metadata, Page, RangeIndex};
use crate::symbols::{SymbolTables, SymbolTablesRepr};
use flate2::write::GzEncoder;
use flate2::Compression;
use format::{
    RecordEntry, SnapshotHeader, CHECKSUM_SEED, DIRECTORY_ENTRY_SIZE, HEADER_SIZE, MAGIC,
    RECORD_ENTRY_SIZE, VERSION,
};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use xxhash_rust::xxh64::xxh64;
use zerocopy::little_endian::{U128, U32};
use zerocopy::{FromBytes, IntoBytes, Ref};

fn count_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| IndexError::Format(format!("{} {} does not fit the snapshot header", what, value)))
}

/// Serialize an index to snapshot bytes
pub fn save(index: &RangeIndex) -> Result<Vec<u8>> {
    let record_count = index.len();
    let tables = serde_json::to_vec(&index.symbols().to_repr())?;
    let metadata = serde_json::to_vec(index.metadata())?;

    let mut header = SnapshotHeader::new(
        count_u32(index.page_size(), "page size")?,
        count_u32(index.page_count(), "page count")?,
        count_u32(record_count, "record count")?,
        tables.len() as u64,
        metadata.len() as u64,
    );

    let body_len = index.page_count() * DIRECTORY_ENTRY_SIZE
        + record_count * RECORD_ENTRY_SIZE
        + tables.len()
        + metadata.len();
    let mut buffer = Vec::with_capacity(HEADER_SIZE + body_len);
    buffer.extend_from_slice(header.as_bytes());

    for &start in index.directory() {
        buffer.extend_from_slice(U128::new(start).as_bytes());
    }

    for page in index.pages() {
        for slot in 0..page.len() {
            let entry = RecordEntry {
                start: U128::new(page.starts[slot]),
                prefix_length: page.prefix_lengths[slot],
                family: page.families[slot].tag(),
                reserved: [0; 2],
                provider: U32::new(page.providers[slot]),
                service: U32::new(page.services[slot]),
                region: U32::new(page.regions[slot]),
                features: U32::new(page.features[slot]),
            };
            buffer.extend_from_slice(entry.as_bytes());
        }
    }

    buffer.extend_from_slice(&tables);
    buffer.extend_from_slice(&metadata);

    header.checksum.set(xxh64(&buffer[HEADER_SIZE..], CHECKSUM_SEED));
    buffer[..HEADER_SIZE].copy_from_slice(header.as_bytes());
    Ok(buffer)
}

/// Take `len` bytes from the front of `rest`
fn take<'a>(rest: &mut &'a [u8], len: usize, section: &str) -> Result<&'a [u8]> {
    if rest.len() < len {
        return Err(IndexError::Format(format!(
            "snapshot truncated in {} section: need {} bytes, have {}",
            section,
            len,
            rest.len()
        )));
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}

fn section_len(value: u64, section: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| IndexError::Format(format!("{} section length {} too large", section, value)))
}

/// Read and check the header, returning it with the body that follows
pub fn read_header(bytes: &[u8]) -> Result<(SnapshotHeader, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(IndexError::Format(format!(
            "snapshot too small: {} bytes, need at least {} for header",
            bytes.len(),
            HEADER_SIZE
        )));
    }
    let (header, body) = SnapshotHeader::read_from_prefix(bytes)
        .map_err(|_| IndexError::Format("failed to read snapshot header".to_string()))?;

    if &header.magic != MAGIC {
        return Err(IndexError::Format("bad magic bytes".to_string()));
    }
    if header.version.get() != VERSION {
        return Err(IndexError::UnsupportedVersion(header.version.get()));
    }
    Ok((header, body))
}

/// Deserialize and fully validate snapshot bytes
pub fn load(bytes: &[u8]) -> Result<RangeIndex> {
    let (header, body) = read_header(bytes)?;

    let actual = xxh64(body, CHECKSUM_SEED);
    if actual != header.checksum.get() {
        return Err(IndexError::Checksum {
            expected: header.checksum.get(),
            actual,
        });
    }

    let page_size = header.page_size.get() as usize;
    let page_count = header.page_count.get() as usize;
    let record_count = header.record_count.get() as usize;
    if page_size == 0 {
        return Err(IndexError::Format("page size is zero".to_string()));
    }
    if page_count != record_count.div_ceil(page_size) {
        return Err(IndexError::Format(format!(
            "{} records cannot fill {} pages of {}",
            record_count, page_count, page_size
        )));
    }

    let mut rest = body;
    let directory_bytes = take(&mut rest, page_count * DIRECTORY_ENTRY_SIZE, "directory")?;
    let record_bytes = take(&mut rest, record_count * RECORD_ENTRY_SIZE, "records")?;
    let tables_bytes = take(
        &mut rest,
        section_len(header.tables_len.get(), "tables")?,
        "tables",
    )?;
    let metadata_bytes = take(
        &mut rest,
        section_len(header.metadata_len.get(), "metadata")?,
        "metadata",
    )?;
    if !rest.is_empty() {
        return Err(IndexError::Format(format!(
            "{} trailing bytes after metadata",
            rest.len()
        )));
    }

    let directory = Ref::<_, [U128]>::from_prefix_with_elems(directory_bytes, page_count)
        .map_err(|_| IndexError::Format("failed to read directory".to_string()))?
        .0;
    let directory: Vec<u128> = directory.iter().map(|k| k.get()).collect();

    let entries = Ref::<_, [RecordEntry]>::from_prefix_with_elems(record_bytes, record_count)
        .map_err(|_| IndexError::Format("failed to read records".to_string()))?
        .0;

    let mut pages = Vec::with_capacity(page_count);
    for chunk in entries.chunks(page_size) {
        let mut page = Page::with_capacity(chunk.len());
        for entry in chunk {
            let family = AddressFamily::from_tag(entry.family).ok_or_else(|| {
                IndexError::Format(format!("unknown address family tag {}", entry.family))
            })?;
            let start = AddressKey::new(entry.start.get(), family).ok_or_else(|| {
                IndexError::Format(format!("{} start {:#x} out of range", family, entry.start.get()))
            })?;
            page.push(
                start,
                entry.prefix_length,
                entry.provider.get(),
                entry.service.get(),
                entry.region.get(),
                entry.features.get(),
            );
        }
        pages.push(page);
    }

    let repr: SymbolTablesRepr = serde_json::from_slice(tables_bytes)?;
    let symbols = SymbolTables::from_repr(repr)?;
    let metadata: Metadata = serde_json::from_slice(metadata_bytes)?;

    let index = RangeIndex {
        directory,
        pages,
        symbols,
        metadata,
        page_size,
    };
    index.validate()?;
    Ok(index)
}

/// Write a snapshot to `path`, gzip-compressed when it ends in `.gz`
///
/// The file is written beside the target and renamed into place, so a
/// reader never opens a half-written snapshot.
pub fn save_file<P: AsRef<Path>>(index: &RangeIndex, path: P) -> Result<()> {
    let path = path.as_ref();
    let started = Instant::now();
    let bytes = save(index)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let file = File::create(&tmp)?;
    if file_reader::has_gz_extension(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&bytes)?;
        encoder.finish()?.sync_all()?;
    } else {
        let mut file = file;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        networks = index.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "saved snapshot"
    );
    Ok(())
}

/// Load and validate a snapshot from `path`
///
/// `.gz` files are decompressed into memory; anything else is memory-mapped.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<RangeIndex> {
    let path = path.as_ref();
    let started = Instant::now();

    let index = if file_reader::has_gz_extension(path) {
        let mut bytes = Vec::new();
        file_reader::open(path)?.read_to_end(&mut bytes)?;
        load(&bytes)?
    } else {
        let file = File::open(path)?;
        // SAFETY: the map is only read during `load`, which copies what it
        // keeps; a concurrent writer can at worst fail the checksum.
        let mmap = unsafe { Mmap::map(&file) }?;
        load(&mmap[..])?
    };

    tracing::info!(
        path = %path.display(),
        networks = index.len(),
        pages = index.page_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded snapshot"
    );
    Ok(index)
}
