//! Paged range index
//!
//! All ranges sorted ascending by start address and split into fixed-size
//! pages. A directory holds the first start of every page so a lookup can
//! pick the page with one short binary search before searching inside it.
//!
//! ```text
//! directory:  [ d0        | d1        | d2   ]
//!                 │           │           │
//! pages:      [ s0 .. s999 ][ s1000 .. ][ .. ]   starts (sorted)
//!             [ p0 .. p999 ][ ...       ][ .. ]   prefix lengths
//!             [ f0 .. f999 ][ ...       ][ .. ]   families
//!             [ codes × 4  ][ ...       ][ .. ]   provider/service/region/features
//! ```
//!
//! An index is immutable once built. Updating means building a new one and
//! swapping it in (see [`crate::lookup::LookupEngine`]).

use crate::address::{AddressFamily, AddressKey};
use crate::error::{IndexError, Result};
use crate::record::RangeRecord;
use crate::symbols::SymbolTables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of records per page
pub const PAGE_SIZE: usize = 1000;

/// Aggregate statistics for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStats {
    /// Ranges owned by the provider after merging
    pub total_networks: u64,
    /// IPv4 addresses covered
    #[serde(with = "u128_text")]
    pub total_ipv4_addresses_covered: u128,
    /// IPv6 addresses covered (saturating)
    #[serde(with = "u128_text")]
    pub total_ipv6_addresses_covered: u128,
    /// Feed timestamp, as published by the provider
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Metadata carried with an index
///
/// Lookups never read this; snapshots preserve it verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Per-provider statistics, keyed by provider name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderStats>,
    /// Ranges whose start fell inside an earlier range
    #[serde(default)]
    pub overlapping_ranges: u64,
    /// Publication time per feed label, e.g. "Google Bot"
    #[serde(default)]
    pub feeds: BTreeMap<String, String>,
    /// Free-form caller entries
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// u128 counters are written as decimal strings; JSON numbers stop at u64
mod u128_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One page of records, stored as parallel arrays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub(crate) starts: Vec<u128>,
    pub(crate) families: Vec<AddressFamily>,
    pub(crate) prefix_lengths: Vec<u8>,
    pub(crate) providers: Vec<u32>,
    pub(crate) services: Vec<u32>,
    pub(crate) regions: Vec<u32>,
    pub(crate) features: Vec<u32>,
}

impl Page {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            starts: Vec::with_capacity(capacity),
            families: Vec::with_capacity(capacity),
            prefix_lengths: Vec::with_capacity(capacity),
            providers: Vec::with_capacity(capacity),
            services: Vec::with_capacity(capacity),
            regions: Vec::with_capacity(capacity),
            features: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(
        &mut self,
        start: AddressKey,
        prefix_length: u8,
        provider: u32,
        service: u32,
        region: u32,
        features: u32,
    ) {
        self.starts.push(start.value());
        self.families.push(start.family());
        self.prefix_lengths.push(prefix_length);
        self.providers.push(provider);
        self.services.push(service);
        self.regions.push(region);
        self.features.push(features);
    }

    /// Number of records in the page
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// True for a page with no records
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Start addresses, ascending
    pub fn starts(&self) -> &[u128] {
        &self.starts
    }

    /// Prefix lengths, aligned with [`Page::starts`]
    pub fn prefix_lengths(&self) -> &[u8] {
        &self.prefix_lengths
    }

    /// Tagged start key of a slot
    pub fn start_key(&self, slot: usize) -> Option<AddressKey> {
        AddressKey::new(*self.starts.get(slot)?, *self.families.get(slot)?)
    }
}

/// Immutable paged range index with its symbol tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeIndex {
    pub(crate) directory: Vec<u128>,
    pub(crate) pages: Vec<Page>,
    pub(crate) symbols: SymbolTables,
    pub(crate) metadata: Metadata,
    pub(crate) page_size: usize,
}

impl RangeIndex {
    /// Assemble an index from filled pages, deriving the directory
    pub(crate) fn from_pages(
        pages: Vec<Page>,
        symbols: SymbolTables,
        metadata: Metadata,
        page_size: usize,
    ) -> Self {
        let directory = pages
            .iter()
            .filter_map(|page| page.starts.first().copied())
            .collect();
        Self {
            directory,
            pages,
            symbols,
            metadata,
            page_size,
        }
    }

    /// An index with no ranges; every lookup misses
    pub fn empty() -> Self {
        Self::from_pages(
            Vec::new(),
            SymbolTables::default(),
            Metadata::default(),
            PAGE_SIZE,
        )
    }

    /// First start of every page
    pub fn directory(&self) -> &[u128] {
        &self.directory
    }

    /// All pages in order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Maximum records per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of ranges
    pub fn len(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// True if the index holds no ranges
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Symbol tables that resolve this index's codes
    pub fn symbols(&self) -> &SymbolTables {
        &self.symbols
    }

    /// Build-time metadata
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Per-provider statistics
    pub fn provider_stats(&self) -> &BTreeMap<String, ProviderStats> {
        &self.metadata.providers
    }

    /// Reconstruct the record stored at `(page, slot)`
    pub fn record(&self, page: usize, slot: usize) -> Result<RangeRecord> {
        let p = self
            .pages
            .get(page)
            .ok_or_else(|| IndexError::Format(format!("page {} out of range", page)))?;
        let start = p
            .start_key(slot)
            .ok_or_else(|| IndexError::Format(format!("slot {} out of range", slot)))?;
        Ok(RangeRecord {
            start,
            prefix_length: p.prefix_lengths[slot],
            provider: self.symbols.provider.resolve(p.providers[slot])?.to_string(),
            service: self.symbols.service.resolve(p.services[slot])?.to_string(),
            region: self.symbols.region.resolve(p.regions[slot])?.to_string(),
            features: self.symbols.features.resolve(p.features[slot])?.to_string(),
        })
    }

    /// Every record in ascending start order
    pub fn records(&self) -> impl Iterator<Item = Result<RangeRecord>> + '_ {
        self.pages
            .iter()
            .enumerate()
            .flat_map(move |(pi, page)| (0..page.len()).map(move |slot| self.record(pi, slot)))
    }

    /// Check every structural invariant
    ///
    /// Run on snapshot load so a corrupt index is rejected up front instead
    /// of failing individual lookups later.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(IndexError::Format("page size is zero".to_string()));
        }
        if self.directory.len() != self.pages.len() {
            return Err(IndexError::Format(format!(
                "directory has {} entries for {} pages",
                self.directory.len(),
                self.pages.len()
            )));
        }

        let mut previous: Option<u128> = None;
        for (pi, page) in self.pages.iter().enumerate() {
            let n = page.starts.len();
            if n == 0 || n > self.page_size {
                return Err(IndexError::Format(format!(
                    "page {} holds {} records (page size {})",
                    pi, n, self.page_size
                )));
            }
            // Only the last page may be short
            if n < self.page_size && pi + 1 != self.pages.len() {
                return Err(IndexError::Format(format!("page {} is short", pi)));
            }
            let aligned = [
                page.families.len(),
                page.prefix_lengths.len(),
                page.providers.len(),
                page.services.len(),
                page.regions.len(),
                page.features.len(),
            ];
            if aligned.iter().any(|&len| len != n) {
                return Err(IndexError::Format(format!(
                    "page {} attribute arrays are misaligned",
                    pi
                )));
            }
            if self.directory[pi] != page.starts[0] {
                return Err(IndexError::Format(format!(
                    "directory entry {} does not match page start",
                    pi
                )));
            }

            for slot in 0..n {
                let start = page.starts[slot];
                if let Some(prev) = previous {
                    if start <= prev {
                        return Err(IndexError::Format(format!(
                            "records not strictly ascending at page {} slot {}",
                            pi, slot
                        )));
                    }
                }
                previous = Some(start);

                let family = page.families[slot];
                if AddressKey::new(start, family).is_none() {
                    return Err(IndexError::Format(format!(
                        "{} start out of range at page {} slot {}",
                        family, pi, slot
                    )));
                }
                if page.prefix_lengths[slot] > family.width() {
                    return Err(IndexError::Format(format!(
                        "prefix length {} exceeds {} at page {} slot {}",
                        page.prefix_lengths[slot], family, pi, slot
                    )));
                }

                let checks = [
                    (&self.symbols.provider, page.providers[slot], "provider"),
                    (&self.symbols.service, page.services[slot], "service"),
                    (&self.symbols.region, page.regions[slot], "region"),
                    (&self.symbols.features, page.features[slot], "features"),
                ];
                for (table, code, name) in checks {
                    if !table.contains_code(code) {
                        return Err(IndexError::UnknownCode { table: name, code });
                    }
                }
            }
        }
        Ok(())
    }
}
