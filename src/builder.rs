//! Index builder
//!
//! Turns an unordered stream of [`RangeRecord`]s into an immutable
//! [`RangeIndex`]:
//!
//! 1. merge by start address, last record wins
//! 2. sort ascending by start
//! 3. cut into pages of [`PAGE_SIZE`]
//! 4. intern attributes into the index's own symbol tables
//! 5. derive the directory from each page's first start
//!
//! The builder is the whole build context. Nothing outlives [`IndexBuilder::build`]
//! except the index it returns, and identical input in identical order
//! produces an identical index.

use crate::address::AddressFamily;
use crate::error::{IndexError, Result};
use crate::index::{Metadata, Page, ProviderStats, RangeIndex, PAGE_SIZE};
use crate::record::RangeRecord;
use crate::symbols::SymbolTables;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::Instant;

/// What to do when one range starts inside another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Keep both, count them in metadata and log a warning.
    ///
    /// Lookups then resolve a covered key to the range with the greatest
    /// start not above it, which can miss a key covered only by the outer
    /// range.
    #[default]
    Accept,
    /// Fail the build on the first overlap
    Reject,
}

/// Build context for one [`RangeIndex`]
#[derive(Debug)]
pub struct IndexBuilder {
    /// start value -> most recent record with that start
    merged: FxHashMap<u128, RangeRecord>,
    received: usize,
    page_size: usize,
    overlap_policy: OverlapPolicy,
    last_updated: BTreeMap<String, String>,
    feed_updates: BTreeMap<String, String>,
    extra: BTreeMap<String, String>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    /// Create a builder with the default page size
    pub fn new() -> Self {
        Self {
            merged: FxHashMap::default(),
            received: 0,
            page_size: PAGE_SIZE,
            overlap_policy: OverlapPolicy::default(),
            last_updated: BTreeMap::new(),
            feed_updates: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Override the page size (mainly for tests; must be at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Choose how overlapping ranges are handled
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Record the feed timestamp for a provider
    pub fn set_last_updated(&mut self, provider: impl Into<String>, when: impl Into<String>) {
        self.last_updated.insert(provider.into(), when.into());
    }

    /// Record the publication time of one feed, keyed by its label
    ///
    /// Several feeds may share a provider; this keeps each of their dates.
    pub fn set_feed_updated(&mut self, label: impl Into<String>, when: impl Into<String>) {
        self.feed_updates.insert(label.into(), when.into());
    }

    /// Attach a free-form metadata entry
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Add one record
    ///
    /// A record with the same start as an earlier one replaces it. An
    /// invalid record is returned as an error; callers should abandon the
    /// build rather than skip it.
    pub fn add(&mut self, record: RangeRecord) -> Result<()> {
        record.validate()?;
        self.received += 1;
        self.merged.insert(record.start.value(), record);
        Ok(())
    }

    /// Add many records in order
    pub fn extend<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = RangeRecord>,
    {
        for record in records {
            self.add(record)?;
        }
        Ok(())
    }

    /// Number of distinct start addresses so far
    pub fn len(&self) -> usize {
        self.merged.len()
    }

    /// True if nothing has been added
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    /// Produce the index, consuming the build context
    pub fn build(self) -> Result<RangeIndex> {
        let started = Instant::now();
        let IndexBuilder {
            merged,
            received,
            page_size,
            overlap_policy,
            last_updated,
            feed_updates,
            extra,
        } = self;

        let mut sorted: Vec<RangeRecord> = merged.into_values().collect();
        // Keys are unique after merging, so an unstable sort is deterministic
        sorted.sort_unstable_by_key(|r| r.start.value());
        tracing::debug!(
            received,
            unique = sorted.len(),
            "merged and sorted range records"
        );

        let overlapping_ranges = check_overlaps(&sorted, overlap_policy)?;

        let mut symbols = SymbolTables::default();
        let mut pages = Vec::with_capacity(sorted.len().div_ceil(page_size));
        for chunk in sorted.chunks(page_size) {
            let mut page = Page::with_capacity(chunk.len());
            for r in chunk {
                page.push(
                    r.start,
                    r.prefix_length,
                    symbols.provider.intern(&r.provider)?,
                    symbols.service.intern(&r.service)?,
                    symbols.region.intern(&r.region)?,
                    symbols.features.intern(&r.features)?,
                );
            }
            pages.push(page);
        }

        let metadata = Metadata {
            providers: provider_stats(&sorted, last_updated),
            overlapping_ranges,
            feeds: feed_updates,
            extra,
        };

        let index = RangeIndex::from_pages(pages, symbols, metadata, page_size);
        tracing::info!(
            networks = index.len(),
            pages = index.page_count(),
            providers = index.provider_stats().len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "range index built"
        );
        Ok(index)
    }
}

/// Build an index from records in arrival order
pub fn build<I>(records: I) -> Result<RangeIndex>
where
    I: IntoIterator<Item = RangeRecord>,
{
    let mut builder = IndexBuilder::new();
    builder.extend(records)?;
    builder.build()
}

/// Count ranges whose start lies inside an earlier range
fn check_overlaps(sorted: &[RangeRecord], policy: OverlapPolicy) -> Result<u64> {
    let mut count = 0u64;
    // The widest range seen so far, as (last address, index)
    let mut reach: Option<(u128, usize)> = None;

    for (i, record) in sorted.iter().enumerate() {
        if let Some((last, owner)) = reach {
            if record.start.value() <= last {
                if policy == OverlapPolicy::Reject {
                    return Err(IndexError::OverlappingRanges {
                        first: sorted[owner].cidr(),
                        second: record.cidr(),
                    });
                }
                count += 1;
            }
        }
        let last = record.last_address();
        match reach {
            Some((current, _)) if current >= last => {}
            _ => reach = Some((last, i)),
        }
    }

    if count > 0 {
        tracing::warn!(
            overlapping = count,
            "overlapping ranges accepted; lookups resolve to the nearest preceding start"
        );
    }
    Ok(count)
}

fn provider_stats(
    sorted: &[RangeRecord],
    mut last_updated: BTreeMap<String, String>,
) -> BTreeMap<String, ProviderStats> {
    let mut stats: BTreeMap<String, ProviderStats> = BTreeMap::new();
    for record in sorted {
        let entry = stats.entry(record.provider.clone()).or_default();
        entry.total_networks += 1;
        match record.family() {
            AddressFamily::V4 => {
                entry.total_ipv4_addresses_covered =
                    entry.total_ipv4_addresses_covered.saturating_add(record.size())
            }
            AddressFamily::V6 => {
                entry.total_ipv6_addresses_covered =
                    entry.total_ipv6_addresses_covered.saturating_add(record.size())
            }
        }
    }
    for (provider, entry) in stats.iter_mut() {
        entry.last_updated = last_updated.remove(provider);
    }
    // Timestamps for providers that contributed no ranges are still worth keeping
    for (provider, when) in last_updated {
        stats.insert(
            provider,
            ProviderStats {
                last_updated: Some(when),
                ..ProviderStats::default()
            },
        );
    }
    stats
}
