//! Lookup engine
//!
//! Point-in-range queries against a [`RangeIndex`]:
//!
//! 1. encode the address text (bad text is a miss, not an error)
//! 2. binary search the directory for the rightmost page start <= key
//! 3. binary search that page for the rightmost record start <= key
//! 4. check `key <= start + size - 1`
//!
//! Cost is O(log P + log S) for P pages of at most S records.
//!
//! [`LookupEngine`] holds the current index behind an [`ArcSwap`] so any
//! number of threads can query while a rebuilt index is published with a
//! single pointer swap.

use crate::address::{self, AddressKey};
use crate::error::Result;
use crate::index::RangeIndex;
use arc_swap::ArcSwap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Address probed once when an engine starts, to fault in the index
const WARM_UP_ADDRESS: &str = "255.255.255.255";

/// A range containing the queried address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkMatch {
    /// Containing range as `start/prefix`
    pub cidr: String,
    /// Owning provider
    pub provider: String,
    /// Service within the provider
    pub service: String,
    /// Region or scope
    pub region: String,
    /// Network feature tags
    pub features: String,
}

/// Why a lookup found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissReason {
    /// The query is neither an IPv4 nor an IPv6 address
    InvalidAddress,
    /// No range contains the address
    NotFound,
}

impl MissReason {
    /// Placeholder shown in the provider column for a miss
    pub fn placeholder(&self) -> &'static str {
        match self {
            MissReason::InvalidAddress => "<invalid ip address>",
            MissReason::NotFound => "<not found in database>",
        }
    }
}

/// Match or miss
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The address is inside a known range
    Match(NetworkMatch),
    /// The address is not inside any known range
    Miss(MissReason),
}

/// Result of one lookup, including how long it took
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// The query text as given
    pub ip: String,
    /// Match or miss
    pub outcome: LookupOutcome,
    /// Wall-clock time spent; informational only
    pub elapsed: Duration,
}

impl LookupResult {
    /// True when a range contains the address
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, LookupOutcome::Match(_))
    }

    /// The matched range, if any
    pub fn as_match(&self) -> Option<&NetworkMatch> {
        match &self.outcome {
            LookupOutcome::Match(m) => Some(m),
            LookupOutcome::Miss(_) => None,
        }
    }

    /// The miss reason, if any
    pub fn miss_reason(&self) -> Option<MissReason> {
        match &self.outcome {
            LookupOutcome::Match(_) => None,
            LookupOutcome::Miss(reason) => Some(*reason),
        }
    }

    /// Elapsed time formatted as `"0.000012345 sec"`
    pub fn elapsed_text(&self) -> String {
        format!("{:.9} sec", self.elapsed.as_secs_f64())
    }

    /// Column values: ip, cidr, region, cloud_provider, service, network_features
    pub fn columns(&self) -> [&str; 6] {
        match &self.outcome {
            LookupOutcome::Match(m) => [
                &self.ip,
                &m.cidr,
                &m.region,
                &m.provider,
                &m.service,
                &m.features,
            ],
            LookupOutcome::Miss(reason) => [&self.ip, "", "", reason.placeholder(), "", ""],
        }
    }

    /// JSON object in the shape the command line prints
    pub fn to_json(&self) -> serde_json::Value {
        let [ip, cidr, region, provider, service, features] = self.columns();
        json!({
            "ip": ip,
            "cidr": cidr,
            "region": region,
            "cloud_provider": provider,
            "service": service,
            "network_features": features,
            "elapsed_time": self.elapsed_text(),
        })
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            LookupOutcome::Match(m) => write!(
                f,
                "{} in {} ({}, {}, {})",
                self.ip, m.cidr, m.provider, m.service, m.region
            ),
            LookupOutcome::Miss(reason) => write!(f, "{} {}", self.ip, reason.placeholder()),
        }
    }
}

/// Index of the rightmost element `<= key`, if any
#[inline]
fn rightmost_le(sorted: &[u128], key: u128) -> Option<usize> {
    // Invariant: sorted[..lo] <= key, sorted[hi..] > key
    let mut lo = 0usize;
    let mut hi = sorted.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if sorted[mid] <= key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo.checked_sub(1)
}

impl RangeIndex {
    /// Locate the record with the greatest start `<= key`
    ///
    /// Returns `(page, slot)`. Containment is not checked.
    pub fn find_candidate(&self, key: u128) -> Option<(usize, usize)> {
        let page = rightmost_le(&self.directory, key)?;
        let slot = rightmost_le(self.pages[page].starts(), key)?;
        Some((page, slot))
    }

    /// Look up an already-encoded key
    ///
    /// Errors only if the index references a symbol code its tables lack,
    /// which a validated index never does.
    pub fn lookup_key(&self, key: AddressKey) -> Result<LookupOutcome> {
        let Some((pi, slot)) = self.find_candidate(key.value()) else {
            return Ok(LookupOutcome::Miss(MissReason::NotFound));
        };
        let page = &self.pages[pi];
        let Some(start) = page.start_key(slot) else {
            return Ok(LookupOutcome::Miss(MissReason::NotFound));
        };
        let prefix_length = page.prefix_lengths[slot];

        if key.value() > address::last_address(start, prefix_length) {
            return Ok(LookupOutcome::Miss(MissReason::NotFound));
        }

        Ok(LookupOutcome::Match(NetworkMatch {
            cidr: format!("{}/{}", address::decode(start), prefix_length),
            provider: self.symbols.provider.resolve(page.providers[slot])?.to_string(),
            service: self.symbols.service.resolve(page.services[slot])?.to_string(),
            region: self.symbols.region.resolve(page.regions[slot])?.to_string(),
            features: self.symbols.features.resolve(page.features[slot])?.to_string(),
        }))
    }

    /// Look up an address given as text
    ///
    /// Invalid text yields a [`MissReason::InvalidAddress`] result rather
    /// than an error, so batches keep going past bad input.
    pub fn lookup(&self, text: &str) -> Result<LookupResult> {
        let started = Instant::now();
        let outcome = match address::encode(text) {
            Ok(key) => self.lookup_key(key)?,
            Err(_) => LookupOutcome::Miss(MissReason::InvalidAddress),
        };
        Ok(LookupResult {
            ip: text.to_string(),
            outcome,
            elapsed: started.elapsed(),
        })
    }
}

/// Shared, swappable handle to the current index
///
/// Cloning is cheap and clones observe the same swaps.
#[derive(Clone)]
pub struct LookupEngine {
    current: Arc<ArcSwap<RangeIndex>>,
}

impl LookupEngine {
    /// Start serving `index`
    pub fn new(index: RangeIndex) -> Result<Self> {
        let engine = Self {
            current: Arc::new(ArcSwap::from_pointee(index)),
        };
        engine.warm_up()?;
        Ok(engine)
    }

    fn warm_up(&self) -> Result<()> {
        let result = self.lookup(WARM_UP_ADDRESS)?;
        tracing::debug!(
            networks = self.current.load().len(),
            elapsed = %result.elapsed_text(),
            "lookup engine warmed up"
        );
        Ok(())
    }

    /// Look up one address against the current index
    pub fn lookup(&self, text: &str) -> Result<LookupResult> {
        self.current.load().lookup(text)
    }

    /// Look up many addresses in parallel; results keep input order
    ///
    /// Every query sees the same index even if a swap happens mid-batch.
    pub fn lookup_many<S>(&self, queries: &[S]) -> Result<Vec<LookupResult>>
    where
        S: AsRef<str> + Sync,
    {
        let index = self.current.load_full();
        queries
            .par_iter()
            .map(|q| index.lookup(q.as_ref()))
            .collect()
    }

    /// The index currently being served
    pub fn current(&self) -> Arc<RangeIndex> {
        self.current.load_full()
    }

    /// Atomically replace the served index
    ///
    /// Readers holding the previous `Arc` keep using it until they drop it.
    pub fn publish(&self, index: RangeIndex) -> Arc<RangeIndex> {
        let networks = index.len();
        let previous = self.current.swap(Arc::new(index));
        tracing::info!(
            networks,
            previous_networks = previous.len(),
            "published new range index"
        );
        previous
    }
}

impl fmt::Debug for LookupEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupEngine")
            .field("networks", &self.current.load().len())
            .finish()
    }
}
