//! Cloud IP Lookup - which cloud provider owns this address?
//!
//! Cloud IP Lookup answers "does this IP address fall inside a published
//! cloud provider range, and if so whose, for which service and region?"
//! against tens of thousands of IPv4 and IPv6 ranges, in microseconds.
//!
//! # Quick Start
//!
//! ```rust
//! use cloudiplookup::{build, LookupEngine, RangeRecord};
//!
//! let index = build(vec![
//!     RangeRecord::from_cidr("3.3.3.0/24", "AWS", "S3", "us-east-1")?,
//!     RangeRecord::from_cidr("2400:cb00::/32", "Cloudflare", "", "")?,
//! ])?;
//!
//! let engine = LookupEngine::new(index)?;
//! let result = engine.lookup("3.3.3.5")?;
//! let hit = result.as_match().expect("covered");
//! assert_eq!(hit.cidr, "3.3.3.0/24");
//! assert_eq!(hit.provider, "AWS");
//!
//! assert!(!engine.lookup("3.3.4.1")?.is_match());
//! # Ok::<(), cloudiplookup::IndexError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! provider documents ──feeds──▶ RangeRecord stream
//!                                    │
//!                              IndexBuilder (merge, sort, page, intern)
//!                                    │
//!                                    ▼
//!      snapshot file ◀──save/load──▶ RangeIndex ──▶ LookupEngine (ArcSwap)
//! ```
//!
//! IPv4 and IPv6 ranges share one ascending keyspace: IPv4 values occupy
//! `[0, 2^32)` and IPv6 values `[0, 2^128)` with no offset. Provider IPv6
//! blocks sit far above `2^32`, so the two never interleave in practice.
//! IPv4-mapped IPv6 blocks would collide with IPv4 and are not supported.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// IPv4/IPv6 text to unified integer keys and back
pub mod address;
/// Index construction
pub mod builder;
/// Data directory and provider download locations
pub mod config;
/// Error types
pub mod error;
pub mod feeds;
pub mod file_reader;
/// Paged range index
pub mod index;
pub mod lookup;
/// Normalized range records
pub mod record;
pub mod snapshot;
/// String interning for record attributes
pub mod symbols;

pub use crate::address::{AddressFamily, AddressKey};
pub use crate::builder::{build, IndexBuilder, OverlapPolicy};
pub use crate::config::{ProvidersConfig, Settings};
pub use crate::error::{AddressError, IndexError, Result};
pub use crate::feeds::{Feed, FeedInfo, FeedKind};
pub use crate::index::{Metadata, ProviderStats, RangeIndex, PAGE_SIZE};
pub use crate::lookup::{LookupEngine, LookupOutcome, LookupResult, MissReason, NetworkMatch};
pub use crate::record::RangeRecord;

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
