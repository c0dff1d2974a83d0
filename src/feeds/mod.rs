//! Provider feed normalizers
//!
//! Each cloud provider publishes its ranges in its own document shape. The
//! parsers here turn an already-downloaded document into [`RangeRecord`]s
//! plus the feed's publication time. Nothing here touches the network.
//!
//! A document whose top-level shape is wrong fails with
//! [`IndexError::Feed`]. Individual rows that cannot be parsed are skipped
//! with a warning and counted in [`Feed::skipped`].
//!
//! # Example
//!
//! ```rust
//! use cloudiplookup::feeds::{self, FeedKind};
//! use cloudiplookup::IndexBuilder;
//!
//! let doc = r#"{"result": {"ipv4_cidrs": ["173.245.48.0/20"], "ipv6_cidrs": []}}"#;
//! let feed = feeds::parse(FeedKind::Cloudflare, doc)?;
//!
//! let mut builder = IndexBuilder::new();
//! feed.apply(&mut builder)?;
//! let index = builder.build()?;
//! assert!(index.lookup("173.245.50.1")?.is_match());
//! # Ok::<(), cloudiplookup::IndexError>(())
//! ```

mod aws;
mod azure;
mod cloudflare;
mod digitalocean;
mod google;
mod oracle;

use crate::builder::IndexBuilder;
use crate::error::{IndexError, Result};
use crate::file_reader;
use crate::record::RangeRecord;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Format every normalized timestamp is rendered in
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Known provider documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedKind {
    /// AWS `ip-ranges.json`
    Aws,
    /// Azure Service Tags JSON
    Azure,
    /// Cloudflare API `ips` response
    Cloudflare,
    /// DigitalOcean geo CSV
    DigitalOcean,
    /// Google Cloud `cloud.json`
    GoogleCloud,
    /// Google `goog.json`
    GoogleServices,
    /// Googlebot `googlebot.json`
    Googlebot,
    /// Google `special-crawlers.json`
    GoogleSpecialCrawlers,
    /// Google `user-triggered-fetchers.json`
    GoogleUserTriggered,
    /// Cloudflare API `ips?networks=jdcloud` response
    JdCloud,
    /// Oracle `public_ip_ranges.json`
    Oracle,
}

impl FeedKind {
    /// Every kind, in providers-file key order
    pub const ALL: [FeedKind; 11] = [
        FeedKind::Aws,
        FeedKind::Azure,
        FeedKind::Cloudflare,
        FeedKind::DigitalOcean,
        FeedKind::GoogleCloud,
        FeedKind::GoogleServices,
        FeedKind::Googlebot,
        FeedKind::GoogleSpecialCrawlers,
        FeedKind::GoogleUserTriggered,
        FeedKind::JdCloud,
        FeedKind::Oracle,
    ];

    /// Key of this feed in the providers file
    pub fn config_key(self) -> &'static str {
        match self {
            FeedKind::Aws => "AWS",
            FeedKind::Azure => "AZURE",
            FeedKind::Cloudflare => "CLOUDFLARE",
            FeedKind::DigitalOcean => "DIGITALOCEAN",
            FeedKind::GoogleCloud => "GOOGLECLOUD",
            FeedKind::GoogleServices => "GOOGLESERVICES",
            FeedKind::Googlebot => "GOOGLEBOT",
            FeedKind::GoogleSpecialCrawlers => "GOOGLESSPECIALCRAWLERS",
            FeedKind::GoogleUserTriggered => "GOOGLESUSERTRIGGERED",
            FeedKind::JdCloud => "JDCLOUD",
            FeedKind::Oracle => "ORACLE",
        }
    }

    /// Provider name stamped on every record from this feed
    pub fn provider(self) -> &'static str {
        match self {
            FeedKind::Aws => "AWS",
            FeedKind::Azure => "Azure",
            FeedKind::Cloudflare => "Cloudflare",
            FeedKind::DigitalOcean => "Digital Ocean",
            FeedKind::GoogleCloud => "Google Cloud Platform",
            FeedKind::GoogleServices
            | FeedKind::Googlebot
            | FeedKind::GoogleSpecialCrawlers
            | FeedKind::GoogleUserTriggered => "Google",
            FeedKind::JdCloud => "JD Cloud",
            FeedKind::Oracle => "Oracle Cloud",
        }
    }

    /// Human-readable feed name, distinct even where providers are shared
    pub fn label(self) -> &'static str {
        match self {
            FeedKind::Aws => "AWS",
            FeedKind::Azure => "Azure",
            FeedKind::Cloudflare => "Cloudflare",
            FeedKind::DigitalOcean => "Digital Ocean",
            FeedKind::GoogleCloud => "Google Cloud",
            FeedKind::GoogleServices => "Google Services",
            FeedKind::Googlebot => "Google Bot",
            FeedKind::GoogleSpecialCrawlers => "Google Special Crawlers",
            FeedKind::GoogleUserTriggered => "Google User Triggered Fetchers",
            FeedKind::JdCloud => "JD Cloud",
            FeedKind::Oracle => "Oracle Cloud",
        }
    }

    /// Parse a document of this kind
    pub fn parse(self, text: &str) -> Result<Feed> {
        let mut rows = Rows::new(self);
        let last_updated = match self {
            FeedKind::Aws => aws::parse(text, &mut rows)?,
            FeedKind::Azure => azure::parse(text, &mut rows)?,
            FeedKind::Cloudflare | FeedKind::JdCloud => cloudflare::parse(text, &mut rows)?,
            FeedKind::DigitalOcean => digitalocean::parse(text, &mut rows)?,
            FeedKind::GoogleCloud => google::parse_cloud(text, &mut rows)?,
            FeedKind::GoogleServices
            | FeedKind::Googlebot
            | FeedKind::GoogleSpecialCrawlers
            | FeedKind::GoogleUserTriggered => google::parse_services(text, &mut rows)?,
            FeedKind::Oracle => oracle::parse(text, &mut rows)?,
        };
        Ok(rows.finish(last_updated))
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for FeedKind {
    type Err = IndexError;

    /// Accepts providers-file keys in any case, with `-` and `_` ignored
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        FeedKind::ALL
            .into_iter()
            .find(|kind| kind.config_key() == wanted)
            .ok_or_else(|| IndexError::Feed(format!("unknown feed kind {:?}", s)))
    }
}

/// Where a feed came from and when it was published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfo {
    /// Document kind
    pub kind: FeedKind,
    /// Provider name used in records and statistics
    pub provider: String,
    /// Publication time, normalized when the provider's format is known
    pub last_updated: Option<String>,
}

/// A normalized provider document
#[derive(Debug, Clone)]
pub struct Feed {
    /// Source description
    pub info: FeedInfo,
    /// Ranges in document order
    pub records: Vec<RangeRecord>,
    /// Rows that were dropped as malformed
    pub skipped: usize,
}

impl Feed {
    /// Add this feed's records and timestamp to a builder
    pub fn apply(self, builder: &mut IndexBuilder) -> Result<()> {
        if let Some(when) = &self.info.last_updated {
            builder.set_last_updated(&self.info.provider, when);
            builder.set_feed_updated(self.info.kind.label(), when);
        }
        builder.extend(self.records)
    }
}

/// Parse a provider document held in memory
pub fn parse(kind: FeedKind, text: &str) -> Result<Feed> {
    kind.parse(text)
}

/// Parse a provider document from disk; `.gz` files are decompressed
pub fn parse_file<P: AsRef<Path>>(kind: FeedKind, path: P) -> Result<Feed> {
    let path = path.as_ref();
    let text = file_reader::read_to_string(path)?;
    let feed = kind.parse(&text)?;
    tracing::info!(
        feed = %kind,
        path = %path.display(),
        records = feed.records.len(),
        skipped = feed.skipped,
        last_updated = feed.info.last_updated.as_deref().unwrap_or(""),
        "parsed feed"
    );
    Ok(feed)
}

/// Apply several feeds in [`FeedKind::ALL`] order
///
/// When feeds disagree about a start address the later kind wins, so the
/// same documents always build the same index whatever order they came in.
/// Feeds of the same kind keep their relative order.
pub fn apply_all(mut feeds: Vec<Feed>, builder: &mut IndexBuilder) -> Result<()> {
    feeds.sort_by_key(|feed| feed.info.kind);
    for feed in feeds {
        feed.apply(builder)?;
    }
    Ok(())
}

/// Render `raw` as `YYYY-MM-DD HH:MM:SS` if it matches `format`, else keep it
pub fn normalize_timestamp(raw: &str, format: &str) -> String {
    NaiveDateTime::parse_from_str(raw, format)
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Deserialize a whole JSON document, mapping shape errors to `Feed`
pub(crate) fn document<T: DeserializeOwned>(kind: FeedKind, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| IndexError::Feed(format!("{} document: {}", kind, e)))
}

/// Deserialize one row, or skip it with a warning
pub(crate) fn row<T: DeserializeOwned>(rows: &mut Rows, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            rows.skip(format_args!("malformed row: {}", e));
            None
        }
    }
}

/// Accumulates records for one feed
pub(crate) struct Rows {
    kind: FeedKind,
    records: Vec<RangeRecord>,
    skipped: usize,
}

impl Rows {
    fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            skipped: 0,
        }
    }

    /// Add a range given as CIDR text; bad CIDRs are skipped
    pub(crate) fn push(&mut self, cidr: &str, service: &str, region: &str, features: &str) {
        match RangeRecord::from_cidr(cidr.trim(), self.kind.provider(), service, region) {
            Ok(record) => self.records.push(record.with_features(features)),
            Err(e) => self.skip(format_args!("{:?}: {}", cidr, e)),
        }
    }

    pub(crate) fn skip(&mut self, reason: fmt::Arguments<'_>) {
        self.skipped += 1;
        tracing::warn!(feed = %self.kind, "skipping {}", reason);
    }

    pub(crate) fn kind(&self) -> FeedKind {
        self.kind
    }

    fn finish(self, last_updated: Option<String>) -> Feed {
        Feed {
            info: FeedInfo {
                kind: self.kind,
                provider: self.kind.provider().to_string(),
                last_updated,
            },
            records: self.records,
            skipped: self.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("aws".parse::<FeedKind>().unwrap(), FeedKind::Aws);
        assert_eq!("AZURE".parse::<FeedKind>().unwrap(), FeedKind::Azure);
        assert_eq!(
            "google-cloud".parse::<FeedKind>().unwrap(),
            FeedKind::GoogleCloud
        );
        assert_eq!("jd_cloud".parse::<FeedKind>().unwrap(), FeedKind::JdCloud);
        assert!(matches!(
            "linode".parse::<FeedKind>(),
            Err(IndexError::Feed(_))
        ));
    }

    #[test]
    fn test_every_kind_roundtrips_through_its_key() {
        for kind in FeedKind::ALL {
            assert_eq!(kind.config_key().parse::<FeedKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2024-05-21-19-13-07", "%Y-%m-%d-%H-%M-%S"),
            "2024-05-21 19:13:07"
        );
        assert_eq!(
            normalize_timestamp("2024-05-21T14:53:31.295", "%Y-%m-%dT%H:%M:%S%.f"),
            "2024-05-21 14:53:31"
        );
        assert_eq!(
            normalize_timestamp("yesterday", "%Y-%m-%d-%H-%M-%S"),
            "yesterday"
        );
    }

    #[test]
    fn test_rows_skip_bad_cidr() {
        let mut rows = Rows::new(FeedKind::Aws);
        rows.push("3.5.140.0/22", "AMAZON", "ap-northeast-2", "");
        rows.push("3.5.140.0/99", "AMAZON", "ap-northeast-2", "");
        rows.push("garbage", "AMAZON", "ap-northeast-2", "");
        let feed = rows.finish(None);
        assert_eq!(feed.records.len(), 1);
        assert_eq!(feed.skipped, 2);
        assert_eq!(feed.info.provider, "AWS");
    }

    #[test]
    fn test_apply_sets_last_updated() {
        let feed = parse(
            FeedKind::Cloudflare,
            r#"{"result": {"ipv4_cidrs": ["104.16.0.0/13"], "ipv6_cidrs": ["2606:4700::/32"]}}"#,
        )
        .unwrap();
        let mut feed = feed;
        feed.info.last_updated = Some("2024-01-01 00:00:00".to_string());

        let mut builder = IndexBuilder::new();
        feed.apply(&mut builder).unwrap();
        let index = builder.build().unwrap();
        let stats = &index.provider_stats()["Cloudflare"];
        assert_eq!(stats.total_networks, 2);
        assert_eq!(stats.last_updated.as_deref(), Some("2024-01-01 00:00:00"));
    }

    #[test]
    fn test_google_feeds_keep_their_own_dates() {
        let doc = |time: &str, cidr: &str| {
            format!(
                r#"{{"creationTime": "{}", "prefixes": [{{"ipv4Prefix": "{}"}}]}}"#,
                time, cidr
            )
        };
        let bot = parse(
            FeedKind::Googlebot,
            &doc("2024-05-20T10:00:00.000", "66.249.64.0/27"),
        )
        .unwrap();
        let services = parse(
            FeedKind::GoogleServices,
            &doc("2024-05-21T11:30:00.000", "8.8.4.0/24"),
        )
        .unwrap();

        let mut builder = IndexBuilder::new();
        apply_all(vec![bot, services], &mut builder).unwrap();
        let index = builder.build().unwrap();

        let feeds = &index.metadata().feeds;
        assert_eq!(feeds["Google Bot"], "2024-05-20 10:00:00");
        assert_eq!(feeds["Google Services"], "2024-05-21 11:30:00");
        assert_eq!(index.provider_stats()["Google"].total_networks, 2);
    }

    #[test]
    fn test_apply_all_is_order_independent() {
        let aws = parse(
            FeedKind::Aws,
            r#"{"prefixes": [{"ip_prefix": "129.146.0.0/21", "region": "us-east-1", "service": "EC2"}], "ipv6_prefixes": []}"#,
        )
        .unwrap();
        let oracle = parse(
            FeedKind::Oracle,
            r#"{"last_updated_timestamp": "2024-05-21T00:00:00.000000", "regions": [{"region": "us-phoenix-1", "cidrs": [{"cidr": "129.146.0.0/21", "tags": ["OCI"]}]}]}"#,
        )
        .unwrap();

        let mut forward = IndexBuilder::new();
        apply_all(vec![aws.clone(), oracle.clone()], &mut forward).unwrap();
        let mut reverse = IndexBuilder::new();
        apply_all(vec![oracle, aws], &mut reverse).unwrap();

        let forward = forward.build().unwrap();
        let reverse = reverse.build().unwrap();
        assert_eq!(forward, reverse);
        let hit = forward.lookup("129.146.1.1").unwrap();
        assert_eq!(hit.as_match().unwrap().provider, "Oracle Cloud");
    }
}
