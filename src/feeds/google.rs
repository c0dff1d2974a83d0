//! Google `cloud.json` and the Google services range lists

use super::{document, normalize_timestamp, row, FeedKind, Rows};
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    creation_time: Option<String>,
    prefixes: Vec<Value>,
}

impl Document {
    fn last_updated(&self) -> Option<String> {
        self.creation_time
            .as_deref()
            .map(|raw| normalize_timestamp(raw, CREATION_TIME_FORMAT))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prefix {
    #[serde(default)]
    ipv4_prefix: Option<String>,
    #[serde(default)]
    ipv6_prefix: Option<String>,
    #[serde(default)]
    service: String,
    #[serde(default)]
    scope: String,
}

impl Prefix {
    fn cidr(&self) -> Option<&str> {
        self.ipv4_prefix.as_deref().or(self.ipv6_prefix.as_deref())
    }
}

/// Service name for the Google services list variants
fn services_name(kind: FeedKind) -> &'static str {
    match kind {
        FeedKind::Googlebot => "Bot",
        FeedKind::GoogleSpecialCrawlers => "Special Crawlers",
        FeedKind::GoogleUserTriggered => "User Triggered Fetchers",
        _ => "Services",
    }
}

fn each_prefix(doc: Document, rows: &mut Rows, mut push: impl FnMut(&mut Rows, &Prefix, &str)) {
    for value in doc.prefixes {
        let Some(prefix) = row::<Prefix>(rows, value) else {
            continue;
        };
        match prefix.cidr() {
            Some(cidr) => push(rows, &prefix, cidr),
            None => rows.skip(format_args!("prefix without ipv4Prefix or ipv6Prefix")),
        }
    }
}

pub(super) fn parse_cloud(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    let last_updated = doc.last_updated();
    each_prefix(doc, rows, |rows, prefix, cidr| {
        rows.push(cidr, &prefix.service, &prefix.scope, "")
    });
    Ok(last_updated)
}

pub(super) fn parse_services(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    let last_updated = doc.last_updated();
    let service = services_name(rows.kind());
    each_prefix(doc, rows, |rows, _, cidr| rows.push(cidr, service, "", ""));
    Ok(last_updated)
}

#[cfg(test)]
mod tests {
    use crate::feeds::{parse, FeedKind};

    #[test]
    fn test_parse_cloud() {
        let doc = r#"{
            "syncToken": "1716320000000",
            "creationTime": "2024-05-21T12:46:54.116",
            "prefixes": [
                {"ipv4Prefix": "34.1.208.0/20", "service": "Google Cloud", "scope": "africa-south1"},
                {"ipv6Prefix": "2600:1900:8000::/44", "service": "Google Cloud", "scope": "us-central1"},
                {"service": "Google Cloud", "scope": "nowhere"}
            ]
        }"#;
        let feed = parse(FeedKind::GoogleCloud, doc).unwrap();
        assert_eq!(feed.records.len(), 2);
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.info.provider, "Google Cloud Platform");
        assert_eq!(feed.info.last_updated.as_deref(), Some("2024-05-21 12:46:54"));
        assert_eq!(feed.records[0].region, "africa-south1");
        assert_eq!(feed.records[0].service, "Google Cloud");
        assert_eq!(feed.records[1].cidr(), "2600:1900:8000::/44");
    }

    #[test]
    fn test_parse_services_variants() {
        let doc = r#"{
            "creationTime": "2024-05-21T14:53:31.000000",
            "prefixes": [{"ipv4Prefix": "66.249.64.0/27"}, {"ipv6Prefix": "2001:4860:4801:10::/64"}]
        }"#;
        let cases = [
            (FeedKind::GoogleServices, "Services"),
            (FeedKind::Googlebot, "Bot"),
            (FeedKind::GoogleSpecialCrawlers, "Special Crawlers"),
            (FeedKind::GoogleUserTriggered, "User Triggered Fetchers"),
        ];
        for (kind, service) in cases {
            let feed = parse(kind, doc).unwrap();
            assert_eq!(feed.records.len(), 2);
            assert!(feed.records.iter().all(|r| r.provider == "Google"));
            assert!(feed.records.iter().all(|r| r.service == service));
            assert!(feed.records.iter().all(|r| r.region.is_empty()));
            assert_eq!(feed.info.last_updated.as_deref(), Some("2024-05-21 14:53:31"));
        }
    }

    #[test]
    fn test_wrong_shape() {
        assert!(parse(FeedKind::GoogleCloud, r#"{"creationTime": "x"}"#).is_err());
    }
}
