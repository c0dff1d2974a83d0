//! AWS `ip-ranges.json`

use super::{document, normalize_timestamp, row, Rows};
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

const CREATE_DATE_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "createDate", default)]
    create_date: Option<String>,
    prefixes: Vec<Value>,
    ipv6_prefixes: Vec<Value>,
}

#[derive(Deserialize)]
struct Prefix {
    #[serde(alias = "ipv6_prefix")]
    ip_prefix: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    network_border_group: String,
}

impl Prefix {
    /// Local Zone ranges are reported under their border group
    fn effective_region(&self) -> &str {
        if self.network_border_group.is_empty() {
            &self.region
        } else {
            &self.network_border_group
        }
    }
}

pub(super) fn parse(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    for value in doc.prefixes.into_iter().chain(doc.ipv6_prefixes) {
        if let Some(prefix) = row::<Prefix>(rows, value) {
            rows.push(&prefix.ip_prefix, &prefix.service, prefix.effective_region(), "");
        }
    }
    Ok(doc
        .create_date
        .map(|raw| normalize_timestamp(&raw, CREATE_DATE_FORMAT)))
}

#[cfg(test)]
mod tests {
    use crate::feeds::{parse, FeedKind};

    const DOC: &str = r#"{
        "syncToken": "1716318788",
        "createDate": "2024-05-21-19-13-08",
        "prefixes": [
            {"ip_prefix": "3.2.34.0/26", "region": "af-south-1", "service": "AMAZON", "network_border_group": "af-south-1"},
            {"ip_prefix": "15.230.221.0/24", "region": "us-east-1", "service": "AMAZON", "network_border_group": "us-east-1-dfw-2"},
            {"region": "us-east-1", "service": "AMAZON"}
        ],
        "ipv6_prefixes": [
            {"ipv6_prefix": "2600:1ff2:4000::/40", "region": "us-west-2", "service": "S3", "network_border_group": "us-west-2"}
        ]
    }"#;

    #[test]
    fn test_parse() {
        let feed = parse(FeedKind::Aws, DOC).unwrap();
        assert_eq!(feed.records.len(), 3);
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.info.last_updated.as_deref(), Some("2024-05-21 19:13:08"));

        let first = &feed.records[0];
        assert_eq!(first.cidr(), "3.2.34.0/26");
        assert_eq!(first.provider, "AWS");
        assert_eq!(first.service, "AMAZON");
        assert_eq!(first.region, "af-south-1");

        assert_eq!(feed.records[1].region, "us-east-1-dfw-2");
        assert_eq!(feed.records[2].cidr(), "2600:1ff2:4000::/40");
        assert_eq!(feed.records[2].service, "S3");
    }

    #[test]
    fn test_wrong_shape() {
        assert!(parse(FeedKind::Aws, r#"{"prefixes": []}"#).is_err());
        assert!(parse(FeedKind::Aws, "not json").is_err());
    }
}
