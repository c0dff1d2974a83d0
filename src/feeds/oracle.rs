//! Oracle `public_ip_ranges.json`

use super::{document, normalize_timestamp, row, Rows};
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    last_updated_timestamp: Option<String>,
    regions: Vec<Value>,
}

#[derive(Deserialize)]
struct Region {
    region: String,
    cidrs: Vec<Value>,
}

#[derive(Deserialize)]
struct Cidr {
    cidr: String,
    #[serde(default)]
    tags: Vec<String>,
}

pub(super) fn parse(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    for value in doc.regions {
        let Some(region) = row::<Region>(rows, value) else {
            continue;
        };
        for value in region.cidrs {
            if let Some(entry) = row::<Cidr>(rows, value) {
                rows.push(&entry.cidr, &entry.tags.join(", "), &region.region, "");
            }
        }
    }
    Ok(doc
        .last_updated_timestamp
        .map(|raw| normalize_timestamp(&raw, TIMESTAMP_FORMAT)))
}

#[cfg(test)]
mod tests {
    use crate::feeds::{parse, FeedKind};

    #[test]
    fn test_parse() {
        let doc = r#"{
            "last_updated_timestamp": "2024-05-20T23:12:34.123456",
            "regions": [
                {
                    "region": "us-phoenix-1",
                    "cidrs": [
                        {"cidr": "129.146.0.0/21", "tags": ["OCI"]},
                        {"cidr": "134.70.16.0/22", "tags": ["OSN", "OBJECT_STORAGE"]},
                        {"tags": ["OCI"]}
                    ]
                },
                {"cidrs": []}
            ]
        }"#;
        let feed = parse(FeedKind::Oracle, doc).unwrap();
        assert_eq!(feed.records.len(), 2);
        assert_eq!(feed.skipped, 2);
        assert_eq!(feed.info.last_updated.as_deref(), Some("2024-05-20 23:12:34"));
        assert_eq!(feed.records[0].provider, "Oracle Cloud");
        assert_eq!(feed.records[0].region, "us-phoenix-1");
        assert_eq!(feed.records[1].service, "OSN, OBJECT_STORAGE");
    }

    #[test]
    fn test_wrong_shape() {
        assert!(parse(FeedKind::Oracle, r#"{"regions": {}}"#).is_err());
    }
}
