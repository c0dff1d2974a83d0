//! Azure Service Tags JSON

use super::{document, row, Rows};
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct Document {
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct ServiceTag {
    properties: Properties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    #[serde(default)]
    system_service: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    address_prefixes: Vec<String>,
    #[serde(default)]
    network_features: Option<Vec<String>>,
}

/// Service Tags carry no publication time of their own
pub(super) fn parse(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    for value in doc.values {
        let Some(tag) = row::<ServiceTag>(rows, value) else {
            continue;
        };
        let props = tag.properties;
        let features = props.network_features.unwrap_or_default().join(", ");
        for cidr in &props.address_prefixes {
            rows.push(cidr, &props.system_service, &props.region, &features);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use crate::feeds::{parse, FeedKind};

    const DOC: &str = r#"{
        "changeNumber": 291,
        "cloud": "Public",
        "values": [
            {
                "name": "AzureStorage.WestEurope",
                "id": "AzureStorage.WestEurope",
                "properties": {
                    "changeNumber": 12,
                    "region": "westeurope",
                    "regionId": 18,
                    "platform": "Azure",
                    "systemService": "AzureStorage",
                    "addressPrefixes": ["13.69.40.0/24", "2a01:111:f100:2000::/52"],
                    "networkFeatures": ["API", "NSG", "UDR"]
                }
            },
            {
                "name": "AzureFrontDoor.Backend",
                "properties": {
                    "region": "",
                    "systemService": "AzureFrontDoor",
                    "addressPrefixes": ["13.73.248.8/29"],
                    "networkFeatures": null
                }
            },
            {"name": "broken"}
        ]
    }"#;

    #[test]
    fn test_parse() {
        let feed = parse(FeedKind::Azure, DOC).unwrap();
        assert_eq!(feed.records.len(), 3);
        assert_eq!(feed.skipped, 1);
        assert_eq!(feed.info.last_updated, None);

        let storage = &feed.records[0];
        assert_eq!(storage.provider, "Azure");
        assert_eq!(storage.service, "AzureStorage");
        assert_eq!(storage.region, "westeurope");
        assert_eq!(storage.features, "API, NSG, UDR");
        assert_eq!(feed.records[1].cidr(), "2a01:111:f100:2000::/52");

        let front_door = &feed.records[2];
        assert_eq!(front_door.region, "");
        assert_eq!(front_door.features, "");
    }

    #[test]
    fn test_wrong_shape() {
        assert!(parse(FeedKind::Azure, r#"{"value": []}"#).is_err());
    }
}
