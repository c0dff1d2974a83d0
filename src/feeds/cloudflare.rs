//! Cloudflare API `ips` responses, including the JD Cloud network list

use super::{document, FeedKind, Rows};
use crate::error::Result;
use serde::Deserialize;

#[derive(Deserialize)]
struct Document {
    result: ResultBody,
}

#[derive(Deserialize)]
struct ResultBody {
    #[serde(default)]
    ipv4_cidrs: Vec<String>,
    #[serde(default)]
    ipv6_cidrs: Vec<String>,
    #[serde(default)]
    jdcloud_cidrs: Vec<String>,
}

/// Region stamped on JD Cloud ranges
const JD_CLOUD_REGION: &str = "China";

/// The API response is generated on request and carries no publication time
pub(super) fn parse(text: &str, rows: &mut Rows) -> Result<Option<String>> {
    let doc: Document = document(rows.kind(), text)?;
    let body = doc.result;
    if rows.kind() == FeedKind::JdCloud {
        for cidr in &body.jdcloud_cidrs {
            rows.push(cidr, "", JD_CLOUD_REGION, "");
        }
    } else {
        for cidr in body.ipv4_cidrs.iter().chain(&body.ipv6_cidrs) {
            rows.push(cidr, "", "", "");
        }
    }
    Ok(None)
}
