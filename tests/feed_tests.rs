//! Provider documents from tests/data through to lookups

use cloudiplookup::{feeds, snapshot, FeedKind, IndexBuilder, IndexError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

#[test]
fn test_parse_fixture_files() {
    let aws = feeds::parse_file(FeedKind::Aws, data("ip-ranges.json")).unwrap();
    assert_eq!(aws.records.len(), 5);
    assert_eq!(aws.skipped, 0);
    assert_eq!(aws.info.provider, "AWS");
    assert_eq!(aws.info.last_updated.as_deref(), Some("2024-05-21 19:13:08"));

    let azure = feeds::parse_file(FeedKind::Azure, data("ServiceTags_Public.json")).unwrap();
    assert_eq!(azure.records.len(), 3);
    assert_eq!(azure.records[0].features, "API, NSG, UDR");
    assert_eq!(azure.records[2].features, "");
    assert!(azure.info.last_updated.is_none());

    let cloudflare = feeds::parse_file(FeedKind::Cloudflare, data("cloudflare-ips.json")).unwrap();
    assert_eq!(cloudflare.records.len(), 4);

    let jd = feeds::parse_file(FeedKind::JdCloud, data("cloudflare-ips.json")).unwrap();
    assert!(jd.records.is_empty());

    let ocean = feeds::parse_file(FeedKind::DigitalOcean, data("digitalocean.csv")).unwrap();
    assert_eq!(ocean.records.len(), 3);
    assert_eq!(ocean.skipped, 1);
}

#[test]
fn test_wrong_document_kind() {
    let err = feeds::parse_file(FeedKind::Aws, data("ServiceTags_Public.json")).unwrap_err();
    assert!(matches!(err, IndexError::Feed(_)));

    let missing = feeds::parse_file(FeedKind::Aws, data("no-such-file.json")).unwrap_err();
    assert!(matches!(missing, IndexError::Io(_)));
}

#[test]
fn test_gzipped_feed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ip-ranges.json.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&std::fs::read(data("ip-ranges.json")).unwrap())
        .unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let feed = feeds::parse_file(FeedKind::Aws, &path).unwrap();
    assert_eq!(feed.records.len(), 5);
}

#[test]
fn test_all_feeds_into_one_snapshot() {
    let mut builder = IndexBuilder::new();
    for (kind, name) in [
        (FeedKind::Aws, "ip-ranges.json"),
        (FeedKind::Azure, "ServiceTags_Public.json"),
        (FeedKind::Cloudflare, "cloudflare-ips.json"),
        (FeedKind::DigitalOcean, "digitalocean.csv"),
    ] {
        feeds::parse_file(kind, data(name))
            .unwrap()
            .apply(&mut builder)
            .unwrap();
    }
    let index = builder.build().unwrap();
    assert_eq!(index.len(), 15);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudiplookup.dat.gz");
    snapshot::save_file(&index, &path).unwrap();
    let index = snapshot::load_file(&path).unwrap();

    let stats = index.provider_stats();
    assert_eq!(stats["AWS"].total_networks, 5);
    assert_eq!(
        stats["AWS"].last_updated.as_deref(),
        Some("2024-05-21 19:13:08")
    );
    assert_eq!(stats["Digital Ocean"].total_networks, 3);

    let checks = [
        ("3.3.3.5", "AWS", "3.3.3.0/24"),
        ("15.230.221.9", "AWS", "15.230.221.0/24"),
        ("13.73.248.10", "Azure", "13.73.248.8/29"),
        ("104.23.255.255", "Cloudflare", "104.16.0.0/13"),
        ("2a03:b0c0:3::dead", "Digital Ocean", "2a03:b0c0:3::/48"),
    ];
    for (addr, provider, cidr) in checks {
        let result = index.lookup(addr).unwrap();
        let m = result.as_match().unwrap();
        assert_eq!(m.provider, provider, "{}", addr);
        assert_eq!(m.cidr, cidr, "{}", addr);
    }
    assert_eq!(
        index
            .lookup("15.230.221.9")
            .unwrap()
            .as_match()
            .unwrap()
            .region,
        "us-east-1-dfw-2"
    );
}
