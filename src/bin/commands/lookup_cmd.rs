use anyhow::{Context, Result};
use cloudiplookup::{snapshot, LookupEngine, LookupResult, Settings};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::cli_utils::{format_number, snapshot_path, split_addresses};

pub fn cmd_lookup(
    settings: &Settings,
    addresses: Vec<String>,
    csv: bool,
    db: Option<PathBuf>,
) -> Result<()> {
    let path = snapshot_path(settings, db);
    let started = Instant::now();
    let index = snapshot::load_file(&path).with_context(|| {
        format!(
            "Failed to load snapshot {} (run `cloudiplookup build` to create it)",
            path.display()
        )
    })?;
    let engine = LookupEngine::new(index).context("Lookup engine failed to warm up")?;
    tracing::info!(
        "Cloud IP Lookup v{} is ready! loaded with {} networks in {:.5} seconds",
        cloudiplookup::VERSION,
        format_number(engine.current().len() as u64),
        started.elapsed().as_secs_f64()
    );

    let queries = split_addresses(&addresses);
    let results = engine.lookup_many(&queries)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if csv {
        write_csv(&mut out, &results)?;
    } else {
        for result in &results {
            writeln!(out, "{}", serde_json::to_string_pretty(&result.to_json())?)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// One CSV row per result, no header
fn write_csv<W: Write>(out: W, results: &[LookupResult]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    for result in results {
        let [ip, cidr, region, provider, service, features] = result.columns();
        let elapsed = format!("{:.9}", result.elapsed.as_secs_f64());
        writer.write_record([ip, cidr, region, provider, service, features, elapsed.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudiplookup::{build, RangeRecord};

    #[test]
    fn test_write_csv() {
        let index = build(vec![
            RangeRecord::from_cidr("3.3.3.0/24", "AWS", "S3", "us-east-1").unwrap(),
            RangeRecord::from_cidr("13.69.40.0/24", "Azure", "AzureStorage", "westeurope")
                .unwrap()
                .with_features("API, NSG"),
        ])
        .unwrap();
        let results = vec![
            index.lookup("3.3.3.5").unwrap(),
            index.lookup("13.69.40.1").unwrap(),
            index.lookup("bogus").unwrap(),
        ];

        let mut buf = Vec::new();
        write_csv(&mut buf, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("3.3.3.5,3.3.3.0/24,us-east-1,AWS,S3,,"));
        assert!(lines[1].contains(",\"API, NSG\","));
        assert!(lines[2].starts_with("bogus,,,<invalid ip address>,,,"));
    }
}
