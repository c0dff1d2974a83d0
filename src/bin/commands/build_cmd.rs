use anyhow::{bail, Context, Result};
use cloudiplookup::{feeds, file_reader, snapshot, IndexBuilder, OverlapPolicy, RangeRecord, Settings};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli_utils::{format_number, parse_feed_arg};

pub fn cmd_build(
    settings: &Settings,
    feed_args: Vec<String>,
    records: Option<PathBuf>,
    output: Option<PathBuf>,
    reject_overlaps: bool,
) -> Result<()> {
    if feed_args.is_empty() && records.is_none() {
        bail!("nothing to build: give at least one --feed KIND=PATH or --records FILE");
    }

    let started = Instant::now();
    let policy = if reject_overlaps {
        OverlapPolicy::Reject
    } else {
        OverlapPolicy::Accept
    };
    let mut builder = IndexBuilder::new().with_overlap_policy(policy);
    builder.set_metadata("generator", format!("cloudiplookup {}", cloudiplookup::VERSION));

    let mut parsed = Vec::with_capacity(feed_args.len());
    for arg in &feed_args {
        let (kind, path) = parse_feed_arg(arg)?;
        let feed = feeds::parse_file(kind, &path)
            .with_context(|| format!("Failed to parse {} feed {}", kind, path.display()))?;
        println!(
            "  {:<24} {:>8} networks{}",
            kind.to_string(),
            format_number(feed.records.len() as u64),
            if feed.skipped > 0 {
                format!(" ({} rows skipped)", feed.skipped)
            } else {
                String::new()
            }
        );
        parsed.push(feed);
    }
    // Kind order, not argument order
    feeds::apply_all(parsed, &mut builder).context("Invalid feed record")?;

    if let Some(path) = &records {
        let count = add_jsonl(&mut builder, path)?;
        println!("  {:<24} {:>8} networks", path.display().to_string(), format_number(count));
    }

    let index = builder.build().context("Failed to build index")?;
    let output = output.unwrap_or_else(|| settings.snapshot_path());
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    snapshot::save_file(&index, &output)
        .with_context(|| format!("Failed to write snapshot: {}", output.display()))?;

    println!(
        "Built {} networks in {} pages -> {} ({:.2}s)",
        format_number(index.len() as u64),
        index.page_count(),
        output.display(),
        started.elapsed().as_secs_f64()
    );
    if index.metadata().overlapping_ranges > 0 {
        println!(
            "Warning: {} ranges start inside an earlier range",
            index.metadata().overlapping_ranges
        );
    }
    Ok(())
}

/// Add one JSON-encoded [`RangeRecord`] per non-empty line
fn add_jsonl(builder: &mut IndexBuilder, path: &Path) -> Result<u64> {
    let reader = file_reader::open(path)
        .with_context(|| format!("Failed to open records file: {}", path.display()))?;
    let mut count = 0u64;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record: RangeRecord = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), i + 1))?;
        builder
            .add(record)
            .with_context(|| format!("{}:{}: invalid record", path.display(), i + 1))?;
        count += 1;
    }
    Ok(count)
}
