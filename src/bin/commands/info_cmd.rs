use anyhow::{Context, Result};
use cloudiplookup::{snapshot, Settings};
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::{format_number, snapshot_path};

pub fn cmd_info(settings: &Settings, db: Option<PathBuf>, pretty: bool) -> Result<()> {
    let path = snapshot_path(settings, db);
    let index = snapshot::load_file(&path)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;
    let metadata = index.metadata();

    if pretty {
        for (provider, stats) in &metadata.providers {
            println!(
                "{:.<32}: {:<15} - Last update: {}",
                provider,
                format!("{} networks ", format_number(stats.total_networks)),
                stats.last_updated.as_deref().unwrap_or("unknown")
            );
        }
        for (label, when) in &metadata.feeds {
            println!("{:.<32}: feed published {}", label, when);
        }
        println!(
            "{:.<32}: {} networks in {} pages",
            "Total",
            format_number(index.len() as u64),
            index.page_count()
        );
    } else {
        let output = json!({
            "file": path.display().to_string(),
            "networks": index.len(),
            "pages": index.page_count(),
            "page_size": index.page_size(),
            "overlapping_ranges": metadata.overlapping_ranges,
            "providers": metadata.providers,
            "feeds": metadata.feeds,
            "metadata": metadata.extra,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
