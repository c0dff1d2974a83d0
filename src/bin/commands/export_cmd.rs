use anyhow::{Context, Result};
use cloudiplookup::{snapshot, Settings};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::cli_utils::snapshot_path;

pub fn cmd_export(settings: &Settings, db: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let path = snapshot_path(settings, db);
    let index = snapshot::load_file(&path)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;

    let out: Box<dyn Write> = match &output {
        Some(file) => Box::new(
            File::create(file)
                .with_context(|| format!("Failed to create output file: {}", file.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(out);
    for record in index.records() {
        serde_json::to_writer(&mut out, &record?)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
