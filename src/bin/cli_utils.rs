use anyhow::{bail, Context, Result};
use cloudiplookup::{FeedKind, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber
///
/// `RUST_LOG` wins when set; otherwise `--debug` and `--verbose` raise the
/// default `warn` level.
pub fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cloudiplookup={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings from the environment, with `--data-dir` applied
pub fn settings(data_dir: Option<PathBuf>) -> Settings {
    let settings = Settings::from_env();
    match data_dir {
        Some(dir) => settings.with_data_dir(dir),
        None => settings,
    }
}

/// Snapshot path from `--db`, or the data directory default
pub fn snapshot_path(settings: &Settings, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| settings.snapshot_path())
}

/// Split `KIND=PATH`
pub fn parse_feed_arg(arg: &str) -> Result<(FeedKind, PathBuf)> {
    let Some((kind, path)) = arg.split_once('=') else {
        bail!("feed must be given as KIND=PATH, got {:?}", arg);
    };
    if path.is_empty() {
        bail!("feed {:?} has an empty path", arg);
    }
    let kind = kind
        .parse::<FeedKind>()
        .with_context(|| format!("in --feed {:?}", arg))?;
    Ok((kind, PathBuf::from(path)))
}

/// Flatten arguments like `["1.1.1.1,8.8.8.8", " 9.9.9.9 "]` into addresses
pub fn split_addresses(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
