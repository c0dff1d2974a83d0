use anyhow::{Context, Result};
use cloudiplookup::{ProvidersConfig, Settings};

pub fn cmd_config(settings: &Settings) -> Result<()> {
    let path = settings.providers_path();
    tracing::debug!(path = %path.display(), "providers file location");
    let config = ProvidersConfig::load_or_default(settings)
        .with_context(|| format!("Failed to open information file: {}", path.display()))?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}
