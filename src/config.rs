//! Runtime configuration
//!
//! [`Settings`] locates the data directory and the files inside it.
//! [`ProvidersConfig`] lists where each provider publishes its ranges, as
//! stored in `cloudiplookup.json` in the data directory.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CLOUDIPLOOKUP_DATA_DIR";

/// Data directory used when nothing overrides it
pub const DEFAULT_DATA_DIR: &str = "/var/lib/cloudiplookup/";

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "cloudiplookup.dat.gz";

/// Providers information file name inside the data directory
pub const PROVIDERS_FILE_NAME: &str = "cloudiplookup.json";

/// Where files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding the snapshot and the providers file
    pub data_dir: PathBuf,
    /// Snapshot file name
    pub snapshot_name: String,
    /// Providers information file name
    pub providers_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot_name: SNAPSHOT_FILE_NAME.to_string(),
            providers_name: PROVIDERS_FILE_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Defaults, with the data directory taken from the environment if set
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            if !dir.is_empty() {
                settings.data_dir = PathBuf::from(dir);
            }
        }
        settings
    }

    /// Replace the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Full path of the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_name)
    }

    /// Full path of the providers information file
    pub fn providers_path(&self) -> PathBuf {
        self.data_dir.join(&self.providers_name)
    }
}

/// Download locations for one provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSource {
    /// Direct URL of the ranges document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Page linking to the current document, for providers that rename it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_page: Option<String>,
}

impl ProviderSource {
    fn url(url: &str) -> Self {
        Self {
            download_url: Some(url.to_string()),
            info_page: None,
        }
    }
}

/// Provider key to download locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig {
    providers: BTreeMap<String, ProviderSource>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        let mut put = |key: &str, source: ProviderSource| {
            providers.insert(key.to_string(), source);
        };
        put(
            "AWS",
            ProviderSource::url("https://ip-ranges.amazonaws.com/ip-ranges.json"),
        );
        put(
            "AZURE",
            ProviderSource {
                download_url: None,
                info_page: Some(
                    "https://www.microsoft.com/en-us/download/details.aspx?id=56519".to_string(),
                ),
            },
        );
        put(
            "CLOUDFLARE",
            ProviderSource::url("https://api.cloudflare.com/client/v4/ips"),
        );
        put(
            "DIGITALOCEAN",
            ProviderSource::url("https://digitalocean.com/geo/google.csv"),
        );
        put(
            "GOOGLECLOUD",
            ProviderSource::url("https://www.gstatic.com/ipranges/cloud.json"),
        );
        put(
            "GOOGLESERVICES",
            ProviderSource::url("https://www.gstatic.com/ipranges/goog.json"),
        );
        put(
            "GOOGLEBOT",
            ProviderSource::url(
                "https://developers.google.com/static/search/apis/ipranges/googlebot.json",
            ),
        );
        put(
            "GOOGLESSPECIALCRAWLERS",
            ProviderSource::url(
                "https://developers.google.com/static/search/apis/ipranges/special-crawlers.json",
            ),
        );
        put(
            "GOOGLESUSERTRIGGERED",
            ProviderSource::url(
                "https://developers.google.com/static/search/apis/ipranges/user-triggered-fetchers.json",
            ),
        );
        put(
            "JDCLOUD",
            ProviderSource::url("https://api.cloudflare.com/client/v4/ips?networks=jdcloud"),
        );
        put(
            "ORACLE",
            ProviderSource::url("https://docs.oracle.com/en-us/iaas/tools/public_ip_ranges.json"),
        );
        Self { providers }
    }
}

impl ProvidersConfig {
    /// Parse a providers file
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| IndexError::Format(format!("invalid providers configuration: {}", e)))
    }

    /// Read a providers file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Read the providers file named by `settings`, or fall back to defaults
    /// when it does not exist
    pub fn load_or_default(settings: &Settings) -> Result<Self> {
        let path = settings.providers_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "providers file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Download locations for a provider key such as `"AWS"`
    pub fn get(&self, key: &str) -> Option<&ProviderSource> {
        self.providers.get(key)
    }

    /// All provider keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Number of configured providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True if no provider is configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Pretty JSON, as written to the providers file
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_paths() {
        let settings = Settings::default().with_data_dir("/tmp/cip");
        assert_eq!(
            settings.snapshot_path(),
            PathBuf::from("/tmp/cip/cloudiplookup.dat.gz")
        );
        assert_eq!(
            settings.providers_path(),
            PathBuf::from("/tmp/cip/cloudiplookup.json")
        );
        assert_eq!(Settings::default().data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_default_providers() {
        let config = ProvidersConfig::default();
        assert_eq!(config.len(), 11);
        assert!(config.get("AZURE").unwrap().download_url.is_none());
        assert!(config.get("AZURE").unwrap().info_page.is_some());
        assert!(config
            .get("AWS")
            .unwrap()
            .download_url
            .as_deref()
            .unwrap()
            .ends_with("ip-ranges.json"));
        assert!(config.get("NOPE").is_none());
    }

    #[test]
    fn test_providers_json_shape() {
        let text = r#"{
            "AWS": {"download_url": "https://example.test/aws.json"},
            "AZURE": {"info_page": "https://example.test/azure"}
        }"#;
        let config = ProvidersConfig::from_json(text).unwrap();
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["AWS", "AZURE"]);

        let back = ProvidersConfig::from_json(&config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default().with_data_dir(dir.path());
        assert_eq!(
            ProvidersConfig::load_or_default(&settings).unwrap(),
            ProvidersConfig::default()
        );

        std::fs::write(settings.providers_path(), "[1, 2]").unwrap();
        assert!(ProvidersConfig::load_or_default(&settings).is_err());
    }
}
