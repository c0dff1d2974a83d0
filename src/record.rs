//! Range records
//!
//! A [`RangeRecord`] is one network range plus the attributes describing who
//! owns it. Feed normalizers produce them; the index builder consumes them.

use crate::address::{self, AddressFamily, AddressKey};
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// One normalized network range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    /// First address of the range
    pub start: AddressKey,
    /// Prefix length (0-32 for IPv4, 0-128 for IPv6)
    pub prefix_length: u8,
    /// Owning organization, e.g. "AWS"
    #[serde(default)]
    pub provider: String,
    /// Service within the provider, e.g. "S3"
    #[serde(default)]
    pub service: String,
    /// Region or scope, e.g. "us-east-1"
    #[serde(default)]
    pub region: String,
    /// Comma-separated feature tags (Azure network features)
    #[serde(default)]
    pub features: String,
}

impl RangeRecord {
    /// Create a record from an already-encoded start address
    pub fn new(
        start: AddressKey,
        prefix_length: u8,
        provider: impl Into<String>,
        service: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            start,
            prefix_length,
            provider: provider.into(),
            service: service.into(),
            region: region.into(),
            features: String::new(),
        }
    }

    /// Create a record from CIDR text such as `"3.3.3.0/24"`
    pub fn from_cidr(
        cidr: &str,
        provider: impl Into<String>,
        service: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let (start, prefix_length) = address::parse_cidr(cidr)?;
        Ok(Self::new(start, prefix_length, provider, service, region))
    }

    /// Attach network feature tags
    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = features.into();
        self
    }

    /// Address family of the range
    pub fn family(&self) -> AddressFamily {
        self.start.family()
    }

    /// Last address covered, inclusive
    pub fn last_address(&self) -> u128 {
        address::last_address(self.start, self.prefix_length)
    }

    /// Number of addresses covered
    pub fn size(&self) -> u128 {
        address::range_size(self.prefix_length, self.family())
    }

    /// CIDR text, `start/prefix`
    pub fn cidr(&self) -> String {
        format!("{}/{}", address::decode(self.start), self.prefix_length)
    }

    /// Check structural validity
    ///
    /// Records failing this abort the whole build.
    pub fn validate(&self) -> Result<()> {
        let width = self.family().width();
        if self.prefix_length > width {
            return Err(IndexError::InvalidRecord(format!(
                "{} prefix length {} exceeds {}",
                self.family(),
                self.prefix_length,
                width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cidr() {
        let rec = RangeRecord::from_cidr("3.3.3.0/24", "AWS", "S3", "us-east-1").unwrap();
        assert_eq!(rec.prefix_length, 24);
        assert_eq!(rec.cidr(), "3.3.3.0/24");
        assert_eq!(rec.size(), 256);
        assert!(rec.features.is_empty());
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn test_validate_prefix_too_long() {
        let rec = RangeRecord::new(AddressKey::v4(0), 33, "x", "", "");
        assert!(matches!(rec.validate(), Err(IndexError::InvalidRecord(_))));

        let rec = RangeRecord::new(AddressKey::v6(0), 129, "x", "", "");
        assert!(rec.validate().is_err());

        let rec = RangeRecord::new(AddressKey::v6(0), 128, "x", "", "");
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn test_from_cidr_rejects_garbage() {
        assert!(RangeRecord::from_cidr("nope/24", "x", "", "").is_err());
        assert!(RangeRecord::from_cidr("10.0.0.0/40", "x", "", "").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let rec = RangeRecord::from_cidr("2400:cb00::/32", "Cloudflare", "", "")
            .unwrap()
            .with_features("API, Edge");
        let json = serde_json::to_string(&rec).unwrap();
        let back: RangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
