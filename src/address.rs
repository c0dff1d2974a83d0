//! Address codec
//!
//! Maps textual IPv4 and IPv6 addresses onto one ordered `u128` keyspace.
//! IPv4 addresses occupy `[0, 2^32)` and IPv6 addresses occupy `[0, 2^128)`
//! with no offset between the two families.
//!
//! # Shared keyspace
//!
//! Sorting both families in one sequence relies on provider IPv6 blocks being
//! numerically far above `2^32`. IPv4-mapped and IPv4-compatible IPv6 blocks
//! (`::ffff:0:0/96`, `::/96`) would collide with the IPv4 sub-range; those
//! never appear in cloud provider feeds and are not handled specially. The
//! family travels with every key so decoding never has to guess.

use crate::error::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Address family of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressFamily {
    /// 32-bit IPv4
    V4,
    /// 128-bit IPv6
    V6,
}

impl AddressFamily {
    /// Address width in bits
    pub const fn width(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    /// On-disk tag
    pub(crate) const fn tag(self) -> u8 {
        match self {
            AddressFamily::V4 => 4,
            AddressFamily::V6 => 6,
        }
    }

    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            4 => Some(AddressFamily::V4),
            6 => Some(AddressFamily::V6),
            _ => None,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// A numeric address tagged with its family
///
/// Ordering is by raw value first; two keys with the same value but
/// different families only arise from the mapped-address collision
/// described in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressKey {
    value: u128,
    family: AddressFamily,
}

impl AddressKey {
    /// IPv4 key
    pub const fn v4(value: u32) -> Self {
        Self {
            value: value as u128,
            family: AddressFamily::V4,
        }
    }

    /// IPv6 key
    pub const fn v6(value: u128) -> Self {
        Self {
            value,
            family: AddressFamily::V6,
        }
    }

    /// Build a key from raw parts, rejecting IPv4 values wider than 32 bits
    pub fn new(value: u128, family: AddressFamily) -> Option<Self> {
        match family {
            AddressFamily::V4 => u32::try_from(value).ok().map(Self::v4),
            AddressFamily::V6 => Some(Self::v6(value)),
        }
    }

    /// Raw integer value in the shared keyspace
    #[inline]
    pub const fn value(&self) -> u128 {
        self.value
    }

    /// Address family
    #[inline]
    pub const fn family(&self) -> AddressFamily {
        self.family
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode(*self))
    }
}

// Keys travel through JSON as address text
impl Serialize for AddressKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&decode(*self))
    }
}

impl<'de> Deserialize<'de> for AddressKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        encode(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse an IPv4 dotted quad or an IPv6 address into a key
///
/// IPv4 is tried first, then IPv6.
pub fn encode(text: &str) -> Result<AddressKey, AddressError> {
    if let Ok(v4) = text.parse::<Ipv4Addr>() {
        return Ok(AddressKey::v4(u32::from(v4)));
    }
    if let Ok(v6) = text.parse::<Ipv6Addr>() {
        return Ok(AddressKey::v6(u128::from(v6)));
    }
    Err(AddressError::InvalidAddress(text.to_string()))
}

/// Render a key in canonical textual form
pub fn decode(key: AddressKey) -> String {
    match key.family {
        // AddressKey constructors guarantee V4 values fit in 32 bits
        AddressFamily::V4 => Ipv4Addr::from(key.value as u32).to_string(),
        AddressFamily::V6 => Ipv6Addr::from(key.value).to_string(),
    }
}

/// Parse `address/prefix` notation
///
/// A bare address is accepted as a single-host range.
pub fn parse_cidr(text: &str) -> Result<(AddressKey, u8), AddressError> {
    let text = text.trim();
    let (addr, prefix) = match text.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (text, None),
    };

    let key = encode(addr)?;
    let width = key.family().width();
    let prefix = match prefix {
        Some(p) => p
            .parse::<u8>()
            .map_err(|_| AddressError::InvalidPrefix(text.to_string()))?,
        None => width,
    };
    if prefix > width {
        return Err(AddressError::InvalidPrefix(text.to_string()));
    }
    Ok((key, prefix))
}

/// Host mask for a prefix, i.e. `size - 1`
#[inline]
fn host_mask(prefix_length: u8, family: AddressFamily) -> u128 {
    let host_bits = u32::from(family.width().saturating_sub(prefix_length));
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

/// Number of addresses covered by a prefix: `2^(width - prefix)`
///
/// `::/0` covers 2^128 addresses, which does not fit; it saturates to
/// `u128::MAX`.
#[inline]
pub fn range_size(prefix_length: u8, family: AddressFamily) -> u128 {
    host_mask(prefix_length, family).saturating_add(1)
}

/// Last address covered by a range, inclusive
#[inline]
pub fn last_address(start: AddressKey, prefix_length: u8) -> u128 {
    start
        .value()
        .saturating_add(host_mask(prefix_length, start.family()))
}
