//! Error types for the cloudiplookup library

use std::fmt;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Main error type for building, loading and querying a range index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A range record failed validation (bad prefix length, family mismatch)
    InvalidRecord(String),

    /// Two ranges overlap and the builder was asked to reject overlaps
    OverlappingRanges {
        /// CIDR of the earlier range
        first: String,
        /// CIDR of the range starting inside the earlier one
        second: String,
    },

    /// A symbol code has no entry in its table (corrupted or mismatched index)
    UnknownCode {
        /// Which table was consulted
        table: &'static str,
        /// The offending code
        code: u32,
    },

    /// I/O errors
    Io(String),

    /// Snapshot format/parsing errors
    Format(String),

    /// Snapshot checksum mismatch
    Checksum {
        /// Checksum stored in the header
        expected: u64,
        /// Checksum computed over the body
        actual: u64,
    },

    /// Snapshot written by an unknown format version
    UnsupportedVersion(u32),

    /// Provider feed document could not be normalized
    Feed(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::InvalidRecord(msg) => write!(f, "Invalid range record: {}", msg),
            IndexError::OverlappingRanges { first, second } => {
                write!(f, "Overlapping ranges: {} overlaps {}", second, first)
            }
            IndexError::UnknownCode { table, code } => {
                write!(f, "Unknown {} code: {}", table, code)
            }
            IndexError::Io(msg) => write!(f, "I/O error: {}", msg),
            IndexError::Format(msg) => write!(f, "Snapshot format error: {}", msg),
            IndexError::Checksum { expected, actual } => write!(
                f,
                "Snapshot checksum mismatch: expected {:016x}, got {:016x}",
                expected, actual
            ),
            IndexError::UnsupportedVersion(v) => {
                write!(f, "Unsupported snapshot version: {}", v)
            }
            IndexError::Feed(msg) => write!(f, "Feed error: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Format(err.to_string())
    }
}

/// Error returned by the address codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Text is neither a valid IPv4 nor IPv6 address
    InvalidAddress(String),

    /// CIDR prefix is missing, unparsable, or wider than the address family
    InvalidPrefix(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::InvalidAddress(text) => write!(f, "Invalid IP address: {:?}", text),
            AddressError::InvalidPrefix(text) => write!(f, "Invalid CIDR prefix: {:?}", text),
        }
    }
}

impl std::error::Error for AddressError {}

impl From<AddressError> for IndexError {
    fn from(err: AddressError) -> Self {
        IndexError::InvalidRecord(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = IndexError::UnknownCode {
            table: "provider",
            code: 7,
        };
        assert_eq!(err.to_string(), "Unknown provider code: 7");

        let err = IndexError::Checksum {
            expected: 1,
            actual: 2,
        };
        assert!(err.to_string().contains("0000000000000001"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: IndexError = io.into();
        assert!(matches!(err, IndexError::Io(_)));
    }
}
