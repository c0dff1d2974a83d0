//! Symbol tables for repeated string attributes
//!
//! Provider, service, region and feature strings repeat across thousands of
//! ranges. Each distinct string is interned once and records store a dense
//! `u32` code instead. Codes start at 1 in first-seen order; 0 means unset.
//!
//! Tables belong to the index they were built with. Codes are only
//! meaningful together with that table and are not stable across rebuilds.

use crate::error::{IndexError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Code reserved for "no value"
pub const UNSET: u32 = 0;

/// String to code bijection built by first-seen interning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    name: &'static str,
    /// strings[i] has code i + 1
    strings: Vec<String>,
    codes: FxHashMap<String, u32>,
}

impl SymbolTable {
    /// Create an empty table; `name` only appears in error messages
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            strings: Vec::new(),
            codes: FxHashMap::default(),
        }
    }

    /// Rebuild a table from strings in code order
    ///
    /// Fails if a string repeats, since codes would no longer be a bijection.
    pub fn from_strings(name: &'static str, strings: Vec<String>) -> Result<Self> {
        let mut codes = FxHashMap::default();
        codes.reserve(strings.len());
        for (i, s) in strings.iter().enumerate() {
            let code = Self::code_for_index(i)?;
            if codes.insert(s.clone(), code).is_some() {
                return Err(IndexError::Format(format!(
                    "duplicate {} symbol {:?}",
                    name, s
                )));
            }
        }
        Ok(Self {
            name,
            strings,
            codes,
        })
    }

    fn code_for_index(index: usize) -> Result<u32> {
        u32::try_from(index + 1)
            .map_err(|_| IndexError::Format("symbol table exceeds u32 codes".to_string()))
    }

    /// Return the code for `s`, assigning the next free one if unseen
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        if let Some(&code) = self.codes.get(s) {
            return Ok(code);
        }
        let code = Self::code_for_index(self.strings.len())?;
        self.strings.push(s.to_string());
        self.codes.insert(s.to_string(), code);
        Ok(code)
    }

    /// Look up the string for a code
    ///
    /// [`UNSET`] resolves to the empty string. Any other code without an
    /// entry means the index and table do not belong together.
    pub fn resolve(&self, code: u32) -> Result<&str> {
        if code == UNSET {
            return Ok("");
        }
        self.strings
            .get(code as usize - 1)
            .map(String::as_str)
            .ok_or(IndexError::UnknownCode {
                table: self.name,
                code,
            })
    }

    /// Existing code for `s`, without interning
    pub fn code_of(&self, s: &str) -> Option<u32> {
        self.codes.get(s).copied()
    }

    /// Whether `code` resolves in this table
    pub fn contains_code(&self, code: u32) -> bool {
        code == UNSET || (code as usize) <= self.strings.len()
    }

    /// Number of distinct strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if nothing has been interned
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Strings in code order
    pub fn strings(&self) -> &[String] {
        &self.strings
    }
}

/// The four attribute tables bundled with one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTables {
    /// Provider names
    pub provider: SymbolTable,
    /// Service names
    pub service: SymbolTable,
    /// Regions
    pub region: SymbolTable,
    /// Network feature tags
    pub features: SymbolTable,
}

impl Default for SymbolTables {
    fn default() -> Self {
        Self {
            provider: SymbolTable::new("provider"),
            service: SymbolTable::new("service"),
            region: SymbolTable::new("region"),
            features: SymbolTable::new("features"),
        }
    }
}

/// Persisted shape: each table as its strings in code order
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SymbolTablesRepr {
    provider: Vec<String>,
    service: Vec<String>,
    region: Vec<String>,
    features: Vec<String>,
}

impl SymbolTables {
    pub(crate) fn to_repr(&self) -> SymbolTablesRepr {
        SymbolTablesRepr {
            provider: self.provider.strings().to_vec(),
            service: self.service.strings().to_vec(),
            region: self.region.strings().to_vec(),
            features: self.features.strings().to_vec(),
        }
    }

    pub(crate) fn from_repr(repr: SymbolTablesRepr) -> Result<Self> {
        Ok(Self {
            provider: SymbolTable::from_strings("provider", repr.provider)?,
            service: SymbolTable::from_strings("service", repr.service)?,
            region: SymbolTable::from_strings("region", repr.region)?,
            features: SymbolTable::from_strings("features", repr.features)?,
        })
    }
}
