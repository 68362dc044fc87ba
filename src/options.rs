//! Tunables shared by both engines.

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// Per-lineage options, fixed when the root handle is created.
///
/// Every field has a default, so a TOML document only needs the keys it
/// wants to change:
///
/// ```
/// let options = lineage::Options::from_toml("compact_on_read = false").unwrap();
/// assert!(!options.compact_on_read);
/// assert_eq!(options.long_rebase, 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Merge pass-through layers whenever a layered grid is read.
    pub compact_on_read: bool,
    /// Rebases walking more steps than this are logged at debug level.
    pub long_rebase: usize,
    /// Initial number of arena slots reserved per lineage.
    pub arena_capacity: usize,
}

impl Options {
    /// Parse options from a TOML document.
    pub fn from_toml(source: &str) -> Result<Options> {
        return toml::from_str(source).map_err(|e| Error::Config(e.to_string()));
    }
}

impl Default for Options {
    fn default() -> Self {
        return Options {
            compact_on_read: true,
            long_rebase: 64,
            arena_capacity: 16,
        };
    }
}
