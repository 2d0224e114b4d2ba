//! Example catalog: named log files paired with the format that parses them.
//!
//! A catalog is a JSON document such as
//!
//! ```json
//! {
//!   "examples": [
//!     {
//!       "filename": "ping.log",
//!       "title": "Ping",
//!       "order": 1,
//!       "pattern": "(?P<event>.*)\\n(?P<host>\\S*) (?P<clock>\\{.*\\})",
//!       "delimiter": "^=== (?P<trace>\\S+)$"
//!     }
//!   ]
//! }
//! ```
//!
//! Entry file names are relative to the catalog's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use vtrace_core::LogFormat;

use crate::error::{CliError, Result};

/// One example log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Log file, relative to the catalog
    pub filename: String,
    /// Display title
    pub title: String,
    /// Ordering hint; lower comes first
    #[serde(default)]
    pub order: i64,
    /// Format of the log
    #[serde(flatten)]
    pub format: LogFormat,
}

/// A list of example logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Entries in file order
    #[serde(default)]
    pub examples: Vec<CatalogEntry>,
}

impl Catalog {
    /// Reads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a catalog.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self = serde_json::from_str(&text).map_err(|source| CliError::Catalog {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), entries = catalog.examples.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Returns entries ordered by `order`, then title.
    #[must_use]
    pub fn sorted(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<_> = self.examples.iter().collect();
        entries.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        entries
    }

    /// Finds an entry by title or file name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.examples
            .iter()
            .find(|e| e.title == name || e.filename == name)
    }
}

impl CatalogEntry {
    /// Resolves the entry's file against the catalog location.
    #[must_use]
    pub fn path_in(&self, catalog: &Path) -> PathBuf {
        catalog
            .parent()
            .map_or_else(|| PathBuf::from(&self.filename), |dir| dir.join(&self.filename))
    }
}
