//! File configuration for tcc.
//!
//! ```toml
//! data_dir = "/var/lib/tcc"
//! durability = "strict"     # "strict" | "buffered" | "none"
//! compact_on_open = true
//! ```
//!
//! Every key is optional. Without `data_dir` the coordinator runs on
//! in-memory stores.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tcc_durability::DurabilityMode;

/// Coordinator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TccConfig {
    /// Directory holding the transaction log
    pub data_dir: Option<PathBuf>,
    /// When log appends reach stable storage
    pub durability: DurabilityMode,
    /// Rewrite the log with live state only after replay
    pub compact_on_open: bool,
}

impl TccConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse '{}': {}", path.display(), e))
        })
    }
}
