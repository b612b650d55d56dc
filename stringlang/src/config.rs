//! Run configuration
//!
//! ```toml
//! timeout_ms = 5000
//! limit_memory = true
//! max_memory = 1048576
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_MEMORY: i64 = 100 * 1024 * 1024;

/// Limits for one program run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Wall-clock limit for the whole evaluation
    pub timeout_ms: u64,
    /// Memory budget in bytes, used only when `limit_memory` is set
    pub max_memory: i64,
    pub limit_memory: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_memory: DEFAULT_MAX_MEMORY,
            limit_memory: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RunConfig {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Budget for the top-level environment, negative when unlimited
    pub fn max_footprint(&self) -> i64 {
        if self.limit_memory { self.max_memory } else { -1 }
    }
}
