//! Runtime configuration.
//!
//! Loaded from an optional TOML file. Every key is optional:
//!
//! ```toml
//! log_level = "info"        # env_logger filter used by the binary
//!
//! [executor]
//! unsupported = "skip"      # or "reject"
//! timing_unit = "millis"    # or "micros"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::core::error::FilterGraphResult;
use crate::execution::executor::{ExecutorOptions, UnsupportedPolicy};
use crate::execution::stats::TimingUnit;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Log filter applied when `RUST_LOG` is not set.
    pub log_level: String,
    /// Graph execution settings.
    pub executor: ExecutorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// `[executor]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    pub unsupported: UnsupportedPolicy,
    pub timing_unit: TimingUnit,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> FilterGraphResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> FilterGraphResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> FilterGraphResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Executor options described by this config.
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions::new()
            .with_unsupported(self.executor.unsupported)
            .with_timing_unit(self.executor.timing_unit)
    }
}
