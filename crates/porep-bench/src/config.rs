// crates/porep-bench/src/config.rs

//! Run configuration: TOML file, then environment, then command-line flags.
//!
//! ```toml
//! store_path = "bench"
//! seed = 42
//! miner_id = 1000
//! report_dir = "reports"
//! force = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`BenchConfig::store_path`].
pub const STORE_ENV: &str = "POREP_BENCH_STORE";

/// Default store directory, relative to the process's working directory.
pub const DEFAULT_STORE: &str = "bench";

/// Run configuration: TOML file, then environment, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Directory holding the persistent store.
    pub store_path: PathBuf,
    /// Seeds phase 1's random source; OS entropy when absent.
    pub seed: Option<u64>,
    /// Fixed miner actor id; drawn from the random source when absent.
    pub miner_id: Option<u64>,
    /// Where reports are written; the working directory when absent.
    pub report_dir: Option<PathBuf>,
    /// Wipe a non-empty working directory even without the run marker.
    pub force: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE),
            seed: None,
            miner_id: None,
            report_dir: None,
            force: false,
        }
    }
}

impl BenchConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("parse config toml")
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&src).with_context(|| format!("in {}", path.display()))
    }

    /// Apply [`STORE_ENV`] from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|k| std::env::var(k).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(STORE_ENV).filter(|v| !v.trim().is_empty()) {
            self.store_path = PathBuf::from(dir);
        }
    }

    /// Directory reports go to for a run in `work_dir`.
    #[must_use]
    pub fn report_dir_for(&self, work_dir: &Path) -> PathBuf {
        self.report_dir
            .clone()
            .unwrap_or_else(|| work_dir.to_path_buf())
    }
}
