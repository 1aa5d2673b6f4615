//! Configuration for the seed store service.
//!
//! Loaded from `store_config.json` with support for environment variable overrides.

use std::{
    env, fs, io,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_STORE_CONFIG: &str = include_str!("data/store_config.json");

/// Environment variable naming a config file that replaces the default one.
pub const STORE_CONFIG_ENV: &str = "SEED_STORE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub bind: SocketAddr,
    pub worker_threads: usize,
    /// Seed library to serve; the bundled sample library when unset.
    pub library_path: Option<PathBuf>,
    /// Reports needed before a seed is flagged as invalid.
    pub invalid_report_threshold: u32,
    pub idle_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 42000)),
            worker_threads: 4,
            library_path: None,
            invalid_report_threshold: 3,
            idle_timeout_ms: 30_000,
        }
    }
}

impl StoreConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_STORE_CONFIG).expect("builtin store config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, StoreConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| StoreConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = StoreConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.max(1))
    }

    pub fn worker_count(&self) -> usize {
        self.worker_threads.max(1)
    }
}

#[derive(Debug, Error)]
pub enum StoreConfigError {
    #[error("failed to parse store config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read store config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load the store configuration from the environment override or the default path,
/// falling back to the builtin copy. Returns the file actually used, if any.
pub fn load_store_config_from_env() -> (StoreConfig, Option<PathBuf>) {
    let override_path = env::var(STORE_CONFIG_ENV).ok().map(PathBuf::from);
    let default_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/data/store_config.json");
    let path = override_path.unwrap_or(default_path);

    match StoreConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "seed_store::config",
                path = %path.display(),
                "store_config.loaded=file"
            );
            return (config, Some(path));
        }
        Err(err) => {
            tracing::warn!(
                target: "seed_store::config",
                path = %path.display(),
                error = %err,
                "store_config.load_failed"
            );
        }
    }

    tracing::info!(target: "seed_store::config", "store_config.loaded=builtin");
    (StoreConfig::builtin(), None)
}
