//! JSON seed libraries: the reference lookups plus every seed the store serves.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use seed_proto::{ReferenceData, SeedKey, SeedRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StoreConfig;

pub const BUILTIN_SEED_LIBRARY: &str = include_str!("data/sample_library.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedLibrary {
    pub reference: ReferenceData,
    pub seeds: Vec<SeedRecord>,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to parse seed library: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read seed library from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("seed {0} appears more than once in the library")]
    DuplicateSeed(SeedKey),
}

impl SeedLibrary {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_SEED_LIBRARY).expect("builtin seed library should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, LibraryError> {
        let library: SeedLibrary = serde_json::from_str(json)?;
        library.check_unique()?;
        Ok(library)
    }

    pub fn from_file(path: &Path) -> Result<Self, LibraryError> {
        let contents = fs::read_to_string(path).map_err(|source| LibraryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn check_unique(&self) -> Result<(), LibraryError> {
        let mut seen = HashSet::with_capacity(self.seeds.len());
        for seed in &self.seeds {
            if !seen.insert(seed.key()) {
                return Err(LibraryError::DuplicateSeed(seed.key()));
            }
        }
        Ok(())
    }
}

/// Library named by the config, or the bundled sample library.
pub fn load_seed_library(config: &StoreConfig) -> Result<SeedLibrary, LibraryError> {
    match config.library_path.as_deref() {
        Some(path) => {
            let library = SeedLibrary::from_file(path)?;
            tracing::info!(
                target: "seed_store::library",
                path = %path.display(),
                seeds = library.seeds.len(),
                "seed_library.loaded=file"
            );
            Ok(library)
        }
        None => {
            let library = SeedLibrary::builtin();
            tracing::info!(
                target: "seed_store::library",
                seeds = library.seeds.len(),
                "seed_library.loaded=builtin"
            );
            Ok(library)
        }
    }
}
