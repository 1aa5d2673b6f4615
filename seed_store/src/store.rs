use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use seed_proto::{
    InvalidSeedReport, KeyError, ReferenceData, ReportAck, SeedDetailsRequest, SeedKey,
    SeedRecord, StoreRequest, StoreResponse,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::library::SeedLibrary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("seed {0} is not in the store")]
    UnknownSeed(SeedKey),
}

#[derive(Debug, Default)]
struct StoreState {
    seeds: HashMap<SeedKey, SeedRecord>,
    reference: ReferenceData,
    reports: HashMap<SeedKey, u32>,
}

/// Shared in-memory seed store.
///
/// Cloning is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct SeedStore {
    state: Arc<RwLock<StoreState>>,
    report_threshold: u32,
}

impl SeedStore {
    pub fn new(report_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            report_threshold: report_threshold.max(1),
        }
    }

    pub fn from_library(library: SeedLibrary, report_threshold: u32) -> Self {
        let store = Self::new(report_threshold);
        store.replace_reference(library.reference);
        for seed in library.seeds {
            store.insert_seed(seed);
        }
        store
    }

    pub fn insert_seed(&self, seed: SeedRecord) -> Option<SeedRecord> {
        let mut state = self.state.write().expect("seed store lock poisoned");
        state.seeds.insert(seed.key(), seed)
    }

    pub fn replace_reference(&self, reference: ReferenceData) {
        let mut state = self.state.write().expect("seed store lock poisoned");
        state.reference = reference;
    }

    pub fn seed(&self, key: &SeedKey) -> Option<SeedRecord> {
        let state = self.state.read().expect("seed store lock poisoned");
        state.seeds.get(key).cloned()
    }

    pub fn lookup(&self, request: &SeedDetailsRequest) -> Result<SeedRecord, StoreError> {
        let key = request.parse_key()?;
        self.seed(&key).ok_or(StoreError::UnknownSeed(key))
    }

    pub fn reference(&self) -> ReferenceData {
        let state = self.state.read().expect("seed store lock poisoned");
        state.reference.clone()
    }

    pub fn seed_count(&self) -> usize {
        let state = self.state.read().expect("seed store lock poisoned");
        state.seeds.len()
    }

    pub fn report_count(&self, key: &SeedKey) -> u32 {
        let state = self.state.read().expect("seed store lock poisoned");
        state.reports.get(key).copied().unwrap_or(0)
    }

    pub fn report_threshold(&self) -> u32 {
        self.report_threshold
    }

    /// Record an invalid-seed report. Reports for seeds the store does not hold are refused.
    pub fn report_invalid(&self, report: InvalidSeedReport) -> Result<ReportAck, StoreError> {
        let key = report.key();
        let mut state = self.state.write().expect("seed store lock poisoned");
        if !state.seeds.contains_key(&key) {
            return Err(StoreError::UnknownSeed(key));
        }
        let count = state.reports.entry(key).or_insert(0);
        *count = count.saturating_add(1);
        Ok(ReportAck {
            seed_number: report.seed_number,
            game_version: report.game_version,
            report_count: *count,
            flagged: *count >= self.report_threshold,
        })
    }

    /// Answer one wire request.
    pub fn handle_request(&self, request: &StoreRequest) -> StoreResponse {
        match request {
            StoreRequest::GetSeed(details) => match self.lookup(details) {
                Ok(seed) => {
                    debug!(target: "seed_store::store", key = %seed.key(), "seed.served");
                    StoreResponse::Seed(seed)
                }
                Err(StoreError::UnknownSeed(key)) => {
                    info!(target: "seed_store::store", %key, "seed.not_found");
                    StoreResponse::NotFound(details.clone())
                }
                Err(err) => {
                    warn!(
                        target: "seed_store::store",
                        request = %details,
                        error = %err,
                        "seed.rejected"
                    );
                    StoreResponse::Rejected(err.to_string())
                }
            },
            StoreRequest::GetReferenceData => StoreResponse::ReferenceData(self.reference()),
            StoreRequest::ReportInvalidSeed(report) => match self.report_invalid(*report) {
                Ok(ack) => {
                    info!(
                        target: "seed_store::store",
                        key = %report.key(),
                        report_count = ack.report_count,
                        flagged = ack.flagged,
                        "report.accepted"
                    );
                    StoreResponse::ReportAccepted(ack)
                }
                Err(err) => {
                    warn!(
                        target: "seed_store::store",
                        key = %report.key(),
                        error = %err,
                        "report.rejected"
                    );
                    StoreResponse::Rejected(err.to_string())
                }
            },
        }
    }
}

impl Default for SeedStore {
    fn default() -> Self {
        Self::new(3)
    }
}
