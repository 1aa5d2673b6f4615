//! Browser-side store: the read and dispatch contracts the detail view is given.

use std::collections::BTreeMap;
use std::fmt;

use seed_proto::{
    ElementBasicInfo, GameUpgrade, GeyserType, InvalidSeedReport, ReferenceData, ReportAck,
    SeedDetailsRequest, SeedRecord, SpaceDestinationType,
};
use tracing::{debug, info, warn};

use crate::client::{ClientError, PendingFetch, SeedClient};

/// What failed and why, kept in the snapshot for the view to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub what: FailedFetch,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedFetch {
    Seed(SeedDetailsRequest),
    ReferenceData,
    /// Reference data arrived with the named lookup empty.
    IncompleteReference(&'static str),
}

impl FetchFailure {
    fn new(what: FailedFetch, err: &ClientError) -> Self {
        Self {
            what,
            message: err.to_string(),
        }
    }

    pub fn incomplete_reference(lookup: &'static str) -> Self {
        Self {
            what: FailedFetch::IncompleteReference(lookup),
            message: format!("no {lookup} were returned"),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.what {
            FailedFetch::Seed(request) => write!(f, "seed {request}: {}", self.message),
            FailedFetch::ReferenceData | FailedFetch::IncompleteReference(_) => {
                write!(f, "reference data: {}", self.message)
            }
        }
    }
}

/// Current values of everything the view reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub seed: Option<SeedRecord>,
    pub seed_failure: Option<FetchFailure>,
    pub reference: ReferenceData,
    pub reference_failure: Option<FetchFailure>,
}

impl StoreSnapshot {
    pub fn geyser_types(&self) -> &BTreeMap<String, GeyserType> {
        &self.reference.geyser_types
    }

    pub fn game_upgrades(&self) -> &BTreeMap<String, GameUpgrade> {
        &self.reference.game_upgrades
    }

    pub fn space_destination_types(&self) -> &BTreeMap<String, SpaceDestinationType> {
        &self.reference.space_destination_types
    }

    pub fn elements(&self) -> &BTreeMap<String, ElementBasicInfo> {
        &self.reference.elements
    }

    /// First failure relevant to a view still waiting on data.
    pub fn failure(&self) -> Option<&FetchFailure> {
        self.seed_failure.as_ref().or(self.reference_failure.as_ref())
    }
}

/// Read contract.
pub trait SeedReader {
    fn snapshot(&self) -> &StoreSnapshot;
    /// True while a seed or reference fetch is still outstanding.
    fn is_fetching(&self) -> bool;
}

/// Command contract.
pub trait SeedDispatch {
    fn request_seed(&mut self, request: SeedDetailsRequest);
    fn request_reference_data(&mut self);
    fn report_invalid_seed(&mut self, report: InvalidSeedReport);
}

/// Owns the in-flight fetches and folds their outcomes into a [`StoreSnapshot`].
pub struct BrowserStore<C> {
    client: C,
    snapshot: StoreSnapshot,
    seed_fetch: Option<(SeedDetailsRequest, PendingFetch<SeedRecord>)>,
    reference_fetch: Option<PendingFetch<ReferenceData>>,
    report_fetches: Vec<(InvalidSeedReport, PendingFetch<ReportAck>)>,
    acknowledged: Vec<ReportAck>,
}

impl<C: SeedClient> BrowserStore<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            snapshot: StoreSnapshot::default(),
            seed_fetch: None,
            reference_fetch: None,
            report_fetches: Vec::new(),
            acknowledged: Vec::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn pending_reports(&self) -> usize {
        self.report_fetches.len()
    }

    /// Acknowledgements received since the last call.
    pub fn take_acknowledged(&mut self) -> Vec<ReportAck> {
        std::mem::take(&mut self.acknowledged)
    }

    /// Apply every completed fetch to the snapshot. Returns true if the snapshot changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some((request, fetch)) = self.seed_fetch.as_mut() {
            if let Some(outcome) = fetch.try_take() {
                match outcome {
                    Ok(seed) => {
                        info!(key = %seed.key(), geysers = seed.geysers.len(), "seed.fetch.completed");
                        self.snapshot.seed = Some(seed);
                        self.snapshot.seed_failure = None;
                    }
                    Err(err) => {
                        warn!(request = %request, error = %err, "seed.fetch.failed");
                        self.snapshot.seed_failure =
                            Some(FetchFailure::new(FailedFetch::Seed(request.clone()), &err));
                    }
                }
                self.seed_fetch = None;
                changed = true;
            }
        }

        if let Some(fetch) = self.reference_fetch.as_mut() {
            if let Some(outcome) = fetch.try_take() {
                match outcome {
                    Ok(reference) => {
                        info!(
                            geyser_types = reference.geyser_types.len(),
                            game_upgrades = reference.game_upgrades.len(),
                            destination_types = reference.space_destination_types.len(),
                            elements = reference.elements.len(),
                            "reference.fetch.completed"
                        );
                        self.snapshot.reference = reference;
                        self.snapshot.reference_failure = None;
                    }
                    Err(err) => {
                        warn!(error = %err, "reference.fetch.failed");
                        self.snapshot.reference_failure =
                            Some(FetchFailure::new(FailedFetch::ReferenceData, &err));
                    }
                }
                self.reference_fetch = None;
                changed = true;
            }
        }

        let acknowledged = &mut self.acknowledged;
        self.report_fetches
            .retain_mut(|(report, fetch)| match fetch.try_take() {
                Some(Ok(ack)) => {
                    info!(
                        key = %report.key(),
                        report_count = ack.report_count,
                        flagged = ack.flagged,
                        "report.acknowledged"
                    );
                    acknowledged.push(ack);
                    false
                }
                Some(Err(err)) => {
                    warn!(key = %report.key(), error = %err, "report.failed");
                    false
                }
                None => true,
            });

        changed
    }

    /// Abort everything in flight.
    pub fn cancel_pending(&mut self) {
        if let Some((request, mut fetch)) = self.seed_fetch.take() {
            fetch.cancel();
            debug!(request = %request, "seed.fetch.cancelled");
        }
        if let Some(mut fetch) = self.reference_fetch.take() {
            fetch.cancel();
            debug!("reference.fetch.cancelled");
        }
        for (_, fetch) in self.report_fetches.iter_mut() {
            fetch.cancel();
        }
        self.report_fetches.clear();
    }
}

impl<C> SeedReader for BrowserStore<C> {
    fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    fn is_fetching(&self) -> bool {
        self.seed_fetch.is_some() || self.reference_fetch.is_some()
    }
}

impl<C: SeedClient> SeedDispatch for BrowserStore<C> {
    fn request_seed(&mut self, request: SeedDetailsRequest) {
        if let Some((previous, mut fetch)) = self.seed_fetch.take() {
            fetch.cancel();
            debug!(request = %previous, "seed.fetch.superseded");
        }
        self.snapshot.seed = None;
        self.snapshot.seed_failure = None;
        debug!(request = %request, "seed.fetch.requested");
        let fetch = self.client.fetch_seed(request.clone());
        self.seed_fetch = Some((request, fetch));
    }

    fn request_reference_data(&mut self) {
        if let Some(mut fetch) = self.reference_fetch.take() {
            fetch.cancel();
        }
        self.snapshot.reference_failure = None;
        debug!("reference.fetch.requested");
        self.reference_fetch = Some(self.client.fetch_reference_data());
    }

    fn report_invalid_seed(&mut self, report: InvalidSeedReport) {
        debug!(key = %report.key(), "report.submitted");
        let fetch = self.client.report_invalid_seed(report);
        self.report_fetches.push((report, fetch));
    }
}
