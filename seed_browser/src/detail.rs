//! Seed detail view: the loading gate and the composition of the detail page.
//!
//! The view is given its collaborators explicitly. It dispatches the seed
//! request through [`SeedDispatch`] when mounted, then re-checks the
//! readiness gate against the [`SeedReader`] snapshot on every update.
//! The gate opens once the seed and the geyser-type, game-upgrade and
//! space-destination-type lookups are all present; after that the view
//! stays ready for the rest of its life.

use std::collections::BTreeSet;

use seed_proto::{InvalidSeedReport, SeedDetailsRequest, SeedRecord};
use tracing::{debug, info, warn};

use crate::route::RouteParams;
use crate::sections::{visible_sections, SectionKind};
use crate::store::{FailedFetch, FetchFailure, SeedDispatch, SeedReader, StoreSnapshot};
use crate::summary::SeedSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPhase {
    Loading,
    Failed(FetchFailure),
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionState {
    pub kind: SectionKind,
    pub expanded: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDetail<'a> {
    pub seed: &'a SeedRecord,
    pub summary: SeedSummary,
    pub sections: Vec<SectionState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailRender<'a> {
    Spinner,
    Failed(&'a FetchFailure),
    Loaded(LoadedDetail<'a>),
}

/// Conjunctive readiness gate over the snapshot.
pub fn is_ready(snapshot: &StoreSnapshot) -> bool {
    snapshot.seed.is_some()
        && !snapshot.geyser_types().is_empty()
        && !snapshot.game_upgrades().is_empty()
        && !snapshot.space_destination_types().is_empty()
}

/// First reference lookup the gate needs that is still empty.
fn empty_lookup(snapshot: &StoreSnapshot) -> Option<&'static str> {
    if snapshot.geyser_types().is_empty() {
        Some("geyser types")
    } else if snapshot.game_upgrades().is_empty() {
        Some("game upgrades")
    } else if snapshot.space_destination_types().is_empty() {
        Some("space destination types")
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct SeedDetailView {
    params: RouteParams,
    phase: DetailPhase,
    mounted: bool,
    expanded: BTreeSet<SectionKind>,
    cursor: usize,
}

impl SeedDetailView {
    pub fn new(params: RouteParams) -> Self {
        Self {
            params,
            phase: DetailPhase::Loading,
            mounted: false,
            expanded: BTreeSet::new(),
            cursor: 0,
        }
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == DetailPhase::Loading
    }

    pub fn request(&self) -> SeedDetailsRequest {
        self.params.request()
    }

    /// Issue the seed request. Only the first call has any effect.
    pub fn on_mount(&mut self, dispatch: &mut dyn SeedDispatch) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        debug!(route = %self.params.path(), "seed_detail.mounted");
        dispatch.request_seed(self.request());
    }

    pub fn on_update(&mut self, reader: &dyn SeedReader) {
        if self.phase != DetailPhase::Loading {
            return;
        }
        let snapshot = reader.snapshot();
        if is_ready(snapshot) {
            info!(route = %self.params.path(), "seed_detail.ready");
            self.phase = DetailPhase::Ready;
        } else if let Some(failure) = snapshot.failure() {
            warn!(route = %self.params.path(), failure = %failure, "seed_detail.failed");
            self.phase = DetailPhase::Failed(failure.clone());
        } else if snapshot.seed.is_some() && !reader.is_fetching() {
            // Nothing left in flight can fill the gap.
            if let Some(lookup) = empty_lookup(snapshot) {
                let failure = FetchFailure::incomplete_reference(lookup);
                warn!(route = %self.params.path(), failure = %failure, "seed_detail.failed");
                self.phase = DetailPhase::Failed(failure);
            }
        }
    }

    /// Re-issue whatever failed. Returns false unless the view was in the failed state.
    pub fn retry(&mut self, dispatch: &mut dyn SeedDispatch) -> bool {
        let DetailPhase::Failed(failure) = &self.phase else {
            return false;
        };
        match failure.what {
            FailedFetch::Seed(_) => dispatch.request_seed(self.request()),
            FailedFetch::ReferenceData | FailedFetch::IncompleteReference(_) => {
                dispatch.request_reference_data()
            }
        }
        debug!(route = %self.params.path(), "seed_detail.retry");
        self.phase = DetailPhase::Loading;
        true
    }

    pub fn report_invalid(
        &self,
        seed_number: i64,
        game_version: u32,
        dispatch: &mut dyn SeedDispatch,
    ) {
        dispatch.report_invalid_seed(InvalidSeedReport {
            seed_number,
            game_version,
        });
    }

    pub fn is_expanded(&self, kind: SectionKind) -> bool {
        self.expanded.contains(&kind)
    }

    pub fn toggle_section(&mut self, kind: SectionKind) {
        if !self.expanded.remove(&kind) {
            self.expanded.insert(kind);
        }
    }

    pub fn select_next(&mut self, snapshot: &StoreSnapshot) {
        let count = self.section_count(snapshot);
        if count > 0 {
            self.cursor = (self.cursor + 1) % count;
        }
    }

    pub fn select_previous(&mut self, snapshot: &StoreSnapshot) {
        let count = self.section_count(snapshot);
        if count > 0 {
            self.cursor = (self.cursor + count - 1) % count;
        }
    }

    pub fn selected_section(&self, snapshot: &StoreSnapshot) -> Option<SectionKind> {
        if self.phase != DetailPhase::Ready {
            return None;
        }
        let seed = snapshot.seed.as_ref()?;
        let sections = visible_sections(seed);
        sections.get(self.cursor.min(sections.len().saturating_sub(1))).copied()
    }

    pub fn toggle_selected(&mut self, snapshot: &StoreSnapshot) {
        if let Some(kind) = self.selected_section(snapshot) {
            self.toggle_section(kind);
        }
    }

    fn section_count(&self, snapshot: &StoreSnapshot) -> usize {
        match (&self.phase, snapshot.seed.as_ref()) {
            (DetailPhase::Ready, Some(seed)) => visible_sections(seed).len(),
            _ => 0,
        }
    }

    pub fn render<'a>(&'a self, snapshot: &'a StoreSnapshot) -> DetailRender<'a> {
        match &self.phase {
            DetailPhase::Loading => DetailRender::Spinner,
            DetailPhase::Failed(failure) => DetailRender::Failed(failure),
            DetailPhase::Ready => {
                let Some(seed) = snapshot.seed.as_ref() else {
                    return DetailRender::Spinner;
                };
                let selected = self.selected_section(snapshot);
                let sections = visible_sections(seed)
                    .into_iter()
                    .map(|kind| SectionState {
                        kind,
                        expanded: self.is_expanded(kind),
                        selected: selected == Some(kind),
                    })
                    .collect();
                DetailRender::Loaded(LoadedDetail {
                    seed,
                    summary: SeedSummary::build(seed, &snapshot.reference),
                    sections,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_proto::{
        BiomePolygon, GameUpgrade, GeyserType, MapPoint, SpaceDestination, SpaceDestinationType,
    };

    #[derive(Default)]
    struct FakeStore {
        snapshot: StoreSnapshot,
        seed_requests: Vec<SeedDetailsRequest>,
        reference_requests: usize,
        reports: Vec<InvalidSeedReport>,
        fetching: bool,
    }

    impl SeedReader for FakeStore {
        fn snapshot(&self) -> &StoreSnapshot {
            &self.snapshot
        }

        fn is_fetching(&self) -> bool {
            self.fetching
        }
    }

    impl SeedDispatch for FakeStore {
        fn request_seed(&mut self, request: SeedDetailsRequest) {
            self.seed_requests.push(request);
        }

        fn request_reference_data(&mut self) {
            self.reference_requests += 1;
        }

        fn report_invalid_seed(&mut self, report: InvalidSeedReport) {
            self.reports.push(report);
        }
    }

    fn bare_seed() -> SeedRecord {
        seed_proto::decode_seed_json(r#"{ "seed_number": 123, "game_version": 4 }"#).expect("seed")
    }

    fn fill_geyser_types(snapshot: &mut StoreSnapshot) {
        snapshot.reference.geyser_types.insert(
            "steam".to_string(),
            GeyserType {
                name: "Cool Steam Vent".to_string(),
                element_id: "Steam".to_string(),
                temperature: 110.0,
            },
        );
    }

    fn fill_upgrades(snapshot: &mut StoreSnapshot) {
        snapshot.reference.game_upgrades.insert(
            "qol1".to_string(),
            GameUpgrade {
                name: "Quality of Life Mk I".to_string(),
                description: String::new(),
            },
        );
    }

    fn fill_destination_types(snapshot: &mut StoreSnapshot) {
        snapshot.reference.space_destination_types.insert(
            "GasGiant".to_string(),
            SpaceDestinationType {
                name: "Gas Giant".to_string(),
                kind: "planet".to_string(),
            },
        );
    }

    fn complete_snapshot(seed: SeedRecord) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot {
            seed: Some(seed),
            ..StoreSnapshot::default()
        };
        fill_geyser_types(&mut snapshot);
        fill_upgrades(&mut snapshot);
        fill_destination_types(&mut snapshot);
        snapshot
    }

    fn section_titles(render: &DetailRender<'_>) -> Vec<&'static str> {
        match render {
            DetailRender::Loaded(detail) => detail.sections.iter().map(|s| s.kind.title()).collect(),
            other => panic!("expected loaded detail, got {other:?}"),
        }
    }

    #[test]
    fn gate_opens_only_when_everything_is_present() {
        for mask in 0u8..16 {
            let mut snapshot = StoreSnapshot::default();
            if mask & 1 != 0 {
                snapshot.seed = Some(bare_seed());
            }
            if mask & 2 != 0 {
                fill_geyser_types(&mut snapshot);
            }
            if mask & 4 != 0 {
                fill_upgrades(&mut snapshot);
            }
            if mask & 8 != 0 {
                fill_destination_types(&mut snapshot);
            }
            let store = FakeStore {
                snapshot,
                fetching: true,
                ..FakeStore::default()
            };

            let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
            view.on_update(&store);
            assert_eq!(view.is_loading(), mask != 15, "mask {mask:04b}");
        }
    }

    #[test]
    fn ready_never_reverts_to_loading() {
        let mut store = FakeStore {
            snapshot: complete_snapshot(bare_seed()),
            ..FakeStore::default()
        };
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);
        assert_eq!(view.phase(), &DetailPhase::Ready);

        store.snapshot = StoreSnapshot::default();
        view.on_update(&store);
        assert_eq!(view.phase(), &DetailPhase::Ready);
        view.on_update(&store);
        assert!(!view.is_loading());
    }

    #[test]
    fn mount_dispatches_route_key_once() {
        let mut store = FakeStore::default();
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_mount(&mut store);
        view.on_mount(&mut store);
        assert_eq!(store.seed_requests, vec![SeedDetailsRequest::new("123", "4")]);

        view.on_update(&store);
        assert_eq!(view.render(&store.snapshot), DetailRender::Spinner);
    }

    #[test]
    fn loaded_render_shows_summary_and_nonempty_sections() {
        let mut seed = bare_seed();
        seed.biome_sizes.insert("Sandstone".to_string(), 100.0);
        seed.space_destinations.push(SpaceDestination {
            destination_type_id: "GasGiant".to_string(),
            distance: 2,
        });
        let store = FakeStore {
            snapshot: complete_snapshot(seed),
            ..FakeStore::default()
        };
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);

        let render = view.render(&store.snapshot);
        assert_eq!(
            section_titles(&render),
            vec!["Geyser details", "World details", "Starmap"]
        );
        let DetailRender::Loaded(detail) = render else {
            unreachable!();
        };
        assert_eq!(detail.summary.seed_number, 123);
        assert!(detail.sections.iter().all(|section| !section.expanded));
    }

    #[test]
    fn only_world_map_when_other_collections_empty() {
        let mut seed = bare_seed();
        seed.biome_map.insert(
            "Sandstone".to_string(),
            vec![BiomePolygon {
                points: vec![
                    MapPoint { x: 0.0, y: 0.0 },
                    MapPoint { x: 10.0, y: 0.0 },
                    MapPoint { x: 10.0, y: 10.0 },
                ],
            }],
        );
        let store = FakeStore {
            snapshot: complete_snapshot(seed),
            ..FakeStore::default()
        };
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);
        assert_eq!(
            section_titles(&view.render(&store.snapshot)),
            vec!["Geyser details", "World Map"]
        );
    }

    #[test]
    fn report_forwards_values_unmodified() {
        let mut store = FakeStore::default();
        let view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.report_invalid(42, 5, &mut store);
        assert_eq!(
            store.reports,
            vec![InvalidSeedReport {
                seed_number: 42,
                game_version: 5
            }]
        );
        assert!(view.is_loading());
        assert!(store.seed_requests.is_empty());
    }

    #[test]
    fn failure_shows_error_and_retry_reissues_request() {
        let request = SeedDetailsRequest::new("123", "4");
        let failure = FetchFailure {
            what: FailedFetch::Seed(request.clone()),
            message: "no response within 5s".to_string(),
        };
        let mut store = FakeStore::default();
        store.snapshot.seed_failure = Some(failure.clone());

        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_mount(&mut store);
        view.on_update(&store);
        assert_eq!(view.render(&store.snapshot), DetailRender::Failed(&failure));

        assert!(view.retry(&mut store));
        assert!(view.is_loading());
        assert_eq!(store.seed_requests, vec![request.clone(), request]);
        assert!(!view.retry(&mut store));
    }

    #[test]
    fn reference_failure_retries_reference_data() {
        let mut store = FakeStore::default();
        store.snapshot.seed = Some(bare_seed());
        store.snapshot.reference_failure = Some(FetchFailure {
            what: FailedFetch::ReferenceData,
            message: "connection refused".to_string(),
        });
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);
        assert!(matches!(view.phase(), DetailPhase::Failed(_)));

        assert!(view.retry(&mut store));
        assert_eq!(store.reference_requests, 1);
        assert!(store.seed_requests.is_empty());
    }

    #[test]
    fn empty_lookup_after_fetches_settle_fails_with_retry() {
        let mut store = FakeStore {
            fetching: true,
            ..FakeStore::default()
        };
        store.snapshot.seed = Some(bare_seed());
        fill_geyser_types(&mut store.snapshot);
        fill_destination_types(&mut store.snapshot);

        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);
        assert!(view.is_loading());

        store.fetching = false;
        view.on_update(&store);
        let DetailPhase::Failed(failure) = view.phase() else {
            panic!("expected failure, got {:?}", view.phase());
        };
        assert_eq!(failure.what, FailedFetch::IncompleteReference("game upgrades"));
        assert!(failure.to_string().contains("game upgrades"), "{failure}");

        assert!(view.retry(&mut store));
        assert_eq!(store.reference_requests, 1);
        assert!(store.seed_requests.is_empty());
        assert!(view.is_loading());

        fill_upgrades(&mut store.snapshot);
        view.on_update(&store);
        assert_eq!(view.phase(), &DetailPhase::Ready);
    }

    #[test]
    fn missing_seed_without_fetch_keeps_waiting() {
        let mut store = FakeStore::default();
        fill_geyser_types(&mut store.snapshot);
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));
        view.on_update(&store);
        assert!(view.is_loading());
    }

    #[test]
    fn cursor_toggles_the_selected_section() {
        let mut seed = bare_seed();
        seed.biome_sizes.insert("Sandstone".to_string(), 1.0);
        let store = FakeStore {
            snapshot: complete_snapshot(seed),
            ..FakeStore::default()
        };
        let mut view = SeedDetailView::new(RouteParams::new("123", "4"));

        view.toggle_selected(&store.snapshot);
        assert!(!view.is_expanded(SectionKind::Geysers));

        view.on_update(&store);
        view.select_next(&store.snapshot);
        assert_eq!(
            view.selected_section(&store.snapshot),
            Some(SectionKind::WorldDetails)
        );
        view.toggle_selected(&store.snapshot);
        assert!(view.is_expanded(SectionKind::WorldDetails));

        view.select_next(&store.snapshot);
        assert_eq!(view.selected_section(&store.snapshot), Some(SectionKind::Geysers));
        view.select_previous(&store.snapshot);
        view.toggle_selected(&store.snapshot);
        assert!(!view.is_expanded(SectionKind::WorldDetails));
    }
}
