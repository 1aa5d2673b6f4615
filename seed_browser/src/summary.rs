use std::collections::BTreeMap;

use seed_proto::{ReferenceData, SeedRecord};
use serde::Serialize;

/// Headline facts about one seed, always shown once the seed has loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedSummary {
    pub seed_number: i64,
    pub game_version: u32,
    pub world_width: u32,
    pub world_height: u32,
    pub geyser_count: usize,
    /// Geyser type name to number of geysers of that type.
    pub geysers_by_type: BTreeMap<String, usize>,
    pub upgrades: Vec<String>,
    pub biome_count: usize,
    pub destination_count: usize,
}

impl SeedSummary {
    pub fn build(seed: &SeedRecord, reference: &ReferenceData) -> Self {
        let mut geysers_by_type = BTreeMap::new();
        for geyser in &seed.geysers {
            let name = reference
                .geyser_types
                .get(&geyser.geyser_type_id)
                .map(|kind| kind.name.clone())
                .unwrap_or_else(|| geyser.geyser_type_id.clone());
            *geysers_by_type.entry(name).or_insert(0) += 1;
        }

        let upgrades = seed
            .game_upgrade_ids
            .iter()
            .map(|id| {
                reference
                    .game_upgrades
                    .get(id)
                    .map(|upgrade| upgrade.name.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect();

        Self {
            seed_number: seed.seed_number,
            game_version: seed.game_version,
            world_width: seed.world_size.width,
            world_height: seed.world_size.height,
            geyser_count: seed.geysers.len(),
            geysers_by_type,
            upgrades,
            biome_count: seed.biome_sizes.len(),
            destination_count: seed.space_destinations.len(),
        }
    }

    pub fn distinct_geyser_types(&self) -> usize {
        self.geysers_by_type.len()
    }
}
