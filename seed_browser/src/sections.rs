//! Collapsible sections of the seed detail page and the rows they display.

use std::collections::BTreeMap;

use seed_proto::{ElementBasicInfo, ElementState, Geyser, GeyserType, SeedRecord, SpaceDestination, SpaceDestinationType};

const TOP_ELEMENTS: usize = 10;
const TOP_STARTING_ELEMENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Geysers,
    WorldDetails,
    WorldMap,
    Starmap,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Geysers,
        SectionKind::WorldDetails,
        SectionKind::WorldMap,
        SectionKind::Starmap,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Geysers => "Geyser details",
            SectionKind::WorldDetails => "World details",
            SectionKind::WorldMap => "World Map",
            SectionKind::Starmap => "Starmap",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            SectionKind::Geysers => "geyser-stats",
            SectionKind::WorldDetails => "world-details",
            SectionKind::WorldMap => "worldmap",
            SectionKind::Starmap => "starmap",
        }
    }

    /// The geyser section is shown even for a seed without geysers.
    pub fn is_visible(self, seed: &SeedRecord) -> bool {
        match self {
            SectionKind::Geysers => true,
            SectionKind::WorldDetails => !seed.biome_sizes.is_empty(),
            SectionKind::WorldMap => !seed.biome_map.is_empty(),
            SectionKind::Starmap => !seed.space_destinations.is_empty(),
        }
    }
}

pub fn visible_sections(seed: &SeedRecord) -> Vec<SectionKind> {
    SectionKind::ALL
        .into_iter()
        .filter(|kind| kind.is_visible(seed))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeyserRow {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub emit_rate: f32,
    pub temperature: Option<f32>,
}

pub fn geyser_rows(geysers: &[Geyser], types: &BTreeMap<String, GeyserType>) -> Vec<GeyserRow> {
    let mut rows: Vec<GeyserRow> = geysers
        .iter()
        .map(|geyser| {
            let kind = types.get(&geyser.geyser_type_id);
            GeyserRow {
                name: kind
                    .map(|kind| kind.name.clone())
                    .unwrap_or_else(|| geyser.geyser_type_id.clone()),
                x: geyser.x,
                y: geyser.y,
                emit_rate: geyser.emit_rate,
                temperature: kind.map(|kind| kind.temperature),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.x.cmp(&b.x)).then(a.y.cmp(&b.y)));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiomeRow {
    pub biome: String,
    pub size: f64,
    /// Fraction of the summed biome sizes, 0..=1.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRow {
    pub name: String,
    pub state: Option<ElementState>,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldDetails {
    pub biomes: Vec<BiomeRow>,
    pub elements: Vec<ElementRow>,
    pub starting_elements: Vec<(String, Vec<ElementRow>)>,
}

fn element_rows(
    masses: &BTreeMap<String, f64>,
    elements: &BTreeMap<String, ElementBasicInfo>,
    limit: usize,
) -> Vec<ElementRow> {
    let mut rows: Vec<ElementRow> = masses
        .iter()
        .map(|(id, mass)| {
            let info = elements.get(id);
            ElementRow {
                name: info.map(|info| info.name.clone()).unwrap_or_else(|| id.clone()),
                state: info.map(|info| info.state),
                mass: *mass,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.mass.total_cmp(&a.mass).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(limit);
    rows
}

pub fn world_details(seed: &SeedRecord, elements: &BTreeMap<String, ElementBasicInfo>) -> WorldDetails {
    let total: f64 = seed.biome_sizes.values().sum();
    let mut biomes: Vec<BiomeRow> = seed
        .biome_sizes
        .iter()
        .map(|(biome, size)| BiomeRow {
            biome: biome.clone(),
            size: *size,
            share: if total > 0.0 { size / total } else { 0.0 },
        })
        .collect();
    biomes.sort_by(|a, b| b.size.total_cmp(&a.size).then_with(|| a.biome.cmp(&b.biome)));

    let starting_elements = biomes
        .iter()
        .filter_map(|row| {
            seed.starting_biome_element_masses
                .get(&row.biome)
                .map(|masses| (row.biome.clone(), element_rows(masses, elements, TOP_STARTING_ELEMENTS)))
        })
        .collect();

    WorldDetails {
        elements: element_rows(&seed.element_masses, elements, TOP_ELEMENTS),
        biomes,
        starting_elements,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapCell {
    Empty,
    Biome(usize),
    Geyser,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapRaster {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<MapCell>,
    pub legend: Vec<(char, String)>,
}

impl MapRaster {
    pub fn cell(&self, col: usize, row: usize) -> MapCell {
        self.cells[row * self.cols + col]
    }

    pub fn row_text(&self, row: usize) -> String {
        (0..self.cols)
            .map(|col| match self.cell(col, row) {
                MapCell::Empty => ' ',
                MapCell::Biome(index) => self.legend[index].0,
                MapCell::Geyser => '*',
            })
            .collect()
    }
}

fn legend_glyphs<'a>(names: impl Iterator<Item = &'a String>) -> Vec<(char, String)> {
    const FALLBACK: &str = "123456789#%&@$";
    let mut used = Vec::new();
    let mut fallback = FALLBACK.chars();
    names
        .map(|name| {
            let preferred = name.chars().next().map(|c| c.to_ascii_uppercase());
            let glyph = match preferred {
                Some(c) if c.is_ascii_alphanumeric() && !used.contains(&c) => c,
                _ => fallback.next().unwrap_or('?'),
            };
            used.push(glyph);
            (glyph, name.clone())
        })
        .collect()
}

/// Rasterize the biome polygons onto a `cols` x `rows` grid, top row first, with geysers on top.
pub fn rasterize_world_map(seed: &SeedRecord, cols: usize, rows: usize) -> MapRaster {
    let legend = legend_glyphs(seed.biome_map.keys());
    let mut cells = vec![MapCell::Empty; cols * rows];
    if cols == 0 || rows == 0 {
        return MapRaster {
            cols,
            rows,
            cells,
            legend,
        };
    }

    let width = seed.world_size.width.max(1) as f32;
    let height = seed.world_size.height.max(1) as f32;
    let cell_w = width / cols as f32;
    let cell_h = height / rows as f32;

    for row in 0..rows {
        let y = height - (row as f32 + 0.5) * cell_h;
        for col in 0..cols {
            let x = (col as f32 + 0.5) * cell_w;
            let hit = seed
                .biome_map
                .values()
                .position(|polygons| polygons.iter().any(|polygon| polygon.contains(x, y)));
            if let Some(index) = hit {
                cells[row * cols + col] = MapCell::Biome(index);
            }
        }
    }

    for geyser in &seed.geysers {
        let col = ((geyser.x as f32 / cell_w).floor().max(0.0) as usize).min(cols - 1);
        let from_bottom = ((geyser.y as f32 / cell_h).floor().max(0.0) as usize).min(rows - 1);
        cells[(rows - 1 - from_bottom) * cols + col] = MapCell::Geyser;
    }

    MapRaster {
        cols,
        rows,
        cells,
        legend,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarTier {
    pub distance: u32,
    pub destinations: Vec<String>,
}

pub fn star_tiers(
    destinations: &[SpaceDestination],
    types: &BTreeMap<String, SpaceDestinationType>,
) -> Vec<StarTier> {
    let mut tiers: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for destination in destinations {
        let name = types
            .get(&destination.destination_type_id)
            .map(|kind| kind.name.clone())
            .unwrap_or_else(|| destination.destination_type_id.clone());
        tiers.entry(destination.distance).or_default().push(name);
    }
    tiers
        .into_iter()
        .map(|(distance, destinations)| StarTier {
            distance,
            destinations,
        })
        .collect()
}
