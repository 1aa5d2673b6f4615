//! Data contracts shared by the seed store service and the seed browser.
//!
//! Everything that crosses the wire or lands in a library file lives here:
//! seed records, reference lookups, invalid-seed reports and the
//! request/response envelopes exchanged over a framed TCP connection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod frame;

pub use frame::{
    read_frame, read_frame_async, write_frame, write_frame_async, FrameError, MAX_FRAME_BYTES,
};

/// Parsed identity of a seed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeedKey {
    pub seed_number: i64,
    pub game_version: u32,
}

impl SeedKey {
    pub fn new(seed_number: i64, game_version: u32) -> Self {
        Self {
            seed_number,
            game_version,
        }
    }
}

impl fmt::Display for SeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.seed_number, self.game_version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid seed number '{0}'")]
    SeedNumber(String),
    #[error("invalid game version '{0}'")]
    GameVersion(String),
}

/// Fetch key exactly as it arrived from the route.
///
/// Parsing is left to the store so the browser forwards whatever the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedDetailsRequest {
    pub seed_number: String,
    pub game_version: String,
}

impl SeedDetailsRequest {
    pub fn new(seed_number: impl Into<String>, game_version: impl Into<String>) -> Self {
        Self {
            seed_number: seed_number.into(),
            game_version: game_version.into(),
        }
    }

    pub fn parse_key(&self) -> Result<SeedKey, KeyError> {
        let seed_number = self
            .seed_number
            .trim()
            .parse::<i64>()
            .map_err(|_| KeyError::SeedNumber(self.seed_number.clone()))?;
        let game_version = self
            .game_version
            .trim()
            .parse::<u32>()
            .map_err(|_| KeyError::GameVersion(self.game_version.clone()))?;
        Ok(SeedKey::new(seed_number, game_version))
    }
}

impl From<SeedKey> for SeedDetailsRequest {
    fn from(key: SeedKey) -> Self {
        Self::new(key.seed_number.to_string(), key.game_version.to_string())
    }
}

impl fmt::Display for SeedDetailsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.seed_number, self.game_version)
    }
}

/// User-submitted flag that a seed does not reproduce in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvalidSeedReport {
    pub seed_number: i64,
    pub game_version: u32,
}

impl InvalidSeedReport {
    pub fn key(&self) -> SeedKey {
        SeedKey::new(self.seed_number, self.game_version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAck {
    pub seed_number: i64,
    pub game_version: u32,
    pub report_count: u32,
    pub flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WorldSize {
    fn default() -> Self {
        Self {
            width: 256,
            height: 384,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geyser {
    pub geyser_type_id: String,
    pub x: i32,
    pub y: i32,
    /// Average emission in grams per second.
    #[serde(default)]
    pub emit_rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomePolygon {
    pub points: Vec<MapPoint>,
}

impl BiomePolygon {
    /// Even-odd containment test.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let points = &self.points;
        if points.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = points.len() - 1;
        for i in 0..points.len() {
            let (a, b) = (points[i], points[j]);
            if (a.y > y) != (b.y > y) {
                let cross_x = (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x;
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Biome name to the polygons it covers, in world cell coordinates.
pub type BiomeMap = BTreeMap<String, Vec<BiomePolygon>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceDestination {
    pub destination_type_id: String,
    pub distance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub seed_number: i64,
    pub game_version: u32,
    #[serde(default)]
    pub world_size: WorldSize,
    #[serde(default)]
    pub geysers: Vec<Geyser>,
    #[serde(default)]
    pub biome_sizes: BTreeMap<String, f64>,
    #[serde(default)]
    pub starting_biome_element_masses: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub element_masses: BTreeMap<String, f64>,
    #[serde(default)]
    pub biome_map: BiomeMap,
    #[serde(default)]
    pub space_destinations: Vec<SpaceDestination>,
    #[serde(default)]
    pub game_upgrade_ids: Vec<String>,
}

impl SeedRecord {
    pub fn key(&self) -> SeedKey {
        SeedKey::new(self.seed_number, self.game_version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeyserType {
    pub name: String,
    #[serde(default)]
    pub element_id: String,
    /// Output temperature in degrees Celsius.
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpgrade {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceDestinationType {
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    Solid,
    Liquid,
    Gas,
}

impl ElementState {
    pub fn label(self) -> &'static str {
        match self {
            ElementState::Solid => "solid",
            ElementState::Liquid => "liquid",
            ElementState::Gas => "gas",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBasicInfo {
    pub name: String,
    pub state: ElementState,
    /// Hex colour, e.g. `#7f7f7f`.
    #[serde(default)]
    pub color: String,
}

/// Lookup tables loaded independently of any particular seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub geyser_types: BTreeMap<String, GeyserType>,
    pub game_upgrades: BTreeMap<String, GameUpgrade>,
    pub space_destination_types: BTreeMap<String, SpaceDestinationType>,
    pub elements: BTreeMap<String, ElementBasicInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreRequest {
    GetSeed(SeedDetailsRequest),
    GetReferenceData,
    ReportInvalidSeed(InvalidSeedReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreResponse {
    Seed(SeedRecord),
    ReferenceData(ReferenceData),
    ReportAccepted(ReportAck),
    NotFound(SeedDetailsRequest),
    Rejected(String),
}

pub fn encode_request(request: &StoreRequest) -> bincode::Result<Vec<u8>> {
    bincode::serialize(request)
}

pub fn decode_request(data: &[u8]) -> bincode::Result<StoreRequest> {
    bincode::deserialize(data)
}

pub fn encode_response(response: &StoreResponse) -> bincode::Result<Vec<u8>> {
    bincode::serialize(response)
}

pub fn decode_response(data: &[u8]) -> bincode::Result<StoreResponse> {
    bincode::deserialize(data)
}

pub fn encode_seed_json(seed: &SeedRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(seed)
}

pub fn decode_seed_json(data: &str) -> serde_json::Result<SeedRecord> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f32, max: f32) -> BiomePolygon {
        BiomePolygon {
            points: vec![
                MapPoint { x: min, y: min },
                MapPoint { x: max, y: min },
                MapPoint { x: max, y: max },
                MapPoint { x: min, y: max },
            ],
        }
    }

    #[test]
    fn request_parses_trimmed_integers() {
        let request = SeedDetailsRequest::new(" 123 ", "4");
        assert_eq!(request.parse_key(), Ok(SeedKey::new(123, 4)));
    }

    #[test]
    fn request_rejects_non_numeric_parts() {
        let bad_seed = SeedDetailsRequest::new("abc", "4");
        assert_eq!(
            bad_seed.parse_key(),
            Err(KeyError::SeedNumber("abc".to_string()))
        );

        let bad_version = SeedDetailsRequest::new("12", "-1");
        assert_eq!(
            bad_version.parse_key(),
            Err(KeyError::GameVersion("-1".to_string()))
        );
    }

    #[test]
    fn polygon_containment_uses_even_odd_rule() {
        let polygon = square(0.0, 10.0);
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(15.0, 5.0));
        assert!(!polygon.contains(5.0, -1.0));

        let degenerate = BiomePolygon {
            points: vec![MapPoint { x: 0.0, y: 0.0 }, MapPoint { x: 1.0, y: 1.0 }],
        };
        assert!(!degenerate.contains(0.5, 0.5));
    }

    #[test]
    fn seed_json_fills_missing_collections() {
        let seed = decode_seed_json(r#"{ "seed_number": 7, "game_version": 2 }"#)
            .expect("minimal seed should parse");
        assert_eq!(seed.key(), SeedKey::new(7, 2));
        assert!(seed.geysers.is_empty());
        assert!(seed.biome_map.is_empty());
        assert_eq!(seed.world_size, WorldSize::default());
    }

    #[test]
    fn response_survives_bincode_encoding() {
        let response = StoreResponse::NotFound(SeedDetailsRequest::new("1", "2"));
        let bytes = encode_response(&response).expect("encode");
        assert_eq!(decode_response(&bytes).expect("decode"), response);
    }
}
