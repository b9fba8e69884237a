//! Bundled static data and loaders
//!
//! Region definitions and the ability catalog are JSON, the player action
//! catalog is TOML. All three are embedded in the binary and can also be
//! read from disk.

use std::path::Path;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::actions::ActionCatalog;
use crate::agent::AbilityCatalog;
use crate::core::error::{Result, SimError};
use crate::core::types::{FactionId, RegionId};
use crate::faction::{Faction, FactionKind, Resources};
use crate::region::{Owner, Population, Region, RegionManager};

const REGIONS_JSON: &str = include_str!("../../data/regions.json");
const ABILITIES_JSON: &str = include_str!("../../data/abilities.json");
const ACTIONS_TOML: &str = include_str!("../../data/actions.toml");

pub const PLAYER_FACTION: FactionId = FactionId(0);
pub const AI_FACTION: FactionId = FactionId(1);

/// A region as written in static data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDef {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    #[serde(default = "half")]
    pub stability: f64,
    #[serde(default = "half")]
    pub economy: f64,
    #[serde(default = "half")]
    pub education: f64,
    #[serde(default)]
    pub population: u64,
    #[serde(default)]
    pub growth_rate: f64,
    /// Faction id of the starting owner
    #[serde(default)]
    pub owner: Option<u32>,
    /// Ids of regions reachable in one hop
    #[serde(default)]
    pub routes: Vec<u32>,
}

fn half() -> f64 {
    0.5
}

impl RegionDef {
    fn build(&self, planet_radius: f64) -> Region {
        let mut region = Region::new(
            RegionId(self.id),
            self.name.clone(),
            self.lat,
            self.lon,
            self.radius,
            planet_radius,
        );
        region.set_stability(self.stability);
        region.set_economy(self.economy);
        region.set_education(self.education);
        region.set_population(Population {
            count: self.population,
            growth_rate: self.growth_rate,
        });
        if let Some(owner) = self.owner {
            region.set_owner(Owner::Faction(FactionId(owner)));
        }
        region
    }
}

/// Build a region manager from JSON definitions
pub fn parse_regions(content: &str, planet_radius: f64) -> Result<RegionManager> {
    let defs: Vec<RegionDef> = serde_json::from_str(content)?;

    let mut ids = AHashSet::new();
    for def in &defs {
        if !ids.insert(def.id) {
            return Err(SimError::Data(format!("duplicate region id {}", def.id)));
        }
        if def.radius <= 0.0 {
            return Err(SimError::Data(format!("region {} has non-positive radius", def.id)));
        }
    }
    if let Some((def, bad)) = defs
        .iter()
        .find_map(|d| d.routes.iter().find(|r| !ids.contains(*r)).map(|r| (d, *r)))
    {
        return Err(SimError::Data(format!(
            "region {} routes to unknown region {}",
            def.id, bad
        )));
    }

    let mut regions = RegionManager::new();
    for def in &defs {
        regions.add(def.build(planet_radius));
    }
    for def in &defs {
        for &to in &def.routes {
            regions.connect(RegionId(def.id), RegionId(to));
        }
    }
    Ok(regions)
}

pub fn default_regions(planet_radius: f64) -> Result<RegionManager> {
    parse_regions(REGIONS_JSON, planet_radius)
}

pub fn load_regions(path: &Path, planet_radius: f64) -> Result<RegionManager> {
    let content = std::fs::read_to_string(path)?;
    parse_regions(&content, planet_radius)
}

pub fn default_abilities() -> Result<AbilityCatalog> {
    AbilityCatalog::from_json_str(ABILITIES_JSON)
}

pub fn default_actions() -> Result<ActionCatalog> {
    ActionCatalog::from_toml_str(ACTIONS_TOML)
}

/// The Directorate and its rival
pub fn default_factions() -> Vec<Faction> {
    vec![
        Faction::new(
            PLAYER_FACTION,
            "Global Watch Directorate",
            FactionKind::Player,
            Resources::new(1000.0, 100.0, 50.0),
        ),
        Faction::new(
            AI_FACTION,
            "Helix Syndicate",
            FactionKind::Ai,
            Resources::new(800.0, 100.0, 50.0),
        ),
    ]
}
