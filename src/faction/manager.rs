//! Per-tick faction income

use ahash::AHashMap;

use crate::core::config::SimulationConfig;
use crate::core::types::FactionId;
use crate::faction::{Faction, FactionKind, Resources};
use crate::region::{BuffType, BuildingType, RegionManager};

/// Read-only inputs to income computation
pub struct IncomeSources<'a> {
    pub regions: &'a RegionManager,
    /// Satellites owned per faction
    pub satellite_counts: &'a AHashMap<FactionId, usize>,
    /// Global SATELLITE_DISRUPTION buff suppresses satellite intel
    pub satellites_disrupted: bool,
}

/// Owns every faction. Factions are never destroyed mid-game.
#[derive(Debug, Clone, Default)]
pub struct FactionManager {
    factions: Vec<Faction>,
}

impl FactionManager {
    pub fn new(factions: Vec<Faction>) -> Self {
        Self { factions }
    }

    pub fn add(&mut self, faction: Faction) {
        self.factions.push(faction);
    }

    pub fn get(&self, id: FactionId) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        self.factions.iter_mut().find(|f| f.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Faction> {
        self.factions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// The first player faction, if any
    pub fn player_id(&self) -> Option<FactionId> {
        self.factions
            .iter()
            .find(|f| f.kind == FactionKind::Player)
            .map(|f| f.id)
    }

    pub fn ai_ids(&self) -> Vec<FactionId> {
        self.factions
            .iter()
            .filter(|f| f.is_ai())
            .map(|f| f.id)
            .collect()
    }

    /// Apply one tick of income to every faction
    pub fn update(&mut self, dt: f64, config: &SimulationConfig, sources: &IncomeSources) {
        for faction in &mut self.factions {
            let income = income_for(faction, dt, config, sources);
            faction.earn(&income);
        }
    }
}

/// Income a faction receives over `dt` seconds
pub fn income_for(
    faction: &Faction,
    dt: f64,
    config: &SimulationConfig,
    sources: &IncomeSources,
) -> Resources {
    let trickle = match faction.kind {
        FactionKind::Player => config.player_trickle,
        FactionKind::Ai => {
            let multiplier = 1.0
                + config.ai_milestone_multiplier_step * faction.research.milestones_reached() as f64;
            config.ai_trickle.scaled(multiplier)
        }
    };
    let mut income = trickle.scaled(dt);

    for region in sources.regions.iter() {
        if region.is_owned_by(faction.id) {
            let mut funds = region.economy() * config.region_income_rate;
            if region.has_building(BuildingType::Base) {
                funds *= config.base_income_multiplier;
            }
            income.funds += funds * dt;

            if region.has_building(BuildingType::ResearchOutpost) {
                income.tech += region.education() * config.research_outpost_tech_rate * dt;
            }
        }

        // Informant networks pay whoever planted them, regardless of ownership
        if let Some(buff) = region.buff(BuffType::InformantNetwork) {
            if buff.owner == Some(faction.id) {
                income.intel += config.informant_intel_rate * dt;
            }
        }
    }

    if !sources.satellites_disrupted {
        let satellites = sources
            .satellite_counts
            .get(&faction.id)
            .copied()
            .unwrap_or(0);
        income.intel += satellites as f64 * config.satellite_intel_rate * dt;
    }

    income
}
