//! Regions - the geographic and political units of the map
//!
//! Stability, economy, and education are normalized scalars. Every write goes
//! through a setter that clamps to [0, 1] and marks the region dirty for the
//! delta protocol.

pub mod buff;
pub mod manager;
pub mod weather;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::SimError;
use crate::core::types::{clamp01, lat_lon_to_position, FactionId, RegionId};

pub use buff::{Buff, BuffType, GlobalBuff, GlobalBuffType, GlobalBuffs};
pub use manager::RegionManager;
pub use weather::{Weather, WeatherState};

/// People per unit of area at which density saturates to 1.0
pub const REFERENCE_DENSITY: f64 = 2.0e6;

/// Who controls a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Owner {
    #[default]
    Neutral,
    Faction(FactionId),
}

impl Owner {
    pub fn faction(&self) -> Option<FactionId> {
        match self {
            Owner::Neutral => None,
            Owner::Faction(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub count: u64,
    /// Fractional growth per second
    pub growth_rate: f64,
}

/// Structures a faction can place in a region. Unique per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingType {
    Base,
    ResearchOutpost,
    SensorArray,
}

impl std::str::FromStr for BuildingType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BASE" => Ok(Self::Base),
            "RESEARCH_OUTPOST" => Ok(Self::ResearchOutpost),
            "SENSOR_ARRAY" => Ok(Self::SensorArray),
            other => Err(SimError::Data(format!("unknown building '{}'", other))),
        }
    }
}

/// A geographic/political unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Centroid in game space
    pub position: DVec3,
    /// Membership radius in game-space units
    pub radius: f64,
    stability: f64,
    economy: f64,
    education: f64,
    population: Population,
    owner: Owner,
    pub weather: WeatherState,
    buffs: Vec<Buff>,
    buildings: Vec<BuildingType>,
    /// Fractional people not yet added to (or removed from) the count
    #[serde(default)]
    growth_carry: f64,
    #[serde(skip)]
    dirty: bool,
}

impl Region {
    pub fn new(
        id: RegionId,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        radius: f64,
        planet_radius: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            lat,
            lon,
            position: lat_lon_to_position(lat, lon, planet_radius),
            radius,
            stability: 0.5,
            economy: 0.5,
            education: 0.5,
            population: Population {
                count: 1_000_000,
                growth_rate: 0.0,
            },
            owner: Owner::Neutral,
            weather: WeatherState::new(),
            buffs: Vec::new(),
            buildings: Vec::new(),
            growth_carry: 0.0,
            dirty: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn test_region(id: RegionId, lat: f64, lon: f64) -> Self {
        Self::new(id, format!("Test {}", id.0), lat, lon, 15.0, 100.0)
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub fn economy(&self) -> f64 {
        self.economy
    }

    pub fn education(&self) -> f64 {
        self.education
    }

    pub fn set_stability(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.stability {
            self.stability = value;
            self.dirty = true;
        }
    }

    pub fn set_economy(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.economy {
            self.economy = value;
            self.dirty = true;
        }
    }

    pub fn set_education(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.education {
            self.education = value;
            self.dirty = true;
        }
    }

    pub fn adjust_stability(&mut self, delta: f64) {
        self.set_stability(self.stability + delta);
    }

    pub fn adjust_economy(&mut self, delta: f64) {
        self.set_economy(self.economy + delta);
    }

    pub fn adjust_education(&mut self, delta: f64) {
        self.set_education(self.education + delta);
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn set_population(&mut self, population: Population) {
        self.population = population;
        self.growth_carry = 0.0;
        self.dirty = true;
    }

    /// Normalized population density in [0, 1]
    pub fn population_density(&self) -> f64 {
        let area = std::f64::consts::PI * self.radius * self.radius;
        if area <= 0.0 {
            return 0.0;
        }
        clamp01(self.population.count as f64 / area / REFERENCE_DENSITY)
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Owner) {
        if owner != self.owner {
            self.owner = owner;
            self.dirty = true;
        }
    }

    pub fn is_owned_by(&self, faction: FactionId) -> bool {
        self.owner == Owner::Faction(faction)
    }

    /// True if `position` is within this region's radius
    pub fn contains(&self, position: DVec3) -> bool {
        self.position.distance(position) <= self.radius
    }

    // === BUFFS ===

    pub fn buffs(&self) -> &[Buff] {
        &self.buffs
    }

    pub fn has_buff(&self, kind: BuffType) -> bool {
        self.buffs.iter().any(|b| b.kind == kind)
    }

    pub fn buff(&self, kind: BuffType) -> Option<&Buff> {
        self.buffs.iter().find(|b| b.kind == kind)
    }

    /// Apply a buff. A type already present is left as-is and false is returned.
    pub fn add_buff(&mut self, buff: Buff) -> bool {
        if self.has_buff(buff.kind) {
            return false;
        }
        self.buffs.push(buff);
        self.dirty = true;
        true
    }

    /// Reset an existing buff's duration. Returns false if it is not active.
    pub fn refresh_buff(&mut self, kind: BuffType, duration: f64) -> bool {
        match self.buffs.iter_mut().find(|b| b.kind == kind) {
            Some(buff) => {
                buff.remaining = duration.max(0.0);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn remove_buff(&mut self, kind: BuffType) -> bool {
        let before = self.buffs.len();
        self.buffs.retain(|b| b.kind != kind);
        let removed = self.buffs.len() != before;
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// Tick buff timers down, returns the expired types
    pub fn tick_buffs(&mut self, dt: f64) -> Vec<BuffType> {
        if self.buffs.is_empty() {
            return Vec::new();
        }
        let mut expired = Vec::new();
        for buff in &mut self.buffs {
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                expired.push(buff.kind);
            }
        }
        self.buffs.retain(|b| b.remaining > 0.0);
        if !expired.is_empty() {
            self.dirty = true;
        }
        expired
    }

    // === BUILDINGS ===

    pub fn buildings(&self) -> &[BuildingType] {
        &self.buildings
    }

    pub fn has_building(&self, kind: BuildingType) -> bool {
        self.buildings.contains(&kind)
    }

    pub fn add_building(&mut self, kind: BuildingType) -> bool {
        if self.has_building(kind) {
            return false;
        }
        self.buildings.push(kind);
        self.dirty = true;
        true
    }

    // === PASSIVE DRIFT ===

    /// Passive per-tick evolution. `seed` drives weather rolls.
    pub fn drift(&mut self, dt: f64, config: &SimulationConfig, seed: u64) -> Vec<BuffType> {
        let expired = self.tick_buffs(dt);

        if self.weather.update(dt, seed) {
            self.dirty = true;
        }

        let toward_baseline = (config.stability_baseline - self.stability) * config.stability_drift_rate;
        self.adjust_stability(toward_baseline * dt);

        let mut growth = self.education * config.economy_growth_rate * self.weather.current.economy_modifier();
        if self.has_buff(BuffType::EconomicStimulus) {
            growth += 0.002;
        }
        self.adjust_economy(growth * dt);

        if self.has_buff(BuffType::EducationDrive) {
            self.adjust_education(0.001 * dt);
        }

        if self.population.growth_rate != 0.0 {
            self.growth_carry += self.population.count as f64 * self.population.growth_rate * dt;
            let whole = self.growth_carry.trunc();
            if whole != 0.0 {
                self.growth_carry -= whole;
                let count = if whole > 0.0 {
                    self.population.count.saturating_add(whole as u64)
                } else {
                    self.population.count.saturating_sub(whole.abs() as u64)
                };
                if count == 0 {
                    self.growth_carry = 0.0;
                }
                if count != self.population.count {
                    self.population.count = count;
                    self.dirty = true;
                }
            }
        }

        expired
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_setters_clamp() {
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        region.set_stability(1.7);
        region.adjust_economy(-3.0);
        assert_eq!(region.stability(), 1.0);
        assert_eq!(region.economy(), 0.0);
    }

    #[test]
    fn test_buff_does_not_stack() {
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        assert!(region.add_buff(Buff::new(BuffType::Quarantine, 30.0, None)));
        assert!(!region.add_buff(Buff::new(BuffType::Quarantine, 90.0, None)));
        assert_eq!(region.buffs().len(), 1);
        assert_eq!(region.buff(BuffType::Quarantine).unwrap().remaining, 30.0);

        assert!(region.refresh_buff(BuffType::Quarantine, 90.0));
        assert_eq!(region.buff(BuffType::Quarantine).unwrap().remaining, 90.0);
    }

    #[test]
    fn test_buff_expiry() {
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        region.add_buff(Buff::new(BuffType::NetworkScrub, 1.0, None));
        assert!(region.tick_buffs(0.5).is_empty());
        assert_eq!(region.tick_buffs(0.6), vec![BuffType::NetworkScrub]);
        assert!(!region.has_buff(BuffType::NetworkScrub));
    }

    #[test]
    fn test_contains_uses_radius() {
        let region = Region::test_region(RegionId(1), 0.0, 0.0);
        assert!(region.contains(region.position));
        assert!(!region.contains(region.position * 2.0));
    }

    #[test]
    fn test_stability_relaxes_toward_baseline() {
        let config = SimulationConfig::default();
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        region.set_stability(0.1);
        region.drift(10.0, &config, 1);
        assert!(region.stability() > 0.1);
    }

    #[test]
    fn test_small_population_accumulates_growth() {
        let config = SimulationConfig::default();
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        region.set_population(Population {
            count: 100,
            growth_rate: 0.001,
        });
        // 0.1 people per step
        for _ in 0..25 {
            region.drift(1.0, &config, 1);
        }
        assert_eq!(region.population().count, 102);

        region.set_population(Population {
            count: 100,
            growth_rate: -0.001,
        });
        for _ in 0..25 {
            region.drift(1.0, &config, 1);
        }
        assert_eq!(region.population().count, 98);
    }

    #[test]
    fn test_unique_buildings() {
        let mut region = Region::test_region(RegionId(1), 0.0, 0.0);
        assert!(region.add_building(BuildingType::Base));
        assert!(!region.add_building(BuildingType::Base));
    }

    proptest! {
        #[test]
        fn prop_region_scalars_stay_normalized(
            deltas in proptest::collection::vec((-2.0f64..2.0, -2.0f64..2.0, -2.0f64..2.0), 1..30),
            dt in 0.0f64..100.0,
        ) {
            let config = SimulationConfig::default();
            let mut region = Region::test_region(RegionId(1), 10.0, 10.0);
            region.add_buff(Buff::new(BuffType::EconomicStimulus, 1000.0, None));
            region.add_buff(Buff::new(BuffType::EducationDrive, 1000.0, None));
            for (s, e, d) in deltas {
                region.adjust_stability(s);
                region.adjust_economy(e);
                region.adjust_education(d);
                region.drift(dt, &config, 3);
                prop_assert!((0.0..=1.0).contains(&region.stability()));
                prop_assert!((0.0..=1.0).contains(&region.economy()));
                prop_assert!((0.0..=1.0).contains(&region.education()));
            }
        }
    }
}
