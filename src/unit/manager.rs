//! Unit and satellite collections

use ahash::AHashMap;
use glam::DVec3;
use serde_json::json;
use tracing::debug;

use crate::core::error::{Result, SimError};
use crate::core::types::{FactionId, IdAllocator, SimTime, UnitId};
use crate::narrative::{EventLog, EventType};
use crate::region::{Region, RegionManager};
use crate::unit::{Satellite, Unit, UnitKind};

/// Units and satellites share one id space
#[derive(Debug, Clone, Default)]
pub struct UnitManager {
    units: Vec<Unit>,
    satellites: Vec<Satellite>,
    ids: IdAllocator,
}

impl UnitManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    pub fn satellites(&self) -> &[Satellite] {
        &self.satellites
    }

    pub fn satellites_mut(&mut self) -> impl Iterator<Item = &mut Satellite> {
        self.satellites.iter_mut()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn satellite(&self, id: UnitId) -> Option<&Satellite> {
        self.satellites.iter().find(|s| s.id == id)
    }

    /// Satellites owned per faction
    pub fn satellite_counts(&self) -> AHashMap<FactionId, usize> {
        let mut counts = AHashMap::new();
        for sat in &self.satellites {
            *counts.entry(sat.faction).or_insert(0) += 1;
        }
        counts
    }

    pub fn satellite_count(&self, faction: FactionId) -> usize {
        self.satellites.iter().filter(|s| s.faction == faction).count()
    }

    pub fn unit_count(&self, faction: FactionId) -> usize {
        self.units.iter().filter(|u| u.faction == faction).count()
    }

    /// Place a new unit at the centroid of `region`
    pub fn deploy(
        &mut self,
        faction: FactionId,
        kind: UnitKind,
        region: &Region,
        planet_radius: f64,
        now: SimTime,
        log: &mut EventLog,
    ) -> UnitId {
        let id = UnitId(self.ids.next_id());
        let shell = kind.movement().shell_radius(planet_radius);
        let position = region.position.normalize_or_zero() * shell;
        self.units.push(Unit::new(id, faction, kind, position, Some(region.id)));
        debug!("{} deployed {:?} {} in {}", faction, kind, id, region.name);
        log.record(
            now,
            EventType::UnitDeployed,
            json!({ "unit": id.0, "faction": faction.0, "kind": kind, "region": region.id.0 }),
        );
        id
    }

    /// Put a satellite into orbit. Phase spacing keeps a faction's
    /// constellation evenly distributed.
    pub fn launch(
        &mut self,
        faction: FactionId,
        altitude_km: f64,
        inclination: f64,
        planet_radius: f64,
        now: SimTime,
        log: &mut EventLog,
    ) -> UnitId {
        let id = UnitId(self.ids.next_id());
        let existing = self.satellite_count(faction) as f64;
        let phase = (existing * 2.399_963).rem_euclid(std::f64::consts::TAU);
        self.satellites
            .push(Satellite::new(id, faction, altitude_km, inclination, phase, planet_radius));
        debug!("{} launched satellite {}", faction, id);
        log.record(
            now,
            EventType::SatelliteLaunched,
            json!({ "satellite": id.0, "faction": faction.0, "altitude_km": altitude_km }),
        );
        id
    }

    pub fn move_unit(&mut self, id: UnitId, destination: DVec3, planet_radius: f64) -> Result<()> {
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == id) {
            return unit.move_to(destination, planet_radius);
        }
        if self.satellites.iter().any(|s| s.id == id) {
            return Err(SimError::InvalidCommand(format!("{} is a satellite and cannot be moved", id)));
        }
        Err(SimError::UnitNotFound(id))
    }

    pub fn update(&mut self, dt: f64, planet_radius: f64, regions: &RegionManager) {
        for unit in &mut self.units {
            if unit.update(dt, planet_radius) {
                debug!("{} arrived", unit.id);
            }
            let region = regions.region_id_at(unit.physics.position);
            if region != unit.region {
                unit.region = region;
            }
        }
        for sat in &mut self.satellites {
            sat.update(dt, planet_radius);
        }
    }
}
