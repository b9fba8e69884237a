//! Region collection, travel routes, and spatial membership

use ahash::AHashMap;
use glam::DVec3;
use rayon::prelude::*;

use crate::core::config::SimulationConfig;
use crate::core::types::RegionId;
use crate::region::weather::simple_hash;
use crate::region::{BuffType, Region};

/// Owns every region plus the travel-route graph
#[derive(Debug, Clone, Default)]
pub struct RegionManager {
    regions: Vec<Region>,
    routes: AHashMap<RegionId, Vec<RegionId>>,
}

impl RegionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.regions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Add a bidirectional travel route. Unknown ids and self-loops are ignored.
    pub fn connect(&mut self, a: RegionId, b: RegionId) {
        if a == b || self.get(a).is_none() || self.get(b).is_none() {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            let links = self.routes.entry(from).or_default();
            if !links.contains(&to) {
                links.push(to);
                links.sort();
            }
        }
    }

    /// Regions reachable in one hop, in id order
    pub fn neighbors(&self, id: RegionId) -> &[RegionId] {
        self.routes.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The nearest region whose radius contains `position`
    pub fn region_at(&self, position: DVec3) -> Option<&Region> {
        self.regions
            .iter()
            .filter(|r| r.contains(position))
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
    }

    pub fn region_id_at(&self, position: DVec3) -> Option<RegionId> {
        self.region_at(position).map(|r| r.id)
    }

    /// Passive drift for every region. Returns expired buffs.
    ///
    /// Regions are independent here, so large maps are processed on rayon.
    pub fn update(&mut self, dt: f64, config: &SimulationConfig, tick_seed: u64) -> Vec<(RegionId, BuffType)> {
        let drift = |region: &mut Region| {
            let seed = simple_hash(tick_seed, region.id.0 as u64);
            region
                .drift(dt, config, seed)
                .into_iter()
                .map(|kind| (region.id, kind))
                .collect::<Vec<_>>()
        };

        if self.regions.len() >= config.parallel_threshold {
            self.regions.par_iter_mut().flat_map_iter(drift).collect()
        } else {
            self.regions.iter_mut().flat_map(drift).collect()
        }
    }
}
