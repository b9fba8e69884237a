//! Radiological plume particles
//!
//! Every live RAD threat emits particles in proportion to its contamination.
//! Particles ride the wind of the region they are over, stay pinned to the
//! planet surface, and expire after a fixed lifetime.

use ahash::AHashMap;
use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::ThreatId;
use crate::region::RegionManager;
use crate::threat::properties::DomainProperties;
use crate::threat::Threat;

/// Hard cap on live particles
pub const MAX_PARTICLES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlumeParticle {
    pub source: ThreatId,
    pub position: DVec3,
    pub age: f64,
    /// Contamination at emission
    pub initial: f64,
    /// Contamination carried, fades linearly with age
    pub intensity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PlumeSystem {
    particles: Vec<PlumeParticle>,
    /// Fractional emissions carried between ticks
    pending: AHashMap<ThreatId, f64>,
}

impl PlumeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(&self) -> &[PlumeParticle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Sum of particle intensity within `radius` of `position`
    pub fn intensity_near(&self, position: DVec3, radius: f64) -> f64 {
        let r2 = radius * radius;
        self.particles
            .iter()
            .filter(|p| p.position.distance_squared(position) <= r2)
            .map(|p| p.intensity)
            .sum()
    }

    pub fn update(
        &mut self,
        dt: f64,
        threats: &[Threat],
        regions: &RegionManager,
        config: &SimulationConfig,
        rng: &mut ChaCha8Rng,
    ) {
        let lifetime = config.plume_particle_lifetime;
        let radius = config.planet_radius;

        for particle in &mut self.particles {
            particle.age += dt;
            if let Some(region) = regions.region_at(particle.position) {
                let moved = particle.position + region.weather.wind_at(particle.position) * dt;
                particle.position = moved.normalize_or_zero() * radius;
            }
            particle.intensity = (1.0 - particle.age / lifetime).max(0.0) * particle.initial;
        }
        self.particles.retain(|p| p.age < lifetime && p.intensity > 0.0);

        // Drop carry-over for sources that no longer exist
        self.pending
            .retain(|id, _| threats.iter().any(|t| t.id == *id && !t.is_mitigated()));

        for threat in threats {
            if threat.is_mitigated() {
                continue;
            }
            let DomainProperties::Radiological(rad) = threat.properties() else {
                continue;
            };
            let owed = self.pending.entry(threat.id).or_insert(0.0);
            *owed += rad.contamination * config.plume_emission_rate * dt;
            while *owed >= 1.0 && self.particles.len() < MAX_PARTICLES {
                *owed -= 1.0;
                let jitter = DVec3::new(
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                    rng.gen_range(-0.5..0.5),
                );
                self.particles.push(PlumeParticle {
                    source: threat.id,
                    position: (threat.position + jitter).normalize_or_zero() * radius,
                    age: 0.0,
                    initial: rad.contamination,
                    intensity: rad.contamination,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::properties::RadiologicalProperties;
    use crate::threat::{ThreatDomain, ThreatSpawn, ThreatType};
    use rand::SeedableRng;

    fn rad_threat(contamination: f64) -> Threat {
        Threat::new(
            ThreatId(7),
            ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, contamination, DVec3::Z * 100.0)
                .with_properties(DomainProperties::Radiological(RadiologicalProperties {
                    contamination,
                    half_life: 600.0,
                })),
            0.0,
        )
    }

    #[test]
    fn test_emission_scales_with_contamination() {
        let config = SimulationConfig::default();
        let regions = RegionManager::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut plume = PlumeSystem::new();
        let threats = vec![rad_threat(0.5)];

        plume.update(1.0, &threats, &regions, &config, &mut rng);
        let expected = (0.5 * config.plume_emission_rate).floor() as usize;
        assert_eq!(plume.len(), expected);
        for p in plume.particles() {
            assert!((p.position.length() - config.planet_radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_particles_expire() {
        let config = SimulationConfig::default();
        let regions = RegionManager::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut plume = PlumeSystem::new();
        plume.update(1.0, &[rad_threat(1.0)], &regions, &config, &mut rng);
        assert!(!plume.is_empty());

        plume.update(config.plume_particle_lifetime + 1.0, &[], &regions, &config, &mut rng);
        assert!(plume.is_empty());
    }

    #[test]
    fn test_non_rad_threats_emit_nothing() {
        let config = SimulationConfig::default();
        let regions = RegionManager::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut plume = PlumeSystem::new();
        let cyber = Threat::new(
            ThreatId(1),
            ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 1.0, DVec3::Z * 100.0),
            0.0,
        );
        plume.update(10.0, &[cyber], &regions, &config, &mut rng);
        assert!(plume.is_empty());
    }
}
