//! Live threat set and the per-tick threat pipeline
//!
//! Order within `update`:
//! 1. domain logic for every threat
//! 2. domain outcomes (events, one-shot impacts, funds drains, child spawns)
//! 3. continuous region damage
//! 4. removal sweep for mitigated threats
//! 5. BIO contagion
//! 6. cross-domain interactions
//! 7. plume particles

use ahash::AHashSet;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{debug, info};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{IdAllocator, RegionId, SimTime, ThreatId};
use crate::faction::FactionManager;
use crate::narrative::{EventLog, EventType};
use crate::region::{BuffType, RegionManager};
use crate::threat::domain_logic::{self, DomainContext, DomainOutcome};
use crate::threat::interaction::InteractionMatrix;
use crate::threat::plume::PlumeSystem;
use crate::threat::properties::DomainProperties;
use crate::threat::{Threat, ThreatDomain, ThreatSpawn, ThreatType};

/// Everything the threat pipeline touches outside the threat set
pub struct ThreatTickContext<'a> {
    pub regions: &'a mut RegionManager,
    pub factions: &'a mut FactionManager,
    pub log: &'a mut EventLog,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a SimulationConfig,
    pub now: SimTime,
}

#[derive(Debug, Clone)]
pub struct ThreatManager {
    threats: Vec<Threat>,
    ids: IdAllocator,
    interactions: InteractionMatrix,
    plume: PlumeSystem,
    /// Pairs whose interaction event has been logged
    logged_pairs: AHashSet<(ThreatId, ThreatId)>,
    mitigated_by_player: u32,
    mitigated_total: u32,
}

impl Default for ThreatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatManager {
    pub fn new() -> Self {
        Self::with_interactions(InteractionMatrix::with_defaults())
    }

    pub fn with_interactions(interactions: InteractionMatrix) -> Self {
        Self {
            threats: Vec::new(),
            ids: IdAllocator::new(),
            interactions,
            plume: PlumeSystem::new(),
            logged_pairs: AHashSet::new(),
            mitigated_by_player: 0,
            mitigated_total: 0,
        }
    }

    pub fn interactions_mut(&mut self) -> &mut InteractionMatrix {
        &mut self.interactions
    }

    pub fn plume(&self) -> &PlumeSystem {
        &self.plume
    }

    pub fn get(&self, id: ThreatId) -> Option<&Threat> {
        self.threats.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: ThreatId) -> Option<&mut Threat> {
        self.threats.iter_mut().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Threat> {
        self.threats.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Threat> {
        self.threats.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.threats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threats.is_empty()
    }

    /// Threats mitigated by the player and removed so far
    pub fn mitigated_by_player(&self) -> u32 {
        self.mitigated_by_player
    }

    pub fn mitigated_total(&self) -> u32 {
        self.mitigated_total
    }

    /// Live threats whose hosting region is `region`
    pub fn count_in_region(&self, regions: &RegionManager, region: RegionId) -> usize {
        self.threats
            .iter()
            .filter(|t| regions.region_id_at(t.position) == Some(region))
            .count()
    }

    /// Create a threat from `spawn` and log it
    pub fn spawn(&mut self, spawn: ThreatSpawn, now: SimTime, log: &mut EventLog) -> ThreatId {
        let id = ThreatId(self.ids.next_id());
        let threat = Threat::new(id, spawn, now);
        debug!(
            "Threat {} created: {} severity {:.2}",
            id,
            threat.domain,
            threat.severity()
        );
        log.record(
            now,
            EventType::ThreatCreated,
            json!({
                "threat": id.0,
                "domain": threat.domain,
                "severity": threat.severity(),
                "origin": threat.origin.map(|f| f.0),
            }),
        );
        self.threats.push(threat);
        id
    }

    /// Advance investigation on a threat; logs on completion
    pub fn investigate(&mut self, id: ThreatId, amount: f64, now: SimTime, log: &mut EventLog) -> Result<bool> {
        let threat = self.get_mut(id).ok_or(SimError::ThreatNotFound(id))?;
        let completed = threat.investigate(amount);
        if completed {
            log.record(
                now,
                EventType::ThreatInvestigated,
                json!({ "threat": id.0, "type": threat.true_type() }),
            );
        }
        Ok(completed)
    }

    /// Mitigate an investigated threat. Removal happens on the next sweep.
    pub fn mitigate(&mut self, id: ThreatId, by_player: bool) -> Result<bool> {
        let threat = self.get_mut(id).ok_or(SimError::ThreatNotFound(id))?;
        Ok(threat.mitigate(by_player))
    }

    pub fn update(&mut self, dt: f64, ctx: &mut ThreatTickContext) {
        // 1. Domain logic
        let mut outcomes: Vec<(ThreatDomain, ThreatType, DomainOutcome)> = Vec::new();
        for threat in &mut self.threats {
            let region = ctx.regions.region_at(threat.position);
            let mut domain_ctx = DomainContext {
                region,
                rng: &mut *ctx.rng,
            };
            let outcome = domain_logic::update(threat, dt, &mut domain_ctx);
            if !outcome.is_empty() {
                outcomes.push((threat.domain, threat.true_type(), outcome));
            }
        }

        // 2. Outcomes
        let mut children = Vec::new();
        for (domain, threat_type, outcome) in outcomes {
            for (event_type, data) in outcome.events {
                ctx.log.record(ctx.now, event_type, data);
            }
            // Fake threats look alive but never harm anything
            if threat_type == ThreatType::Fake {
                continue;
            }
            if let Some(impact) = outcome.region_impact {
                if let Some(region) = ctx.regions.get_mut(impact.region) {
                    let mut factor = 1.0;
                    if domain == ThreatDomain::Geo && region.has_buff(BuffType::Fortified) {
                        factor = ctx.config.fortified_damage_factor;
                    }
                    region.adjust_stability(-impact.stability * factor);
                    region.adjust_economy(-impact.economy * factor);
                }
            }
            if let Some(drain) = outcome.funds_drain {
                if let Some(faction) = ctx.factions.get_mut(drain.faction) {
                    faction.drain_funds(drain.amount);
                }
            }
            children.extend(outcome.spawns);
        }

        // 3. Continuous damage
        self.apply_region_damage(dt, ctx);

        // 4. Removal sweep
        self.sweep_mitigated(ctx);

        for spawn in children {
            self.spawn(spawn, ctx.now, ctx.log);
        }

        // 5. Contagion
        self.spread_contagion(dt, ctx);

        // 6. Interactions
        let membership: Vec<Option<RegionId>> = self
            .threats
            .iter()
            .map(|t| ctx.regions.region_id_at(t.position))
            .collect();
        let events = self
            .interactions
            .sweep(&mut self.threats, &membership, dt, &mut self.logged_pairs);
        for (event_type, data) in events {
            ctx.log.record(ctx.now, event_type, data);
        }

        // 7. Plume
        self.plume
            .update(dt, &self.threats, ctx.regions, ctx.config, ctx.rng);
    }

    fn apply_region_damage(&self, dt: f64, ctx: &mut ThreatTickContext) {
        for threat in &self.threats {
            if threat.is_mitigated() || threat.true_type() == ThreatType::Fake {
                continue;
            }
            let Some(region_id) = ctx.regions.region_id_at(threat.position) else {
                continue;
            };
            let Some(region) = ctx.regions.get_mut(region_id) else {
                continue;
            };
            let (economic, stability) = threat.domain.damage_multipliers();
            let mut damage = threat.severity() * ctx.config.damage_rate * dt;
            if threat.domain == ThreatDomain::Geo && region.has_buff(BuffType::Fortified) {
                damage *= ctx.config.fortified_damage_factor;
            }
            region.adjust_economy(-damage * economic);
            region.adjust_stability(-damage * stability);
        }
    }

    fn sweep_mitigated(&mut self, ctx: &mut ThreatTickContext) {
        let mut removed = Vec::new();
        let mut by_player = 0;
        self.threats.retain(|t| {
            if !t.is_mitigated() {
                return true;
            }
            if t.was_mitigated_by_player() {
                by_player += 1;
            }
            removed.push((t.id, t.domain, t.was_mitigated_by_player()));
            false
        });
        if removed.is_empty() {
            return;
        }

        self.mitigated_by_player += by_player;
        self.mitigated_total += removed.len() as u32;
        for (id, domain, player) in &removed {
            info!("Threat {} ({}) removed", id, domain);
            ctx.log.record(
                ctx.now,
                EventType::ThreatMitigated,
                json!({ "threat": id.0, "domain": domain, "by_player": player }),
            );
        }
        self.logged_pairs
            .retain(|(a, b)| !removed.iter().any(|(id, _, _)| id == a || id == b));
    }

    fn spread_contagion(&mut self, dt: f64, ctx: &mut ThreatTickContext) {
        let config = ctx.config;
        let mut infected: AHashSet<RegionId> = self
            .threats
            .iter()
            .filter(|t| t.domain == ThreatDomain::Bio && !t.is_mitigated())
            .filter_map(|t| ctx.regions.region_id_at(t.position))
            .collect();

        let mut seeds = Vec::new();
        for threat in &mut self.threats {
            if threat.domain != ThreatDomain::Bio
                || threat.is_mitigated()
                || threat.severity() <= config.bio_spread_threshold
            {
                continue;
            }
            let Some(region) = ctx.regions.region_at(threat.position) else {
                continue;
            };
            let DomainProperties::Biological(bio) = threat.properties_untracked_mut() else {
                continue;
            };
            bio.spread_timer += dt;
            if bio.spread_timer < config.bio_spread_interval {
                continue;
            }
            bio.spread_timer = 0.0;

            if region.has_buff(BuffType::Quarantine) {
                debug!("Threat {} contained by quarantine in {}", threat.id, region.name);
                ctx.log.record(
                    ctx.now,
                    EventType::ContagionContained,
                    json!({ "threat": threat.id.0, "region": region.id.0 }),
                );
                continue;
            }

            let candidates: Vec<RegionId> = ctx
                .regions
                .neighbors(region.id)
                .iter()
                .copied()
                .filter(|r| !infected.contains(r))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let target = candidates[ctx.rng.gen_range(0..candidates.len())];
            let Some(target_region) = ctx.regions.get(target) else {
                continue;
            };
            infected.insert(target);

            let mut spawn = ThreatSpawn::new(
                ThreatDomain::Bio,
                threat.true_type(),
                config.bio_seed_severity,
                target_region.position,
            );
            spawn.sub_type = threat.sub_type;
            spawn.origin = threat.origin;
            seeds.push((threat.id, region.id, target, spawn));
        }

        for (source, from, to, spawn) in seeds {
            let id = self.spawn(spawn, ctx.now, ctx.log);
            info!("Contagion spread from {} to {}", from, to);
            ctx.log.record(
                ctx.now,
                EventType::ThreatSpread,
                json!({ "source": source.0, "threat": id.0, "from": from.0, "to": to.0 }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FactionId;
    use crate::faction::{Faction, FactionKind, Resources};
    use crate::region::{Buff, Region};
    use crate::threat::properties::WmdProperties;
    use rand::SeedableRng;

    struct Fixture {
        regions: RegionManager,
        factions: FactionManager,
        log: EventLog,
        rng: ChaCha8Rng,
        config: SimulationConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let mut regions = RegionManager::new();
            regions.add(Region::test_region(RegionId(0), 0.0, 0.0));
            regions.add(Region::test_region(RegionId(1), 0.0, 40.0));
            regions.connect(RegionId(0), RegionId(1));
            let factions = FactionManager::new(vec![Faction::new(
                FactionId(0),
                "Directorate",
                FactionKind::Player,
                Resources::funds(100.0),
            )]);
            Self {
                regions,
                factions,
                log: EventLog::new(),
                rng: ChaCha8Rng::seed_from_u64(11),
                config: SimulationConfig::default(),
            }
        }

        fn tick(&mut self, threats: &mut ThreatManager, dt: f64) {
            let mut ctx = ThreatTickContext {
                regions: &mut self.regions,
                factions: &mut self.factions,
                log: &mut self.log,
                rng: &mut self.rng,
                config: &self.config,
                now: 0.0,
            };
            threats.update(dt, &mut ctx);
        }

        fn position(&self, id: u32) -> glam::DVec3 {
            self.regions.get(RegionId(id)).unwrap().position
        }
    }

    #[test]
    fn test_mitigated_threats_removed_and_counted() {
        let mut fx = Fixture::new();
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        let id = threats.spawn(
            ThreatSpawn::new(ThreatDomain::Info, ThreatType::Real, 0.3, pos),
            0.0,
            &mut fx.log,
        );
        assert!(!threats.mitigate(id, true).unwrap());
        threats.investigate(id, 1.0, 0.0, &mut fx.log).unwrap();
        assert!(threats.mitigate(id, true).unwrap());

        fx.tick(&mut threats, 1.0);
        assert!(threats.get(id).is_none());
        assert_eq!(threats.mitigated_by_player(), 1);
        assert!(matches!(
            threats.mitigate(id, true),
            Err(SimError::ThreatNotFound(_))
        ));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut fx = Fixture::new();
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        let a = threats.spawn(ThreatSpawn::new(ThreatDomain::Geo, ThreatType::Real, 0.5, pos), 0.0, &mut fx.log);
        fx.tick(&mut threats, 1.0);
        assert!(threats.is_empty());
        let b = threats.spawn(ThreatSpawn::new(ThreatDomain::Geo, ThreatType::Real, 0.5, pos), 0.0, &mut fx.log);
        assert!(b > a);
    }

    #[test]
    fn test_fortified_reduces_geo_impact() {
        let run = |fortified: bool| {
            let mut fx = Fixture::new();
            if fortified {
                fx.regions
                    .get_mut(RegionId(0))
                    .unwrap()
                    .add_buff(Buff::new(BuffType::Fortified, 100.0, None));
            }
            let mut threats = ThreatManager::new();
            let pos = fx.position(0);
            threats.spawn(ThreatSpawn::new(ThreatDomain::Geo, ThreatType::Real, 0.5, pos), 0.0, &mut fx.log);
            fx.tick(&mut threats, 0.001);
            0.5 - fx.regions.get(RegionId(0)).unwrap().stability()
        };
        let open = run(false);
        let fortified = run(true);
        assert!(open > 0.0);
        assert!((fortified - open * 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_fake_threats_deal_no_damage() {
        let mut fx = Fixture::new();
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        threats.spawn(ThreatSpawn::new(ThreatDomain::Wmd, ThreatType::Fake, 1.0, pos), 0.0, &mut fx.log);
        let before = fx.regions.get(RegionId(0)).unwrap().economy();
        fx.tick(&mut threats, 1.0);
        assert_eq!(fx.regions.get(RegionId(0)).unwrap().economy(), before);
    }

    #[test]
    fn test_wmd_fallout_spawns_rad_same_tick() {
        let mut fx = Fixture::new();
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        threats.spawn(
            ThreatSpawn::new(ThreatDomain::Wmd, ThreatType::Real, 1.0, pos).with_properties(DomainProperties::Wmd(
                WmdProperties {
                    yield_kt: 50.0,
                    fallout_potential: 0.6,
                },
            )),
            0.0,
            &mut fx.log,
        );
        fx.tick(&mut threats, 1.0 / 30.0);
        let rads: Vec<_> = threats.iter().filter(|t| t.domain == ThreatDomain::Rad).collect();
        assert_eq!(rads.len(), 1);
        assert_eq!(threats.len(), 1);
    }

    #[test]
    fn test_bio_spreads_to_uninfected_neighbor() {
        let mut fx = Fixture::new();
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        threats.spawn(ThreatSpawn::new(ThreatDomain::Bio, ThreatType::Real, 0.9, pos), 0.0, &mut fx.log);
        let interval = fx.config.bio_spread_interval;
        fx.tick(&mut threats, interval);
        assert_eq!(threats.len(), 2);
        assert_eq!(threats.count_in_region(&fx.regions, RegionId(1)), 1);

        // Neighbour is now infected, nothing further to seed
        for _ in 0..3 {
            fx.tick(&mut threats, interval);
        }
        assert!(threats.count_in_region(&fx.regions, RegionId(1)) >= 1);
        assert_eq!(fx.log.of_type(EventType::ThreatSpread).count(), 1);
    }

    #[test]
    fn test_quarantine_blocks_spread() {
        let mut fx = Fixture::new();
        fx.regions
            .get_mut(RegionId(0))
            .unwrap()
            .add_buff(Buff::new(BuffType::Quarantine, 1000.0, None));
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        threats.spawn(ThreatSpawn::new(ThreatDomain::Bio, ThreatType::Real, 0.9, pos), 0.0, &mut fx.log);
        fx.tick(&mut threats, fx.config.bio_spread_interval);
        assert_eq!(threats.len(), 1);
        assert_eq!(fx.log.of_type(EventType::ContagionContained).count(), 1);
    }

    #[test]
    fn test_ransomware_drains_owner() {
        let mut fx = Fixture::new();
        fx.regions
            .get_mut(RegionId(0))
            .unwrap()
            .set_owner(crate::region::Owner::Faction(FactionId(0)));
        let mut threats = ThreatManager::new();
        let pos = fx.position(0);
        threats.spawn(
            ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 0.5, pos)
                .with_sub_type(crate::threat::ThreatSubType::Ransomware),
            0.0,
            &mut fx.log,
        );
        fx.tick(&mut threats, 1.0);
        assert!(fx.factions.get(FactionId(0)).unwrap().resources().funds < 100.0);
    }
}
