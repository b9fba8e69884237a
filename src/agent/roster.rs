//! Agent roster and mission resolution

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::agent::{AbilityCatalog, Agent, AgentMissionKind, MissionResult};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, FactionId, IdAllocator, RegionId, SimTime, ThreatId};
use crate::faction::{FactionManager, Resources};
use crate::narrative::{EventLog, EventType};
use crate::region::{Buff, BuffType, RegionManager};
use crate::threat::ThreatManager;

/// Recon intel payout
const RECON_INTEL: f64 = 20.0;
/// Investigation progress recon adds to each threat in the region
const RECON_INVESTIGATION: f64 = 0.25;
const SABOTAGE_STABILITY: f64 = 0.1;
const SABOTAGE_ECONOMY: f64 = 0.05;
const INFORMANT_DURATION: f64 = 120.0;
const EXTRACT_TECH: f64 = 15.0;

pub struct AgentTickContext<'a> {
    pub regions: &'a mut RegionManager,
    pub factions: &'a mut FactionManager,
    pub threats: &'a mut ThreatManager,
    pub log: &'a mut EventLog,
    pub rng: &'a mut ChaCha8Rng,
    pub config: &'a SimulationConfig,
    pub abilities: &'a AbilityCatalog,
    pub now: SimTime,
}

#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: Vec<Agent>,
    ids: IdAllocator,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn count_for(&self, faction: FactionId) -> usize {
        self.agents.iter().filter(|a| a.faction == faction).count()
    }

    /// First idle agent of `faction`, if any
    pub fn idle_agent(&self, faction: FactionId) -> Option<AgentId> {
        self.agents
            .iter()
            .find(|a| a.faction == faction && a.is_idle())
            .map(|a| a.id)
    }

    pub fn recruit(
        &mut self,
        faction: FactionId,
        region: RegionId,
        abilities: Vec<String>,
        now: SimTime,
        log: &mut EventLog,
    ) -> AgentId {
        let id = AgentId(self.ids.next_id());
        let mut agent = Agent::new(id, faction, format!("Agent {}", id.0 + 1), region);
        agent.abilities = abilities;
        info!("{} recruited {} in {}", faction, id, region);
        log.record(
            now,
            EventType::AgentRecruited,
            json!({ "agent": id.0, "faction": faction.0, "region": region.0 }),
        );
        self.agents.push(agent);
        id
    }

    /// Send an idle agent on a mission against `target`
    #[allow(clippy::too_many_arguments)]
    pub fn assign(
        &mut self,
        agent_id: AgentId,
        kind: AgentMissionKind,
        target: RegionId,
        regions: &RegionManager,
        factions: &FactionManager,
        abilities: &AbilityCatalog,
        now: SimTime,
        log: &mut EventLog,
    ) -> Result<f64> {
        let region = regions.get(target).ok_or(SimError::RegionNotFound(target))?;
        let agent = self
            .agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or(SimError::AgentNotFound(agent_id))?;

        // Hostile owners defend their territory
        let counter_intel = region
            .owner()
            .faction()
            .filter(|owner| *owner != agent.faction)
            .and_then(|owner| factions.get(owner))
            .map_or(0.0, |f| f.counter_intel);

        let risk = agent.assign_mission(kind, target, counter_intel, abilities, now)?;
        debug!("{} starts {:?} on {} (risk {:.2})", agent_id, kind, target, risk);
        log.record(
            now,
            EventType::MissionStarted,
            json!({ "agent": agent_id.0, "mission": kind, "region": target.0, "risk": risk }),
        );
        Ok(risk)
    }

    /// Advance missions, resolve finished ones, and drop KIA agents
    pub fn update(&mut self, dt: f64, ctx: &mut AgentTickContext) {
        let mut results = Vec::new();
        for agent in &mut self.agents {
            if !agent.advance(dt, ctx.abilities) {
                continue;
            }
            let success_roll: f64 = ctx.rng.gen();
            let kia_roll: f64 = ctx.rng.gen();
            if let Some(result) = agent.resolve_mission(
                success_roll,
                kia_roll,
                ctx.config.agent_kia_chance,
                ctx.config.agent_xp_per_level,
            ) {
                results.push((agent.id, agent.faction, agent.name.clone(), agent.level(), result));
            }
        }

        for (agent, faction, name, level, result) in results {
            match result {
                MissionResult::Succeeded {
                    kind,
                    target,
                    leveled_up,
                } => {
                    apply_success(kind, target, faction, ctx);
                    ctx.log.record(
                        ctx.now,
                        EventType::MissionSucceeded,
                        json!({ "agent": agent.0, "mission": kind, "region": target.0 }),
                    );
                    if leveled_up {
                        ctx.log.record(
                            ctx.now,
                            EventType::AgentLevelUp,
                            json!({ "agent": agent.0, "level": level }),
                        );
                    }
                }
                MissionResult::Captured { kind, target } => {
                    warn!("{} captured during {:?} in {}", agent, kind, target);
                    ctx.log.record(
                        ctx.now,
                        EventType::AgentCaptured,
                        json!({ "agent": agent.0, "name": name, "region": target.0 }),
                    );
                }
                MissionResult::Killed { kind, target } => {
                    warn!("{} killed during {:?} in {}", agent, kind, target);
                    ctx.log.record(
                        ctx.now,
                        EventType::AgentKilled,
                        json!({ "agent": agent.0, "name": name, "region": target.0 }),
                    );
                }
            }
        }

        self.agents.retain(|a| a.status() != crate::agent::AgentStatus::Kia);
    }
}

fn apply_success(kind: AgentMissionKind, target: RegionId, faction: FactionId, ctx: &mut AgentTickContext) {
    match kind {
        AgentMissionKind::Recon => {
            if let Some(f) = ctx.factions.get_mut(faction) {
                f.earn(&Resources::new(0.0, RECON_INTEL, 0.0));
            }
            let local: Vec<ThreatId> = ctx
                .threats
                .iter()
                .filter(|t| ctx.regions.region_id_at(t.position) == Some(target))
                .map(|t| t.id)
                .collect();
            for id in local {
                // Ids were just collected from the live set
                let _ = ctx.threats.investigate(id, RECON_INVESTIGATION, ctx.now, ctx.log);
            }
        }
        AgentMissionKind::Sabotage => {
            if let Some(region) = ctx.regions.get_mut(target) {
                region.adjust_stability(-SABOTAGE_STABILITY);
                region.adjust_economy(-SABOTAGE_ECONOMY);
                ctx.log.record(
                    ctx.now,
                    EventType::RegionSabotaged,
                    json!({ "region": target.0, "faction": faction.0 }),
                );
            }
        }
        AgentMissionKind::Infiltrate => {
            if let Some(region) = ctx.regions.get_mut(target) {
                if !region.add_buff(Buff::new(BuffType::InformantNetwork, INFORMANT_DURATION, Some(faction))) {
                    region.refresh_buff(BuffType::InformantNetwork, INFORMANT_DURATION);
                }
            }
        }
        AgentMissionKind::Extract => {
            if let Some(f) = ctx.factions.get_mut(faction) {
                f.earn(&Resources::new(0.0, 0.0, EXTRACT_TECH));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faction::{Faction, FactionKind};
    use crate::region::Region;
    use rand::SeedableRng;

    struct Fixture {
        regions: RegionManager,
        factions: FactionManager,
        threats: ThreatManager,
        log: EventLog,
        rng: ChaCha8Rng,
        config: SimulationConfig,
        abilities: AbilityCatalog,
    }

    impl Fixture {
        fn new() -> Self {
            let mut regions = RegionManager::new();
            regions.add(Region::test_region(RegionId(0), 0.0, 0.0));
            Self {
                regions,
                factions: FactionManager::new(vec![Faction::new(
                    FactionId(0),
                    "Directorate",
                    FactionKind::Player,
                    Resources::ZERO,
                )]),
                threats: ThreatManager::new(),
                log: EventLog::new(),
                rng: ChaCha8Rng::seed_from_u64(2),
                config: SimulationConfig::default(),
                abilities: AbilityCatalog::default(),
            }
        }

        fn tick(&mut self, roster: &mut AgentRoster, dt: f64) {
            let mut ctx = AgentTickContext {
                regions: &mut self.regions,
                factions: &mut self.factions,
                threats: &mut self.threats,
                log: &mut self.log,
                rng: &mut self.rng,
                config: &self.config,
                abilities: &self.abilities,
                now: 0.0,
            };
            roster.update(dt, &mut ctx);
        }
    }

    #[test]
    fn test_assign_unknown_region_fails() {
        let mut fx = Fixture::new();
        let mut roster = AgentRoster::new();
        let id = roster.recruit(FactionId(0), RegionId(0), vec![], 0.0, &mut fx.log);
        let err = roster.assign(
            id,
            AgentMissionKind::Recon,
            RegionId(42),
            &fx.regions,
            &fx.factions,
            &fx.abilities,
            0.0,
            &mut fx.log,
        );
        assert!(matches!(err, Err(SimError::RegionNotFound(_))));
        assert!(roster.get(id).unwrap().is_idle());
    }

    #[test]
    fn test_mission_always_resolves() {
        let mut fx = Fixture::new();
        let mut roster = AgentRoster::new();
        let id = roster.recruit(FactionId(0), RegionId(0), vec![], 0.0, &mut fx.log);
        roster
            .assign(id, AgentMissionKind::Recon, RegionId(0), &fx.regions, &fx.factions, &fx.abilities, 0.0, &mut fx.log)
            .unwrap();
        fx.tick(&mut roster, 30.0);

        let resolved = fx.log.of_type(EventType::MissionSucceeded).count()
            + fx.log.of_type(EventType::AgentCaptured).count()
            + fx.log.of_type(EventType::AgentKilled).count();
        assert_eq!(resolved, 1);
        match roster.get(id) {
            // KIA agents leave the roster
            None => assert_eq!(fx.log.of_type(EventType::AgentKilled).count(), 1),
            Some(agent) => assert!(agent.mission().is_none()),
        }
    }

    #[test]
    fn test_kia_agents_removed() {
        let mut fx = Fixture::new();
        fx.config.agent_kia_chance = 1.0;
        let mut roster = AgentRoster::new();
        let id = roster.recruit(FactionId(0), RegionId(0), vec![], 0.0, &mut fx.log);
        // Force failure
        roster
            .get_mut(id)
            .unwrap()
            .assign_mission(AgentMissionKind::Sabotage, RegionId(0), 1000.0, &fx.abilities, 0.0)
            .unwrap();
        fx.tick(&mut roster, 60.0);
        assert!(roster.get(id).is_none());
        assert!(roster.is_empty());
    }
}
