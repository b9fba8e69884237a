//! The AI faction's action library
//!
//! Each action is a planner entry with flat preconditions and effects and a
//! `run` that re-checks affordability before touching the world. All world
//! mutation goes through `World::apply_effect`, the same path player actions
//! use.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::actions::EffectOp;
use crate::agent::AgentMissionKind;
use crate::ai::planner::{GoapAction, WorldState};
use crate::core::types::{FactionId, RegionId};
use crate::faction::Resources;
use crate::region::Owner;
use crate::threat::{ThreatDomain, ThreatSpawn, ThreatType};
use crate::world::World;

pub const CLAIM_COST: Resources = Resources {
    funds: 300.0,
    intel: 20.0,
    tech: 0.0,
};
pub const RESEARCH_COST: Resources = Resources {
    funds: 100.0,
    intel: 0.0,
    tech: 10.0,
};
pub const SATELLITE_COST: Resources = Resources {
    funds: 400.0,
    intel: 0.0,
    tech: 20.0,
};
pub const RECRUIT_COST: Resources = Resources {
    funds: 150.0,
    intel: 10.0,
    tech: 0.0,
};

/// Research progress bought per AdvanceResearch
const RESEARCH_STEP: f64 = 0.05;
/// Orbital presence goal is met at this many satellites
pub const SATELLITE_TARGET: usize = 2;
/// Agent network goal is met at this many agents
pub const AGENT_TARGET: usize = 3;
/// Chance an AI-generated threat is genuine
const REAL_THREAT_CHANCE: f64 = 0.75;

/// One AI faction's turn on the world
pub struct AiTurn<'a> {
    pub world: &'a mut World,
    pub faction: FactionId,
}

impl AiTurn<'_> {
    /// Atomic spend on the acting faction
    fn spend(&mut self, cost: &Resources) -> bool {
        self.world
            .factions
            .get_mut(self.faction)
            .is_some_and(|f| f.spend(cost))
    }

    fn apply(&mut self, op: EffectOp) -> bool {
        match self.world.apply_effect(&op) {
            Ok(()) => true,
            Err(e) => {
                debug!("AI effect failed: {}", e);
                false
            }
        }
    }

    fn player_regions(&self) -> Vec<RegionId> {
        let Some(player) = self.world.factions.player_id() else {
            return Vec::new();
        };
        self.world
            .regions
            .iter()
            .filter(|r| r.is_owned_by(player))
            .map(|r| r.id)
            .collect()
    }

    fn neutral_regions(&self) -> Vec<RegionId> {
        self.world
            .regions
            .iter()
            .filter(|r| r.owner() == Owner::Neutral)
            .map(|r| r.id)
            .collect()
    }

    fn pick(&mut self, candidates: &[RegionId]) -> Option<RegionId> {
        candidates.choose(&mut self.world.rng).copied()
    }
}

fn state(pairs: &[(&str, bool)]) -> WorldState {
    pairs
        .iter()
        .fold(WorldState::new(), |s, (k, v)| s.with(*k, *v))
}

/// Library in priority-independent list order
pub fn ai_actions<'a>() -> Vec<GoapAction<AiTurn<'a>>> {
    vec![
        GoapAction {
            name: "SpawnThreat",
            cost: 1.0,
            preconditions: state(&[("can_afford_threat", true)]),
            effects: state(&[("player_weakened", true)]),
            run: spawn_threat,
        },
        GoapAction {
            name: "SabotageRegion",
            cost: 2.0,
            preconditions: state(&[("has_idle_agent", true), ("player_has_regions", true)]),
            effects: state(&[("player_weakened", true)]),
            run: sabotage_region,
        },
        GoapAction {
            name: "ClaimRegion",
            cost: 1.0,
            preconditions: state(&[("can_afford_claim", true), ("neutral_region_available", true)]),
            effects: state(&[("territory_expanded", true)]),
            run: claim_region,
        },
        GoapAction {
            name: "AdvanceResearch",
            cost: 1.0,
            preconditions: state(&[("can_afford_research", true), ("research_complete", false)]),
            effects: state(&[("research_advanced", true)]),
            run: advance_research,
        },
        GoapAction {
            name: "LaunchSatellite",
            cost: 1.5,
            preconditions: state(&[("can_afford_satellite", true)]),
            effects: state(&[("orbital_presence", true)]),
            run: launch_satellite,
        },
        GoapAction {
            name: "RecruitAgent",
            cost: 1.0,
            preconditions: state(&[("can_afford_agent", true)]),
            effects: state(&[("agent_network", true)]),
            run: recruit_agent,
        },
    ]
}

/// Planner snapshot for `faction`
pub fn observe(world: &World, faction: FactionId) -> WorldState {
    let Some(f) = world.factions.get(faction) else {
        return WorldState::new();
    };
    let player_regions = world
        .factions
        .player_id()
        .map(|p| world.regions.iter().filter(|r| r.is_owned_by(p)).count())
        .unwrap_or(0);
    let neutral = world.regions.iter().any(|r| r.owner() == Owner::Neutral);

    WorldState::new()
        .with("can_afford_threat", f.can_afford(&world.config.ai_threat_cost))
        .with("can_afford_claim", f.can_afford(&CLAIM_COST))
        .with("can_afford_research", f.can_afford(&RESEARCH_COST))
        .with("can_afford_satellite", f.can_afford(&SATELLITE_COST))
        .with("can_afford_agent", f.can_afford(&RECRUIT_COST))
        .with("has_idle_agent", world.agents.idle_agent(faction).is_some())
        .with("player_has_regions", player_regions > 0)
        .with("neutral_region_available", neutral)
        .with("research_complete", f.research.is_complete())
        .with("orbital_presence", world.units.satellite_count(faction) >= SATELLITE_TARGET)
        .with("agent_network", world.agents.count_for(faction) >= AGENT_TARGET)
        // Outcome facts are never already true
        .with("player_weakened", false)
        .with("territory_expanded", false)
        .with("research_advanced", false)
}

/// Spawn a threat, preferring player territory. Also used by the
/// threat-generation cadence.
pub fn spawn_threat(turn: &mut AiTurn) -> bool {
    let cost = turn.world.config.ai_threat_cost;
    if !turn.spend(&cost) {
        return false;
    }
    let mut targets = turn.player_regions();
    if targets.is_empty() {
        targets = turn.world.regions.iter().map(|r| r.id).collect();
    }
    let Some(target) = turn.pick(&targets) else {
        return false;
    };
    let Some(position) = turn.world.regions.get(target).map(|r| r.position) else {
        return false;
    };

    let rng = &mut turn.world.rng;
    let domain = *ThreatDomain::ALL.choose(&mut *rng).unwrap_or(&ThreatDomain::Cyber);
    let severity = rng.gen_range(0.3..0.7);
    let threat_type = if rng.gen_bool(REAL_THREAT_CHANCE) {
        ThreatType::Real
    } else {
        ThreatType::Fake
    };
    let spawn = ThreatSpawn::new(domain, threat_type, severity, position).with_origin(turn.faction);
    turn.world.spawn_threat(spawn);
    true
}

fn sabotage_region(turn: &mut AiTurn) -> bool {
    let Some(agent) = turn.world.agents.idle_agent(turn.faction) else {
        return false;
    };
    let targets = turn.player_regions();
    let Some(target) = turn.pick(&targets) else {
        return false;
    };
    let world = &mut *turn.world;
    let now = world.time();
    world
        .agents
        .assign(
            agent,
            AgentMissionKind::Sabotage,
            target,
            &world.regions,
            &world.factions,
            &world.abilities,
            now,
            &mut world.log,
        )
        .is_ok()
}

fn claim_region(turn: &mut AiTurn) -> bool {
    let targets = turn.neutral_regions();
    let Some(region) = turn.pick(&targets) else {
        return false;
    };
    if !turn.spend(&CLAIM_COST) {
        return false;
    }
    let owner = Owner::Faction(turn.faction);
    turn.apply(EffectOp::SetOwner { region, owner })
}

fn advance_research(turn: &mut AiTurn) -> bool {
    if !turn.spend(&RESEARCH_COST) {
        return false;
    }
    let faction = turn.faction;
    turn.apply(EffectOp::AdvanceResearch {
        faction,
        amount: RESEARCH_STEP,
    })
}

fn launch_satellite(turn: &mut AiTurn) -> bool {
    if !turn.spend(&SATELLITE_COST) {
        return false;
    }
    let altitude_km = turn.world.rng.gen_range(400.0..1200.0);
    let inclination = turn.world.rng.gen_range(0.0..std::f64::consts::FRAC_PI_2);
    let faction = turn.faction;
    turn.apply(EffectOp::LaunchSatellite {
        faction,
        altitude_km,
        inclination,
    })
}

fn recruit_agent(turn: &mut AiTurn) -> bool {
    let faction = turn.faction;
    let home: Vec<RegionId> = turn
        .world
        .regions
        .iter()
        .filter(|r| r.is_owned_by(faction))
        .map(|r| r.id)
        .collect();
    let region = match turn.pick(&home) {
        Some(r) => r,
        None => match turn.world.regions.iter().next() {
            Some(r) => r.id,
            None => return false,
        },
    };
    if !turn.spend(&RECRUIT_COST) {
        return false;
    }
    turn.apply(EffectOp::RecruitAgent { region, faction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    fn ai(world: &World) -> FactionId {
        world.factions.ai_ids()[0]
    }

    #[test]
    fn test_run_rechecks_affordability() {
        let mut world = world();
        let faction = ai(&world);
        let funds = world.factions.get(faction).unwrap().resources().funds;
        world
            .factions
            .get_mut(faction)
            .unwrap()
            .spend(&Resources::funds(funds));

        let mut turn = AiTurn { world: &mut world, faction };
        assert!(!spawn_threat(&mut turn));
        assert!(!claim_region(&mut turn));
        assert!(!launch_satellite(&mut turn));
        assert_eq!(world.threats.len(), 0);
    }

    #[test]
    fn test_spawn_threat_targets_player_territory() {
        let mut world = world();
        let faction = ai(&world);
        let player = world.factions.player_id().unwrap();
        let home = world.regions.iter().next().unwrap().id;
        world.regions.get_mut(home).unwrap().set_owner(Owner::Faction(player));

        let mut turn = AiTurn { world: &mut world, faction };
        assert!(spawn_threat(&mut turn));
        let threat = world.threats.iter().next().unwrap();
        assert_eq!(threat.origin, Some(faction));
        assert_eq!(world.regions.region_id_at(threat.position), Some(home));
    }

    #[test]
    fn test_observe_reflects_resources() {
        let mut world = world();
        let faction = ai(&world);
        let state = observe(&world, faction);
        assert_eq!(state.get("can_afford_threat"), Some(true.into()));
        assert_eq!(state.get("has_idle_agent"), Some(false.into()));

        let mut turn = AiTurn { world: &mut world, faction };
        assert!(recruit_agent(&mut turn));
        let state = observe(&world, faction);
        assert_eq!(state.get("has_idle_agent"), Some(true.into()));
    }

    #[test]
    fn test_claim_region_takes_neutral_land() {
        let mut world = world();
        let faction = ai(&world);
        let before = world.regions.iter().filter(|r| r.is_owned_by(faction)).count();
        let mut turn = AiTurn { world: &mut world, faction };
        assert!(claim_region(&mut turn));
        let after = world.regions.iter().filter(|r| r.is_owned_by(faction)).count();
        assert_eq!(after, before + 1);
    }
}
