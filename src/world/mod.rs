//! The simulation world - sole owner of every entity
//!
//! `World::tick` runs the managers in a fixed order:
//! queued commands, regions (with units and satellites), factions (with agent
//! missions), threats, AI, then the clock advances. Later phases read what
//! earlier phases wrote in the same tick.

pub mod command;

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::actions::{self, ActionCatalog, ActionContext, EffectOp};
use crate::agent::{AbilityCatalog, AgentRoster, AgentTickContext};
use crate::ai::AiManager;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{FactionId, RegionId, SimTime, ThreatId, Tick};
use crate::data;
use crate::faction::{FactionManager, IncomeSources};
use crate::narrative::{EventLog, EventType};
use crate::region::weather::simple_hash;
use crate::region::{Buff, GlobalBuffType, GlobalBuffs, RegionManager};
use crate::threat::{ThreatManager, ThreatSpawn, ThreatTickContext};
use crate::unit::UnitManager;

pub use command::WorldCommand;

pub struct World {
    pub config: SimulationConfig,
    pub factions: FactionManager,
    pub regions: RegionManager,
    pub threats: ThreatManager,
    pub agents: AgentRoster,
    pub units: UnitManager,
    pub global_buffs: GlobalBuffs,
    pub log: EventLog,
    pub actions: ActionCatalog,
    pub abilities: AbilityCatalog,
    pub ai: AiManager,
    pub rng: ChaCha8Rng,
    commands: VecDeque<WorldCommand>,
    time: SimTime,
    tick: Tick,
}

impl World {
    /// A world built from the bundled static data
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate().map_err(SimError::Config)?;
        let regions = data::default_regions(config.planet_radius)?;
        let actions = data::default_actions()?;
        let abilities = data::default_abilities()?;
        Ok(Self::from_parts(
            config,
            regions,
            FactionManager::new(data::default_factions()),
            actions,
            abilities,
        ))
    }

    pub fn from_parts(
        config: SimulationConfig,
        regions: RegionManager,
        factions: FactionManager,
        actions: ActionCatalog,
        abilities: AbilityCatalog,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        info!(
            "World created: {} regions, {} factions, {} actions, seed {}",
            regions.len(),
            factions.len(),
            actions.len(),
            config.seed
        );
        Self {
            config,
            factions,
            regions,
            threats: ThreatManager::new(),
            agents: AgentRoster::default(),
            units: UnitManager::default(),
            global_buffs: GlobalBuffs::default(),
            log: EventLog::new(),
            actions,
            abilities,
            ai: AiManager::default(),
            rng,
            commands: VecDeque::new(),
            time: 0.0,
            tick: 0,
        }
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn tick_count(&self) -> Tick {
        self.tick
    }

    // === COMMANDS ===

    /// Queue a command for the start of the next tick
    pub fn queue_command(&mut self, command: WorldCommand) {
        self.commands.push_back(command);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.pop_front() {
            let name = command.name();
            if let Err(e) = self.apply_command(command) {
                warn!("Command {} failed: {}", name, e);
            }
        }
    }

    /// Apply a command immediately
    pub fn apply_command(&mut self, command: WorldCommand) -> Result<()> {
        match command {
            WorldCommand::ExecuteAction {
                action,
                faction,
                threat,
                region,
            } => {
                let faction = faction
                    .or_else(|| self.factions.player_id())
                    .ok_or_else(|| SimError::InvalidCommand("no acting faction".into()))?;
                if self.actions.get(&action).is_none() {
                    return Err(SimError::UnknownAction(action));
                }
                let ctx = ActionContext {
                    faction,
                    threat,
                    region,
                };
                if !self.execute_action(&action, &ctx) {
                    debug!("Action {} was not executed", action);
                }
                Ok(())
            }
            WorldCommand::MoveUnit { unit, destination } => {
                self.units.move_unit(unit, destination, self.config.planet_radius)
            }
            WorldCommand::DebugCreateThreat {
                domain,
                threat_type,
                severity,
                position,
            } => {
                let position = position.normalize_or_zero() * self.config.planet_radius;
                self.spawn_threat(ThreatSpawn::new(domain, threat_type, severity, position));
                Ok(())
            }
            WorldCommand::AssignMission {
                agent,
                mission,
                target,
            } => {
                self.agents.assign(
                    agent,
                    mission,
                    target,
                    &self.regions,
                    &self.factions,
                    &self.abilities,
                    self.time,
                    &mut self.log,
                )?;
                Ok(())
            }
        }
    }

    // === ACTIONS ===

    pub fn is_action_available(&self, action_id: &str, ctx: &ActionContext) -> bool {
        self.actions
            .get(action_id)
            .is_some_and(|action| actions::is_action_available(self, action, ctx))
    }

    /// Look up and execute a catalog action. False if unknown or unavailable.
    pub fn execute_action(&mut self, action_id: &str, ctx: &ActionContext) -> bool {
        let Some(action) = self.actions.get(action_id).cloned() else {
            warn!("Unknown action: {}", action_id);
            return false;
        };
        actions::execute_action(self, &action, ctx)
    }

    /// Verify that every id `op` references is live
    pub fn check_effect(&self, op: &EffectOp) -> Result<()> {
        let threat = |id: ThreatId| match self.threats.get(id) {
            Some(_) => Ok(()),
            None => Err(SimError::ThreatNotFound(id)),
        };
        let region = |id: RegionId| match self.regions.get(id) {
            Some(_) => Ok(()),
            None => Err(SimError::RegionNotFound(id)),
        };
        let faction = |id: FactionId| match self.factions.get(id) {
            Some(_) => Ok(()),
            None => Err(SimError::FactionNotFound(id)),
        };
        match *op {
            EffectOp::Investigate { threat: t, .. }
            | EffectOp::Mitigate { threat: t }
            | EffectOp::AdjustSeverity { threat: t, .. } => threat(t),
            EffectOp::AddBuff { region: r, .. }
            | EffectOp::SetOwner { region: r, .. }
            | EffectOp::AddBuilding { region: r, .. }
            | EffectOp::AdjustStability { region: r, .. }
            | EffectOp::AdjustEconomy { region: r, .. }
            | EffectOp::AdjustEducation { region: r, .. } => region(r),
            EffectOp::RecruitAgent { region: r, faction: f }
            | EffectOp::DeployUnit { region: r, faction: f, .. } => {
                region(r)?;
                faction(f)
            }
            EffectOp::LaunchSatellite { faction: f, .. }
            | EffectOp::GrantResources { faction: f, .. }
            | EffectOp::AdvanceResearch { faction: f, .. } => faction(f),
            EffectOp::AddGlobalBuff { .. } => Ok(()),
        }
    }

    /// Apply one bound effect
    pub fn apply_effect(&mut self, op: &EffectOp) -> Result<()> {
        let now = self.time;
        match *op {
            EffectOp::Investigate { threat, amount } => {
                self.threats.investigate(threat, amount, now, &mut self.log)?;
            }
            EffectOp::Mitigate { threat } => {
                if !self.threats.mitigate(threat, true)? {
                    debug!("{} could not be mitigated", threat);
                }
            }
            EffectOp::AdjustSeverity { threat, delta } => {
                self.threats
                    .get_mut(threat)
                    .ok_or(SimError::ThreatNotFound(threat))?
                    .adjust_severity(delta);
            }
            EffectOp::AddBuff {
                region,
                kind,
                duration,
                owner,
            } => {
                let r = self.regions.get_mut(region).ok_or(SimError::RegionNotFound(region))?;
                if r.add_buff(Buff::new(kind, duration, owner)) {
                    self.log.record(
                        now,
                        EventType::BuffApplied,
                        json!({ "region": region.0, "buff": kind.as_str(), "duration": duration }),
                    );
                } else {
                    debug!("{} already has {}", region, kind.as_str());
                }
            }
            EffectOp::SetOwner { region, owner } => {
                self.regions
                    .get_mut(region)
                    .ok_or(SimError::RegionNotFound(region))?
                    .set_owner(owner);
                self.log.record(
                    now,
                    EventType::RegionClaimed,
                    json!({ "region": region.0, "owner": owner.faction().map(|f| f.0) }),
                );
            }
            EffectOp::AddBuilding { region, kind } => {
                let r = self.regions.get_mut(region).ok_or(SimError::RegionNotFound(region))?;
                if r.add_building(kind) {
                    self.log.record(
                        now,
                        EventType::BuildingConstructed,
                        json!({ "region": region.0, "building": kind }),
                    );
                }
            }
            EffectOp::AdjustStability { region, delta } => {
                self.regions
                    .get_mut(region)
                    .ok_or(SimError::RegionNotFound(region))?
                    .adjust_stability(delta);
            }
            EffectOp::AdjustEconomy { region, delta } => {
                self.regions
                    .get_mut(region)
                    .ok_or(SimError::RegionNotFound(region))?
                    .adjust_economy(delta);
            }
            EffectOp::AdjustEducation { region, delta } => {
                self.regions
                    .get_mut(region)
                    .ok_or(SimError::RegionNotFound(region))?
                    .adjust_education(delta);
            }
            EffectOp::RecruitAgent { region, faction } => {
                if self.regions.get(region).is_none() {
                    return Err(SimError::RegionNotFound(region));
                }
                self.agents.recruit(faction, region, Vec::new(), now, &mut self.log);
            }
            EffectOp::DeployUnit {
                region,
                kind,
                faction,
            } => {
                let r = self.regions.get(region).ok_or(SimError::RegionNotFound(region))?;
                self.units
                    .deploy(faction, kind, r, self.config.planet_radius, now, &mut self.log);
            }
            EffectOp::LaunchSatellite {
                faction,
                altitude_km,
                inclination,
            } => {
                self.units.launch(
                    faction,
                    altitude_km,
                    inclination,
                    self.config.planet_radius,
                    now,
                    &mut self.log,
                );
            }
            EffectOp::AddGlobalBuff {
                kind,
                duration,
                owner,
            } => {
                if self.global_buffs.add(kind, duration, owner) {
                    self.log.record(
                        now,
                        EventType::GlobalBuffApplied,
                        json!({ "buff": kind, "duration": duration }),
                    );
                }
            }
            EffectOp::GrantResources { faction, amount } => {
                self.factions
                    .get_mut(faction)
                    .ok_or(SimError::FactionNotFound(faction))?
                    .earn(&amount);
            }
            EffectOp::AdvanceResearch { faction, amount } => {
                let f = self
                    .factions
                    .get_mut(faction)
                    .ok_or(SimError::FactionNotFound(faction))?;
                let crossed = f.advance_research(amount);
                let progress = f.research.progress();
                let reached = f.research.milestones_reached();
                for _ in 0..crossed {
                    self.log.record(
                        now,
                        EventType::ResearchMilestone,
                        json!({ "faction": faction.0, "milestone": progress, "reached": reached }),
                    );
                }
            }
        }
        Ok(())
    }

    pub fn spawn_threat(&mut self, spawn: ThreatSpawn) -> ThreatId {
        self.threats.spawn(spawn, self.time, &mut self.log)
    }

    // === TICK ===

    pub fn tick(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.drain_commands();
        let now = self.time;

        // 1. Regions, units, satellites
        let tick_seed = simple_hash(self.config.seed, self.tick);
        for (region, kind) in self.regions.update(dt, &self.config, tick_seed) {
            self.log.record(
                now,
                EventType::BuffExpired,
                json!({ "region": region.0, "buff": kind.as_str() }),
            );
        }
        for kind in self.global_buffs.tick(dt) {
            self.log
                .record(now, EventType::GlobalBuffExpired, json!({ "buff": kind }));
        }
        self.units.update(dt, self.config.planet_radius, &self.regions);

        // 2. Factions and agent missions
        let satellite_counts = self.units.satellite_counts();
        let sources = IncomeSources {
            regions: &self.regions,
            satellite_counts: &satellite_counts,
            satellites_disrupted: self.global_buffs.is_active(GlobalBuffType::SatelliteDisruption),
        };
        self.factions.update(dt, &self.config, &sources);
        let mut agent_ctx = AgentTickContext {
            regions: &mut self.regions,
            factions: &mut self.factions,
            threats: &mut self.threats,
            log: &mut self.log,
            rng: &mut self.rng,
            config: &self.config,
            abilities: &self.abilities,
            now,
        };
        self.agents.update(dt, &mut agent_ctx);

        // 3. Threats
        let mut threat_ctx = ThreatTickContext {
            regions: &mut self.regions,
            factions: &mut self.factions,
            log: &mut self.log,
            rng: &mut self.rng,
            config: &self.config,
            now,
        };
        self.threats.update(dt, &mut threat_ctx);

        // 4. AI, detached so it can drive the world through its own actions
        let mut ai = std::mem::take(&mut self.ai);
        ai.update(dt, self);
        self.ai = ai;

        self.time += dt;
        self.tick += 1;
    }
}
