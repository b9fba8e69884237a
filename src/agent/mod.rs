//! Field agents and their missions
//!
//! Status only ever moves IDLE -> ON_MISSION -> {IDLE, CAPTURED, KIA}.
//! An agent holds at most one mission at a time.

pub mod ability;
pub mod roster;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{clamp01, AgentId, FactionId, RegionId, SimTime};

pub use ability::{Ability, AbilityCatalog};
pub use roster::{AgentRoster, AgentTickContext};

/// Risk reduction per agent level
pub const LEVEL_RISK_REDUCTION: f64 = 0.05;
/// Progress rate bonus per level above 1
pub const LEVEL_SPEED_BONUS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    OnMission,
    Captured,
    Kia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentMissionKind {
    /// Gather intel and advance investigation of local threats
    Recon,
    /// Destabilize the target region
    Sabotage,
    /// Plant an informant network
    Infiltrate,
    /// Exfiltrate research from the target region
    Extract,
}

impl AgentMissionKind {
    /// Seconds at level 1 with no bonuses
    pub fn base_duration(&self) -> f64 {
        match self {
            Self::Recon => 30.0,
            Self::Sabotage => 60.0,
            Self::Infiltrate => 90.0,
            Self::Extract => 45.0,
        }
    }

    pub fn base_risk(&self) -> f64 {
        match self {
            Self::Recon => 0.1,
            Self::Sabotage => 0.35,
            Self::Infiltrate => 0.3,
            Self::Extract => 0.25,
        }
    }

    pub fn experience_reward(&self) -> u32 {
        match self {
            Self::Recon => 25,
            Self::Sabotage => 50,
            Self::Infiltrate => 60,
            Self::Extract => 40,
        }
    }
}

impl std::str::FromStr for AgentMissionKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RECON" => Ok(Self::Recon),
            "SABOTAGE" => Ok(Self::Sabotage),
            "INFILTRATE" => Ok(Self::Infiltrate),
            "EXTRACT" => Ok(Self::Extract),
            other => Err(SimError::Data(format!("unknown mission '{}'", other))),
        }
    }
}

/// An in-flight mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub kind: AgentMissionKind,
    pub target: RegionId,
    pub progress: f64,
    /// Failure probability fixed at assignment
    pub risk: f64,
    pub started_at: SimTime,
}

/// How a finished mission ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissionResult {
    Succeeded {
        kind: AgentMissionKind,
        target: RegionId,
        leveled_up: bool,
    },
    Captured {
        kind: AgentMissionKind,
        target: RegionId,
    },
    Killed {
        kind: AgentMissionKind,
        target: RegionId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub faction: FactionId,
    pub name: String,
    /// Region the agent is assigned to
    pub region: RegionId,
    level: u32,
    experience: u32,
    pub abilities: Vec<String>,
    status: AgentStatus,
    mission: Option<Mission>,
    #[serde(skip)]
    dirty: bool,
}

impl Agent {
    pub fn new(id: AgentId, faction: FactionId, name: impl Into<String>, region: RegionId) -> Self {
        Self {
            id,
            faction,
            name: name.into(),
            region,
            level: 1,
            experience: 0,
            abilities: Vec::new(),
            status: AgentStatus::Idle,
            mission: None,
            dirty: true,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn mission(&self) -> Option<&Mission> {
        self.mission.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    /// Failure probability for `kind` against a target with `counter_intel`
    pub fn mission_risk(&self, kind: AgentMissionKind, counter_intel: f64, catalog: &AbilityCatalog) -> f64 {
        let (reduction, _) = catalog.modifiers(&self.abilities);
        let level_factor = (1.0 - LEVEL_RISK_REDUCTION * self.level as f64).max(0.0);
        clamp01(kind.base_risk() * level_factor * (1.0 + counter_intel) - reduction)
    }

    /// Start a mission. Only idle agents can be assigned.
    pub fn assign_mission(
        &mut self,
        kind: AgentMissionKind,
        target: RegionId,
        counter_intel: f64,
        catalog: &AbilityCatalog,
        now: SimTime,
    ) -> Result<f64> {
        if self.status != AgentStatus::Idle {
            return Err(SimError::InvalidCommand(format!(
                "{} is {:?} and cannot take a mission",
                self.id, self.status
            )));
        }
        let risk = self.mission_risk(kind, counter_intel, catalog);
        self.mission = Some(Mission {
            kind,
            target,
            progress: 0.0,
            risk,
            started_at: now,
        });
        self.status = AgentStatus::OnMission;
        self.dirty = true;
        Ok(risk)
    }

    /// Advance the current mission. Returns true once progress reaches 1.
    pub fn advance(&mut self, dt: f64, catalog: &AbilityCatalog) -> bool {
        if self.status != AgentStatus::OnMission {
            return false;
        }
        let (_, speed) = catalog.modifiers(&self.abilities);
        let rate = (1.0 + LEVEL_SPEED_BONUS * (self.level - 1) as f64) * (1.0 + speed);
        let Some(mission) = self.mission.as_mut() else {
            return false;
        };
        mission.progress = clamp01(mission.progress + dt / mission.kind.base_duration() * rate);
        self.dirty = true;
        mission.progress >= 1.0
    }

    /// Close out a completed mission.
    ///
    /// `success_roll` and `kia_roll` are uniform in [0, 1). Returns None if
    /// there is no completed mission.
    pub fn resolve_mission(
        &mut self,
        success_roll: f64,
        kia_roll: f64,
        kia_chance: f64,
        xp_per_level: u32,
    ) -> Option<MissionResult> {
        if self.status != AgentStatus::OnMission {
            return None;
        }
        let mission = self.mission.as_ref().filter(|m| m.progress >= 1.0)?.clone();
        self.mission = None;
        self.dirty = true;

        if success_roll >= mission.risk {
            self.status = AgentStatus::Idle;
            self.experience += mission.kind.experience_reward();
            let level = 1 + self.experience / xp_per_level.max(1);
            let leveled_up = level > self.level;
            self.level = level;
            Some(MissionResult::Succeeded {
                kind: mission.kind,
                target: mission.target,
                leveled_up,
            })
        } else if kia_roll < kia_chance {
            self.status = AgentStatus::Kia;
            Some(MissionResult::Killed {
                kind: mission.kind,
                target: mission.target,
            })
        } else {
            self.status = AgentStatus::Captured;
            Some(MissionResult::Captured {
                kind: mission.kind,
                target: mission.target,
            })
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
