//! Commands queued from outside the simulation

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::agent::AgentMissionKind;
use crate::core::types::{AgentId, FactionId, RegionId, ThreatId, UnitId};
use crate::threat::{ThreatDomain, ThreatType};

/// Fire-and-forget requests, applied at the start of the next tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorldCommand {
    ExecuteAction {
        action: String,
        /// Defaults to the player faction
        #[serde(default)]
        faction: Option<FactionId>,
        #[serde(default)]
        threat: Option<ThreatId>,
        #[serde(default)]
        region: Option<RegionId>,
    },
    MoveUnit {
        unit: UnitId,
        destination: DVec3,
    },
    DebugCreateThreat {
        domain: ThreatDomain,
        threat_type: ThreatType,
        severity: f64,
        position: DVec3,
    },
    AssignMission {
        agent: AgentId,
        mission: AgentMissionKind,
        target: RegionId,
    },
}

impl WorldCommand {
    pub fn name(&self) -> &'static str {
        match self {
            WorldCommand::ExecuteAction { .. } => "execute_action",
            WorldCommand::MoveUnit { .. } => "move_unit",
            WorldCommand::DebugCreateThreat { .. } => "debug_create_threat",
            WorldCommand::AssignMission { .. } => "assign_mission",
        }
    }
}
