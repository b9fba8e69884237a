//! Append-only narrative event log

use serde::{Deserialize, Serialize};

use crate::core::types::SimTime;

/// Event taxonomy shared by the simulation and chronicle consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Threats
    ThreatCreated,
    ThreatInvestigated,
    ThreatMitigated,
    ThreatSpread,
    ContagionContained,
    QuantumCollapse,
    RobotFailureMode,
    RobotEmergentBehavior,
    SeismicImpact,
    WmdDetonation,
    OrbitalReentry,
    CrossDomainInteraction,

    // Player and AI actions
    ActionExecuted,
    RegionClaimed,
    RegionSabotaged,
    BuildingConstructed,
    BuffApplied,
    BuffExpired,
    GlobalBuffApplied,
    GlobalBuffExpired,

    // Agents
    AgentRecruited,
    MissionStarted,
    MissionSucceeded,
    AgentCaptured,
    AgentKilled,
    AgentLevelUp,

    // Units
    UnitDeployed,
    SatelliteLaunched,

    // Factions
    ResearchMilestone,
    AlertLevelChanged,
    AiDecision,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreatCreated => "THREAT_CREATED",
            Self::ThreatInvestigated => "THREAT_INVESTIGATED",
            Self::ThreatMitigated => "THREAT_MITIGATED",
            Self::ThreatSpread => "THREAT_SPREAD",
            Self::ContagionContained => "CONTAGION_CONTAINED",
            Self::QuantumCollapse => "QUANTUM_COLLAPSE",
            Self::RobotFailureMode => "ROBOT_FAILURE_MODE",
            Self::RobotEmergentBehavior => "ROBOT_EMERGENT_BEHAVIOR",
            Self::SeismicImpact => "SEISMIC_IMPACT",
            Self::WmdDetonation => "WMD_DETONATION",
            Self::OrbitalReentry => "ORBITAL_REENTRY",
            Self::CrossDomainInteraction => "CROSS_DOMAIN_INTERACTION",
            Self::ActionExecuted => "ACTION_EXECUTED",
            Self::RegionClaimed => "REGION_CLAIMED",
            Self::RegionSabotaged => "REGION_SABOTAGED",
            Self::BuildingConstructed => "BUILDING_CONSTRUCTED",
            Self::BuffApplied => "BUFF_APPLIED",
            Self::BuffExpired => "BUFF_EXPIRED",
            Self::GlobalBuffApplied => "GLOBAL_BUFF_APPLIED",
            Self::GlobalBuffExpired => "GLOBAL_BUFF_EXPIRED",
            Self::AgentRecruited => "AGENT_RECRUITED",
            Self::MissionStarted => "MISSION_STARTED",
            Self::MissionSucceeded => "MISSION_SUCCEEDED",
            Self::AgentCaptured => "AGENT_CAPTURED",
            Self::AgentKilled => "AGENT_KILLED",
            Self::AgentLevelUp => "AGENT_LEVEL_UP",
            Self::UnitDeployed => "UNIT_DEPLOYED",
            Self::SatelliteLaunched => "SATELLITE_LAUNCHED",
            Self::ResearchMilestone => "RESEARCH_MILESTONE",
            Self::AlertLevelChanged => "ALERT_LEVEL_CHANGED",
            Self::AiDecision => "AI_DECISION",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logged occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: u64,
    pub timestamp: SimTime,
    pub event_type: EventType,
    pub data: serde_json::Value,
}

/// The complete event history. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<NarrativeEvent>,
    next_event_id: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timestamp: SimTime, event_type: EventType, data: serde_json::Value) -> u64 {
        self.next_event_id += 1;
        let id = self.next_event_id;
        self.events.push(NarrativeEvent {
            id,
            timestamp,
            event_type,
            data,
        });
        id
    }

    /// Id of the newest event, 0 when empty
    pub fn last_id(&self) -> u64 {
        self.next_event_id
    }

    /// Events with an id greater than `cursor`
    pub fn since(&self, cursor: u64) -> &[NarrativeEvent] {
        let start = self.events.partition_point(|e| e.id <= cursor);
        &self.events[start..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &NarrativeEvent> {
        self.events.iter()
    }

    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &NarrativeEvent> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_monotone() {
        let mut log = EventLog::new();
        let a = log.record(0.0, EventType::ThreatCreated, json!({}));
        let b = log.record(0.0, EventType::ThreatCreated, json!({}));
        assert_eq!((a, b), (1, 2));
        assert_eq!(log.last_id(), 2);
    }

    #[test]
    fn test_since_cursor() {
        let mut log = EventLog::new();
        for i in 0..5 {
            log.record(i as f64, EventType::AiDecision, json!({ "i": i }));
        }
        assert_eq!(log.since(0).len(), 5);
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].id, 4);
        assert!(log.since(5).is_empty());
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn test_event_type_serializes_screaming() {
        let s = serde_json::to_string(&EventType::QuantumCollapse).unwrap();
        assert_eq!(s, "\"QUANTUM_COLLAPSE\"");
        assert_eq!(EventType::QuantumCollapse.as_str(), "QUANTUM_COLLAPSE");
    }
}
