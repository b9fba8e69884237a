//! Chronicle rules: turn raw events into story beats
//!
//! Rules are checked in order for each new event and the first one whose
//! trigger and condition match produces the chronicle. An event yields at most
//! one chronicle.

use serde::{Deserialize, Serialize};

use crate::core::types::SimTime;
use crate::narrative::events::{EventLog, EventType, NarrativeEvent};

pub struct ChronicleRule {
    pub name: &'static str,
    pub trigger: EventType,
    pub condition: fn(&NarrativeEvent) -> bool,
    pub title: fn(&NarrativeEvent) -> String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronicle {
    pub id: u32,
    pub event_id: u64,
    pub timestamp: SimTime,
    pub rule: String,
    pub title: String,
}

fn always(_: &NarrativeEvent) -> bool {
    true
}

fn field_f64(event: &NarrativeEvent, key: &str) -> f64 {
    event.data.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn field_str<'a>(event: &'a NarrativeEvent, key: &str) -> &'a str {
    event.data.get(key).and_then(|v| v.as_str()).unwrap_or("unknown")
}

/// Rules the game ships with, in priority order
pub fn default_rules() -> Vec<ChronicleRule> {
    vec![
        ChronicleRule {
            name: "apocalyptic_blast",
            trigger: EventType::WmdDetonation,
            condition: |e| field_f64(e, "yield_kt") >= 500.0,
            title: |e| format!("A {:.0} kiloton detonation scars the world", field_f64(e, "yield_kt")),
        },
        ChronicleRule {
            name: "detonation",
            trigger: EventType::WmdDetonation,
            condition: always,
            title: |_| "A weapon of mass destruction is detonated".to_string(),
        },
        ChronicleRule {
            name: "great_quake",
            trigger: EventType::SeismicImpact,
            condition: |e| field_f64(e, "magnitude") >= 7.0,
            title: |e| format!("A magnitude {:.1} earthquake shakes the region", field_f64(e, "magnitude")),
        },
        ChronicleRule {
            name: "pandemic_spreads",
            trigger: EventType::ThreatSpread,
            condition: always,
            title: |_| "Contagion crosses a border".to_string(),
        },
        ChronicleRule {
            name: "quarantine_holds",
            trigger: EventType::ContagionContained,
            condition: always,
            title: |_| "Quarantine halts an outbreak at the border".to_string(),
        },
        ChronicleRule {
            name: "quantum_break",
            trigger: EventType::QuantumCollapse,
            condition: |e| field_str(e, "effect") == "CRYPTOGRAPHIC_BREAK",
            title: |_| "Decoherence shatters the world's encryption".to_string(),
        },
        ChronicleRule {
            name: "machine_awakens",
            trigger: EventType::RobotEmergentBehavior,
            condition: always,
            title: |_| "A machine begins rewriting itself".to_string(),
        },
        ChronicleRule {
            name: "agent_lost",
            trigger: EventType::AgentKilled,
            condition: always,
            title: |e| format!("Agent {} is killed in action", field_str(e, "name")),
        },
        ChronicleRule {
            name: "singularity",
            trigger: EventType::ResearchMilestone,
            condition: |e| field_f64(e, "milestone") >= 1.0,
            title: |_| "The singularity arrives".to_string(),
        },
        ChronicleRule {
            name: "escalation",
            trigger: EventType::AlertLevelChanged,
            condition: |e| field_f64(e, "level") >= 2.0,
            title: |_| "The adversary moves to full mobilisation".to_string(),
        },
    ]
}

/// Consumes the event log incrementally
pub struct ChronicleEngine {
    rules: Vec<ChronicleRule>,
    chronicles: Vec<Chronicle>,
    cursor: u64,
    next_id: u32,
}

impl Default for ChronicleEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ChronicleEngine {
    pub fn new(rules: Vec<ChronicleRule>) -> Self {
        Self {
            rules,
            chronicles: Vec::new(),
            cursor: 0,
            next_id: 0,
        }
    }

    /// Process every event newer than the last call; returns how many
    /// chronicles were written
    pub fn process(&mut self, log: &EventLog) -> usize {
        let before = self.chronicles.len();
        for event in log.since(self.cursor) {
            self.cursor = event.id;
            let Some(rule) = self
                .rules
                .iter()
                .find(|r| r.trigger == event.event_type && (r.condition)(event))
            else {
                continue;
            };
            self.next_id += 1;
            self.chronicles.push(Chronicle {
                id: self.next_id,
                event_id: event.id,
                timestamp: event.timestamp,
                rule: rule.name.to_string(),
                title: (rule.title)(event),
            });
        }
        self.chronicles.len() - before
    }

    pub fn chronicles(&self) -> &[Chronicle] {
        &self.chronicles
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_matching_rule_wins() {
        let mut log = EventLog::new();
        log.record(1.0, EventType::WmdDetonation, json!({ "yield_kt": 800.0 }));
        log.record(2.0, EventType::WmdDetonation, json!({ "yield_kt": 15.0 }));

        let mut engine = ChronicleEngine::default();
        assert_eq!(engine.process(&log), 2);
        let rules: Vec<_> = engine.chronicles().iter().map(|c| c.rule.as_str()).collect();
        assert_eq!(rules, vec!["apocalyptic_blast", "detonation"]);
    }

    #[test]
    fn test_events_processed_once() {
        let mut log = EventLog::new();
        log.record(1.0, EventType::ThreatSpread, json!({}));
        let mut engine = ChronicleEngine::default();
        assert_eq!(engine.process(&log), 1);
        assert_eq!(engine.process(&log), 0);

        log.record(2.0, EventType::ThreatCreated, json!({}));
        assert_eq!(engine.process(&log), 0);
        assert_eq!(engine.cursor(), 2);
    }

    #[test]
    fn test_condition_filters() {
        let mut log = EventLog::new();
        log.record(1.0, EventType::SeismicImpact, json!({ "magnitude": 5.0 }));
        let mut engine = ChronicleEngine::default();
        assert_eq!(engine.process(&log), 0);
    }
}
