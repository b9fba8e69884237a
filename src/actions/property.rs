//! Runtime property access by dotted path
//!
//! Predicates in the action catalog name properties as strings
//! (`severity`, `population.count`, `has_buff.QUARANTINE`). Each entity type
//! that predicates can see implements `PropertySource`.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::core::types::FactionId;
use crate::region::{BuffType, BuildingType, Owner, Region};
use crate::threat::Threat;
use crate::unit::{Satellite, Unit};

/// A resolved property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    Faction(FactionId),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_faction(&self) -> Option<FactionId> {
        match self {
            Value::Faction(f) => Some(*f),
            _ => None,
        }
    }

    fn owner(owner: Owner) -> Value {
        match owner {
            Owner::Neutral => Value::Text("NEUTRAL".to_string()),
            Owner::Faction(id) => Value::Faction(id),
        }
    }

    /// Convert a JSON leaf, used for property-bag lookups
    fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }
}

/// A literal as written in catalog data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Stands for the acting faction inside predicate literals
pub const PLAYER_TOKEN: &str = "PLAYER";
/// Stands for the acting faction inside effect params
pub const PLAYER_FACTION_TOKEN: &str = "playerFaction";

impl Literal {
    /// Resolve to a value, replacing `token` with the acting faction
    pub fn resolve(&self, token: &str, faction: FactionId) -> Value {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::Text(s) if s == token => Value::Faction(faction),
            Literal::Text(s) => Value::Text(s.clone()),
        }
    }
}

/// Trait for runtime access to entity properties by path
pub trait PropertySource {
    /// Get a value by dotted path, returns None if the path doesn't exist
    fn property(&self, path: &str) -> Option<Value>;

    /// List top-level property names for validation
    fn property_names() -> &'static [&'static str]
    where
        Self: Sized;
}

/// Split `a.b.c` into (`a`, Some(`b.c`))
fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

impl PropertySource for Threat {
    fn property(&self, path: &str) -> Option<Value> {
        let (head, rest) = split_path(path);
        match (head, rest) {
            ("severity", None) => Some(Value::Number(self.severity())),
            ("visibility", None) => Some(Value::Number(self.visibility())),
            ("spread_rate", None) => Some(Value::Number(self.spread_rate())),
            ("investigation_progress", None) => Some(Value::Number(self.investigation_progress())),
            ("is_investigated", None) => Some(Value::Bool(self.is_investigated())),
            ("is_mitigated", None) => Some(Value::Bool(self.is_mitigated())),
            ("domain", None) => Some(Value::Text(self.domain.as_str().to_string())),
            // Observers only ever see the apparent type
            ("type", None) => serde_json::to_value(self.apparent_type())
                .ok()
                .as_ref()
                .and_then(Value::from_json),
            ("origin", None) => Some(self.origin.map_or(Value::Text("NONE".to_string()), Value::Faction)),
            ("properties", Some(field)) => {
                let bag = serde_json::to_value(self.properties()).ok()?;
                field
                    .split('.')
                    .try_fold(&bag, |node, key| node.get(key))
                    .and_then(Value::from_json)
            }
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &[
            "severity",
            "visibility",
            "spread_rate",
            "investigation_progress",
            "is_investigated",
            "is_mitigated",
            "domain",
            "type",
            "origin",
            "properties",
        ]
    }
}

impl PropertySource for Region {
    fn property(&self, path: &str) -> Option<Value> {
        let (head, rest) = split_path(path);
        match (head, rest) {
            ("stability", None) => Some(Value::Number(self.stability())),
            ("economy", None) => Some(Value::Number(self.economy())),
            ("education", None) => Some(Value::Number(self.education())),
            ("owner", None) => Some(Value::owner(self.owner())),
            ("name", None) => Some(Value::Text(self.name.clone())),
            ("population", Some("count")) => Some(Value::Number(self.population().count as f64)),
            ("population", Some("growth_rate")) => Some(Value::Number(self.population().growth_rate)),
            ("population", Some("density")) => Some(Value::Number(self.population_density())),
            ("has_buff", Some(kind)) => kind.parse::<BuffType>().ok().map(|k| Value::Bool(self.has_buff(k))),
            ("has_building", Some(kind)) => kind
                .parse::<BuildingType>()
                .ok()
                .map(|k| Value::Bool(self.has_building(k))),
            ("buff_count", None) => Some(Value::Number(self.buffs().len() as f64)),
            ("weather", None) => serde_json::to_value(self.weather.current)
                .ok()
                .as_ref()
                .and_then(Value::from_json),
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &[
            "stability",
            "economy",
            "education",
            "owner",
            "name",
            "population",
            "has_buff",
            "has_building",
            "buff_count",
            "weather",
        ]
    }
}

impl PropertySource for Agent {
    fn property(&self, path: &str) -> Option<Value> {
        match path {
            "faction" => Some(Value::Faction(self.faction)),
            "level" => Some(Value::Number(self.level() as f64)),
            "experience" => Some(Value::Number(self.experience() as f64)),
            "status" => serde_json::to_value(self.status())
                .ok()
                .as_ref()
                .and_then(Value::from_json),
            "region" => Some(Value::Number(self.region.0 as f64)),
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &["faction", "level", "experience", "status", "region"]
    }
}

impl PropertySource for Unit {
    fn property(&self, path: &str) -> Option<Value> {
        match path {
            "faction" => Some(Value::Faction(self.faction)),
            "kind" => serde_json::to_value(self.kind).ok().as_ref().and_then(Value::from_json),
            "status" => serde_json::to_value(self.status())
                .ok()
                .as_ref()
                .and_then(Value::from_json),
            "region" => Some(self.region.map_or(Value::Text("NONE".to_string()), |r| Value::Number(r.0 as f64))),
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &["faction", "kind", "status", "region"]
    }
}

impl PropertySource for Satellite {
    fn property(&self, path: &str) -> Option<Value> {
        match path {
            "faction" => Some(Value::Faction(self.faction)),
            "altitude_km" => Some(Value::Number(self.altitude_km)),
            "inclination" => Some(Value::Number(self.inclination)),
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &["faction", "altitude_km", "inclination"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RegionId, ThreatId};
    use crate::region::Buff;
    use crate::threat::{ThreatDomain, ThreatSpawn, ThreatType};
    use glam::DVec3;

    #[test]
    fn test_threat_paths() {
        let threat = Threat::new(
            ThreatId(0),
            ThreatSpawn::new(ThreatDomain::Quantum, ThreatType::Fake, 0.4, DVec3::Z * 100.0),
            0.0,
        );
        assert_eq!(threat.property("severity"), Some(Value::Number(0.4)));
        assert_eq!(threat.property("domain"), Some(Value::Text("QUANTUM".into())));
        // Fake stays hidden until investigated
        assert_eq!(threat.property("type"), Some(Value::Text("UNKNOWN".into())));
        assert_eq!(threat.property("properties.coherence_time"), Some(Value::Number(10.0)));
        assert_eq!(threat.property("properties.nonexistent"), None);
        assert_eq!(threat.property("nonexistent"), None);
    }

    #[test]
    fn test_region_paths() {
        let mut region = Region::test_region(RegionId(0), 0.0, 0.0);
        region.add_buff(Buff::new(BuffType::Quarantine, 10.0, None));
        assert_eq!(region.property("has_buff.QUARANTINE"), Some(Value::Bool(true)));
        assert_eq!(region.property("has_buff.FORTIFIED"), Some(Value::Bool(false)));
        assert_eq!(region.property("has_buff.BOGUS"), None);
        assert_eq!(region.property("owner"), Some(Value::Text("NEUTRAL".into())));
        region.set_owner(Owner::Faction(FactionId(3)));
        assert_eq!(region.property("owner"), Some(Value::Faction(FactionId(3))));
        assert_eq!(region.property("population.count"), Some(Value::Number(1_000_000.0)));
    }

    #[test]
    fn test_player_token_resolution() {
        let lit = Literal::Text(PLAYER_TOKEN.to_string());
        assert_eq!(lit.resolve(PLAYER_TOKEN, FactionId(2)), Value::Faction(FactionId(2)));
        assert_eq!(
            Literal::Text("NEUTRAL".into()).resolve(PLAYER_TOKEN, FactionId(2)),
            Value::Text("NEUTRAL".into())
        );
    }

    #[test]
    fn test_property_names_cover_top_level() {
        assert!(Threat::property_names().contains(&"severity"));
        assert!(Region::property_names().contains(&"has_buff"));
    }
}
