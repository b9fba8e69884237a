//! Threats - domain-tagged hazards on the map
//!
//! Lifecycle: UNINVESTIGATED -> (investigate x n) -> INVESTIGATED -> (mitigate)
//! -> MITIGATED, after which the manager removes the threat. Independently,
//! the domain logic for `threat.domain` runs every tick.
//!
//! Severity, visibility, spread rate, and investigation progress are clamped
//! to [0, 1] on every write, and every tracked write marks the threat dirty.

pub mod domain_logic;
pub mod interaction;
pub mod manager;
pub mod plume;
pub mod properties;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::error::SimError;
use crate::core::types::{clamp01, FactionId, SimTime, ThreatId};

pub use domain_logic::{DomainContext, DomainOutcome, RegionImpact};
pub use interaction::{Interaction, InteractionMatrix};
pub use manager::{ThreatManager, ThreatTickContext};
pub use properties::DomainProperties;

/// Threat category, each with its own update rule and property schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatDomain {
    Cyber,
    Bio,
    Geo,
    Env,
    Info,
    Space,
    Wmd,
    Econ,
    Quantum,
    Rad,
    Robot,
}

impl ThreatDomain {
    pub const ALL: [ThreatDomain; 11] = [
        ThreatDomain::Cyber,
        ThreatDomain::Bio,
        ThreatDomain::Geo,
        ThreatDomain::Env,
        ThreatDomain::Info,
        ThreatDomain::Space,
        ThreatDomain::Wmd,
        ThreatDomain::Econ,
        ThreatDomain::Quantum,
        ThreatDomain::Rad,
        ThreatDomain::Robot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cyber => "CYBER",
            Self::Bio => "BIO",
            Self::Geo => "GEO",
            Self::Env => "ENV",
            Self::Info => "INFO",
            Self::Space => "SPACE",
            Self::Wmd => "WMD",
            Self::Econ => "ECON",
            Self::Quantum => "QUANTUM",
            Self::Rad => "RAD",
            Self::Robot => "ROBOT",
        }
    }

    /// (economy, stability) damage multipliers applied per second of exposure
    pub fn damage_multipliers(&self) -> (f64, f64) {
        match self {
            Self::Cyber => (1.2, 0.4),
            Self::Bio => (0.8, 1.0),
            Self::Geo => (1.0, 1.0),
            Self::Env => (0.6, 0.3),
            Self::Info => (0.2, 1.2),
            Self::Space => (0.5, 0.2),
            Self::Wmd => (1.5, 1.5),
            Self::Econ => (1.5, 0.5),
            Self::Quantum => (0.9, 0.3),
            Self::Rad => (0.7, 0.9),
            Self::Robot => (0.8, 0.8),
        }
    }
}

impl std::fmt::Display for ThreatDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThreatDomain {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThreatDomain::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| SimError::Data(format!("unknown threat domain '{}'", s)))
    }
}

/// Whether a threat is genuine. UNKNOWN is only ever an apparent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatType {
    Real,
    Fake,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatSubType {
    Ransomware,
    Botnet,
    Pandemic,
    Disinformation,
    Fallout,
    Debris,
}

/// Everything needed to create a threat; ids are assigned by the manager
#[derive(Debug, Clone)]
pub struct ThreatSpawn {
    pub domain: ThreatDomain,
    pub threat_type: ThreatType,
    pub sub_type: Option<ThreatSubType>,
    pub severity: f64,
    pub position: DVec3,
    pub properties: Option<DomainProperties>,
    pub origin: Option<FactionId>,
}

impl ThreatSpawn {
    pub fn new(domain: ThreatDomain, threat_type: ThreatType, severity: f64, position: DVec3) -> Self {
        Self {
            domain,
            threat_type,
            sub_type: None,
            severity,
            position,
            properties: None,
            origin: None,
        }
    }

    pub fn with_sub_type(mut self, sub_type: ThreatSubType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    pub fn with_properties(mut self, properties: DomainProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_origin(mut self, origin: FactionId) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// A live hazard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub id: ThreatId,
    pub domain: ThreatDomain,
    threat_type: ThreatType,
    pub sub_type: Option<ThreatSubType>,
    pub position: DVec3,
    severity: f64,
    visibility: f64,
    investigation_progress: f64,
    spread_rate: f64,
    properties: DomainProperties,
    is_mitigated: bool,
    was_mitigated_by_player: bool,
    pub(crate) has_had_initial_impact: bool,
    /// Faction that generated the threat, if any
    pub origin: Option<FactionId>,
    pub created_at: SimTime,
    #[serde(skip)]
    dirty: bool,
}

impl Threat {
    pub fn new(id: ThreatId, spawn: ThreatSpawn, created_at: SimTime) -> Self {
        let properties = spawn
            .properties
            .unwrap_or_else(|| DomainProperties::seeded(spawn.domain, spawn.severity));
        let threat_type = match spawn.threat_type {
            // A threat is always genuinely one or the other
            ThreatType::Unknown => ThreatType::Real,
            t => t,
        };
        Self {
            id,
            domain: spawn.domain,
            threat_type,
            sub_type: spawn.sub_type,
            position: spawn.position,
            severity: clamp01(spawn.severity),
            visibility: 0.1,
            investigation_progress: 0.0,
            spread_rate: 0.1,
            properties,
            is_mitigated: false,
            was_mitigated_by_player: false,
            has_had_initial_impact: false,
            origin: spawn.origin,
            created_at,
            dirty: true,
        }
    }

    pub fn severity(&self) -> f64 {
        self.severity
    }

    pub fn visibility(&self) -> f64 {
        self.visibility
    }

    pub fn spread_rate(&self) -> f64 {
        self.spread_rate
    }

    pub fn investigation_progress(&self) -> f64 {
        self.investigation_progress
    }

    pub fn set_severity(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.severity {
            self.severity = value;
            self.dirty = true;
        }
    }

    pub fn set_visibility(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.visibility {
            self.visibility = value;
            self.dirty = true;
        }
    }

    pub fn set_spread_rate(&mut self, value: f64) {
        let value = clamp01(value);
        if value != self.spread_rate {
            self.spread_rate = value;
            self.dirty = true;
        }
    }

    pub fn adjust_severity(&mut self, delta: f64) {
        self.set_severity(self.severity + delta);
    }

    pub fn adjust_visibility(&mut self, delta: f64) {
        self.set_visibility(self.visibility + delta);
    }

    pub fn adjust_spread_rate(&mut self, delta: f64) {
        self.set_spread_rate(self.spread_rate + delta);
    }

    pub fn properties(&self) -> &DomainProperties {
        &self.properties
    }

    /// Mutable access to the property bag; marks the threat dirty
    pub fn properties_mut(&mut self) -> &mut DomainProperties {
        self.dirty = true;
        &mut self.properties
    }

    /// Bag access for bookkeeping fields the presentation never shows.
    /// Does not mark the threat dirty.
    pub(crate) fn properties_untracked_mut(&mut self) -> &mut DomainProperties {
        &mut self.properties
    }

    /// Run `f` over the bag and the scalar fields together. The threat is
    /// marked dirty only if a scalar or the bag actually changed.
    pub(crate) fn update_bag<R>(&mut self, f: impl FnOnce(&mut DomainProperties, &mut ThreatScalars<'_>) -> R) -> R {
        let before = self.properties.clone();
        let mut scalars = ThreatScalars {
            severity: &mut self.severity,
            visibility: &mut self.visibility,
            spread_rate: &mut self.spread_rate,
            dirty: &mut self.dirty,
        };
        let result = f(&mut self.properties, &mut scalars);
        if self.properties != before {
            self.dirty = true;
        }
        result
    }

    /// The true type, regardless of investigation
    pub fn true_type(&self) -> ThreatType {
        self.threat_type
    }

    /// What an observer knows: UNKNOWN until fully investigated
    pub fn apparent_type(&self) -> ThreatType {
        if self.is_investigated() {
            self.threat_type
        } else {
            ThreatType::Unknown
        }
    }

    pub fn is_investigated(&self) -> bool {
        self.investigation_progress >= 1.0
    }

    /// Advance investigation, returns true if this call completed it
    pub fn investigate(&mut self, amount: f64) -> bool {
        if self.is_investigated() || amount <= 0.0 {
            return false;
        }
        self.investigation_progress = clamp01(self.investigation_progress + amount);
        // Investigating draws attention to the threat
        self.visibility = clamp01(self.visibility + amount * 0.5);
        self.dirty = true;
        self.is_investigated()
    }

    /// Mitigate an investigated threat. Returns false if not yet investigated
    /// or already mitigated.
    pub fn mitigate(&mut self, by_player: bool) -> bool {
        if self.is_mitigated || !self.is_investigated() {
            return false;
        }
        self.is_mitigated = true;
        self.was_mitigated_by_player = by_player;
        self.dirty = true;
        true
    }

    /// Instantaneous domains end themselves after their impact
    pub fn self_terminate(&mut self) {
        if !self.is_mitigated {
            self.is_mitigated = true;
            self.dirty = true;
        }
    }

    pub fn is_mitigated(&self) -> bool {
        self.is_mitigated
    }

    pub fn was_mitigated_by_player(&self) -> bool {
        self.was_mitigated_by_player
    }

    pub fn has_had_initial_impact(&self) -> bool {
        self.has_had_initial_impact
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Mutable views of the clamped scalars, handed out alongside the bag
pub(crate) struct ThreatScalars<'a> {
    severity: &'a mut f64,
    visibility: &'a mut f64,
    spread_rate: &'a mut f64,
    dirty: &'a mut bool,
}

fn set_tracked(field: &mut f64, dirty: &mut bool, value: f64) {
    let value = clamp01(value);
    if value != *field {
        *field = value;
        *dirty = true;
    }
}

impl ThreatScalars<'_> {
    pub fn severity(&self) -> f64 {
        *self.severity
    }

    pub fn set_severity(&mut self, value: f64) {
        set_tracked(self.severity, self.dirty, value);
    }

    pub fn visibility(&self) -> f64 {
        *self.visibility
    }

    pub fn set_visibility(&mut self, value: f64) {
        set_tracked(self.visibility, self.dirty, value);
    }

    pub fn spread_rate(&self) -> f64 {
        *self.spread_rate
    }

    pub fn set_spread_rate(&mut self, value: f64) {
        set_tracked(self.spread_rate, self.dirty, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat(domain: ThreatDomain) -> Threat {
        Threat::new(
            ThreatId(1),
            ThreatSpawn::new(domain, ThreatType::Real, 0.5, DVec3::Z * 100.0),
            0.0,
        )
    }

    #[test]
    fn test_scalars_clamp() {
        let mut t = threat(ThreatDomain::Cyber);
        t.set_severity(4.0);
        t.adjust_visibility(-1.0);
        t.set_spread_rate(f64::NAN);
        assert_eq!(t.severity(), 1.0);
        assert_eq!(t.visibility(), 0.0);
        assert_eq!(t.spread_rate(), 0.0);
    }

    #[test]
    fn test_mitigation_requires_investigation() {
        let mut t = threat(ThreatDomain::Bio);
        assert!(!t.mitigate(true));
        assert_eq!(t.apparent_type(), ThreatType::Unknown);

        assert!(!t.investigate(0.6));
        assert!(t.investigate(0.6));
        assert_eq!(t.investigation_progress(), 1.0);
        assert_eq!(t.apparent_type(), ThreatType::Real);

        assert!(t.mitigate(true));
        assert!(t.is_mitigated());
        assert!(t.was_mitigated_by_player());
        assert!(!t.mitigate(true));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut t = threat(ThreatDomain::Info);
        assert!(t.is_dirty());
        t.clear_dirty();
        t.set_severity(0.5);
        assert!(!t.is_dirty(), "unchanged value should not dirty");
        t.set_severity(0.6);
        assert!(t.is_dirty());
    }

    #[test]
    fn test_rad_contamination_seeded_from_severity() {
        let t = Threat::new(
            ThreatId(3),
            ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, 0.2, DVec3::Z * 100.0),
            0.0,
        );
        match t.properties() {
            DomainProperties::Radiological(rad) => assert_eq!(rad.contamination, 0.2),
            other => panic!("unexpected bag {:?}", other),
        }
        assert_eq!(t.severity(), 0.2);
    }

    #[test]
    fn test_unchanged_bag_update_stays_clean() {
        let mut t = threat(ThreatDomain::Env);
        t.clear_dirty();
        t.update_bag(|_, s| s.set_severity(0.5));
        assert!(!t.is_dirty());
        t.update_bag(|bag, _| {
            if let DomainProperties::Environmental(p) = bag {
                p.area_of_effect += 1.0;
            }
        });
        assert!(t.is_dirty());
        t.clear_dirty();
        t.update_bag(|_, s| s.set_visibility(0.9));
        assert!(t.is_dirty());
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!("QUANTUM".parse::<ThreatDomain>().unwrap(), ThreatDomain::Quantum);
        assert!("PSYCHIC".parse::<ThreatDomain>().is_err());
    }
}
