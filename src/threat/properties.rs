//! Domain-specific threat state
//!
//! Each threat carries exactly one property bag, the one matching its domain.
//! `DomainProperties::None` stands for a missing bag; domain logic treats it
//! as a no-op.

use serde::{Deserialize, Serialize};

use crate::core::types::clamp01;
use crate::threat::ThreatDomain;

/// Sentinel written to `coherence_time` once decoherence has fired
pub const COHERENCE_COLLAPSED: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiologicalProperties {
    pub lethality: f64,
    pub infectivity: f64,
    /// Accumulated dt toward the next spread check
    pub spread_timer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyberProperties {
    /// How hard the intrusion is to detect, decays over time
    pub stealth: f64,
    pub compromised_systems: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologicalProperties {
    /// Richter-style magnitude, 0-10
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalProperties {
    /// Affected area in game-space units
    pub area_of_effect: f64,
    pub pollutant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationalProperties {
    pub polarization: f64,
    pub credibility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceProperties {
    pub altitude_km: f64,
    pub debris_density: f64,
    /// Kilometres of altitude lost per second before debris drag
    pub decay_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmdProperties {
    /// Yield in kilotons
    pub yield_kt: f64,
    pub fallout_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicProperties {
    pub contagion_risk: f64,
    pub market_volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuantumEffect {
    CryptographicBreak,
    SensorSpoofing,
    TimingAnomaly,
    EntanglementLeak,
}

impl QuantumEffect {
    pub const ALL: [QuantumEffect; 4] = [
        QuantumEffect::CryptographicBreak,
        QuantumEffect::SensorSpoofing,
        QuantumEffect::TimingAnomaly,
        QuantumEffect::EntanglementLeak,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumProperties {
    /// Falls with severity; below 1.0 the system decoheres (once)
    pub coherence_time: f64,
    pub entanglement: f64,
    pub effects: Vec<QuantumEffect>,
}

impl QuantumProperties {
    pub fn has_collapsed(&self) -> bool {
        self.coherence_time == COHERENCE_COLLAPSED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadiologicalProperties {
    pub contamination: f64,
    /// Seconds for contamination to halve
    pub half_life: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgorithmTag {
    DeepLearning,
    ReinforcementLearning,
    SwarmCoordination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureMode {
    GoalMisalignment,
    RewardHacking,
    CascadingMalfunction,
    SensorBlindness,
}

impl FailureMode {
    pub const ALL: [FailureMode; 4] = [
        FailureMode::GoalMisalignment,
        FailureMode::RewardHacking,
        FailureMode::CascadingMalfunction,
        FailureMode::SensorBlindness,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmergentBehavior {
    SelfModification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoboticProperties {
    pub intelligence: f64,
    pub adaptation_rate: f64,
    pub autonomy: f64,
    pub decision_level: f64,
    pub algorithms: Vec<AlgorithmTag>,
    pub failure_modes: Vec<FailureMode>,
    pub emergent_behaviors: Vec<EmergentBehavior>,
}

/// The single active property bag of a threat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainProperties {
    None,
    Biological(BiologicalProperties),
    Cyber(CyberProperties),
    Geological(GeologicalProperties),
    Environmental(EnvironmentalProperties),
    Informational(InformationalProperties),
    Space(SpaceProperties),
    Wmd(WmdProperties),
    Economic(EconomicProperties),
    Quantum(QuantumProperties),
    Radiological(RadiologicalProperties),
    Robotic(RoboticProperties),
}

impl DomainProperties {
    /// Starting bag for a freshly generated threat of `domain`
    pub fn default_for(domain: ThreatDomain) -> Self {
        match domain {
            ThreatDomain::Bio => Self::Biological(BiologicalProperties {
                lethality: 0.1,
                infectivity: 0.3,
                spread_timer: 0.0,
            }),
            ThreatDomain::Cyber => Self::Cyber(CyberProperties {
                stealth: 0.8,
                compromised_systems: 10,
            }),
            ThreatDomain::Geo => Self::Geological(GeologicalProperties { magnitude: 6.5 }),
            ThreatDomain::Env => Self::Environmental(EnvironmentalProperties {
                area_of_effect: 1.0,
                pollutant: "industrial".to_string(),
            }),
            ThreatDomain::Info => Self::Informational(InformationalProperties {
                polarization: 0.4,
                credibility: 0.5,
            }),
            ThreatDomain::Space => Self::Space(SpaceProperties {
                altitude_km: 420.0,
                debris_density: 0.2,
                decay_rate: 0.05,
            }),
            ThreatDomain::Wmd => Self::Wmd(WmdProperties {
                yield_kt: 15.0,
                fallout_potential: 0.4,
            }),
            ThreatDomain::Econ => Self::Economic(EconomicProperties {
                contagion_risk: 0.2,
                market_volatility: 0.3,
            }),
            ThreatDomain::Quantum => Self::Quantum(QuantumProperties {
                coherence_time: 10.0,
                entanglement: 0.2,
                effects: Vec::new(),
            }),
            ThreatDomain::Rad => Self::Radiological(RadiologicalProperties {
                contamination: 0.5,
                half_life: 600.0,
            }),
            ThreatDomain::Robot => Self::Robotic(RoboticProperties {
                intelligence: 0.2,
                adaptation_rate: 0.5,
                autonomy: 0.0,
                decision_level: 0.0,
                algorithms: vec![AlgorithmTag::ReinforcementLearning],
                failure_modes: Vec::new(),
                emergent_behaviors: Vec::new(),
            }),
        }
    }

    /// Default bag for `domain`, with severity-linked fields set from `severity`
    pub fn seeded(domain: ThreatDomain, severity: f64) -> Self {
        let mut bag = Self::default_for(domain);
        if let Self::Radiological(rad) = &mut bag {
            rad.contamination = clamp01(severity);
        }
        bag
    }

    /// The domain whose logic reads this bag, if any
    pub fn domain(&self) -> Option<ThreatDomain> {
        Some(match self {
            Self::None => return None,
            Self::Biological(_) => ThreatDomain::Bio,
            Self::Cyber(_) => ThreatDomain::Cyber,
            Self::Geological(_) => ThreatDomain::Geo,
            Self::Environmental(_) => ThreatDomain::Env,
            Self::Informational(_) => ThreatDomain::Info,
            Self::Space(_) => ThreatDomain::Space,
            Self::Wmd(_) => ThreatDomain::Wmd,
            Self::Economic(_) => ThreatDomain::Econ,
            Self::Quantum(_) => ThreatDomain::Quantum,
            Self::Radiological(_) => ThreatDomain::Rad,
            Self::Robotic(_) => ThreatDomain::Robot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bag_matches_domain() {
        for domain in ThreatDomain::ALL {
            assert_eq!(DomainProperties::default_for(domain).domain(), Some(domain));
        }
        assert_eq!(DomainProperties::None.domain(), None);
    }

    #[test]
    fn test_collapsed_sentinel() {
        let mut q = QuantumProperties {
            coherence_time: 0.5,
            entanglement: 0.0,
            effects: vec![],
        };
        assert!(!q.has_collapsed());
        q.coherence_time = COHERENCE_COLLAPSED;
        assert!(q.has_collapsed());
    }
}
