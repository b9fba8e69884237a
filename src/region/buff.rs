//! Timed region and global status modifiers

use serde::{Deserialize, Serialize};

use crate::core::error::SimError;
use crate::core::types::FactionId;

/// A region-level status modifier. At most one of each type per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuffType {
    /// Suppresses BIO infectivity and blocks outbound contagion
    Quarantine,
    /// Pushes CYBER severity down
    NetworkScrub,
    /// Suppresses INFO spread
    CounterPropaganda,
    /// Cuts GEO damage by 80%
    Fortified,
    /// Trickles intel to the buff owner
    InformantNetwork,
    /// Boosts economic drift
    EconomicStimulus,
    /// Boosts education drift
    EducationDrive,
}

impl BuffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantine => "QUARANTINE",
            Self::NetworkScrub => "NETWORK_SCRUB",
            Self::CounterPropaganda => "COUNTER_PROPAGANDA",
            Self::Fortified => "FORTIFIED",
            Self::InformantNetwork => "INFORMANT_NETWORK",
            Self::EconomicStimulus => "ECONOMIC_STIMULUS",
            Self::EducationDrive => "EDUCATION_DRIVE",
        }
    }
}

impl std::str::FromStr for BuffType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUARANTINE" => Ok(Self::Quarantine),
            "NETWORK_SCRUB" => Ok(Self::NetworkScrub),
            "COUNTER_PROPAGANDA" => Ok(Self::CounterPropaganda),
            "FORTIFIED" => Ok(Self::Fortified),
            "INFORMANT_NETWORK" => Ok(Self::InformantNetwork),
            "ECONOMIC_STIMULUS" => Ok(Self::EconomicStimulus),
            "EDUCATION_DRIVE" => Ok(Self::EducationDrive),
            other => Err(SimError::Data(format!("unknown buff type '{}'", other))),
        }
    }
}

/// An active timed buff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub kind: BuffType,
    /// Seconds left before expiry
    pub remaining: f64,
    pub owner: Option<FactionId>,
}

impl Buff {
    pub fn new(kind: BuffType, duration: f64, owner: Option<FactionId>) -> Self {
        Self {
            kind,
            remaining: duration.max(0.0),
            owner,
        }
    }
}

/// World-wide modifiers that are not tied to a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalBuffType {
    /// Satellites yield no intel while active
    SatelliteDisruption,
}

impl std::str::FromStr for GlobalBuffType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SATELLITE_DISRUPTION" => Ok(Self::SatelliteDisruption),
            other => Err(SimError::Data(format!("unknown global buff '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalBuff {
    pub kind: GlobalBuffType,
    pub remaining: f64,
    pub owner: Option<FactionId>,
}

/// Ordered set of global buffs, unique by type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalBuffs {
    active: Vec<GlobalBuff>,
}

impl GlobalBuffs {
    pub fn is_active(&self, kind: GlobalBuffType) -> bool {
        self.active.iter().any(|b| b.kind == kind)
    }

    /// Returns false if a buff of this type is already active
    pub fn add(&mut self, kind: GlobalBuffType, duration: f64, owner: Option<FactionId>) -> bool {
        if self.is_active(kind) {
            return false;
        }
        self.active.push(GlobalBuff {
            kind,
            remaining: duration.max(0.0),
            owner,
        });
        true
    }

    /// Tick down, returns expired types
    pub fn tick(&mut self, dt: f64) -> Vec<GlobalBuffType> {
        let mut expired = Vec::new();
        for buff in &mut self.active {
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                expired.push(buff.kind);
            }
        }
        self.active.retain(|b| b.remaining > 0.0);
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobalBuff> {
        self.active.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buff_type_round_trip_names() {
        for kind in [
            BuffType::Quarantine,
            BuffType::NetworkScrub,
            BuffType::CounterPropaganda,
            BuffType::Fortified,
            BuffType::InformantNetwork,
        ] {
            assert_eq!(kind.as_str().parse::<BuffType>().unwrap(), kind);
        }
        assert!("SHIELD".parse::<BuffType>().is_err());
    }

    #[test]
    fn test_global_buffs_unique_and_expire() {
        let mut buffs = GlobalBuffs::default();
        assert!(buffs.add(GlobalBuffType::SatelliteDisruption, 2.0, None));
        assert!(!buffs.add(GlobalBuffType::SatelliteDisruption, 10.0, None));
        assert!(buffs.tick(1.0).is_empty());
        assert_eq!(buffs.tick(1.5), vec![GlobalBuffType::SatelliteDisruption]);
        assert!(!buffs.is_active(GlobalBuffType::SatelliteDisruption));
    }
}
