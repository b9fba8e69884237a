//! Declarative effects and their typed binding
//!
//! Catalog data names a target strategy, a method and positional params.
//! Before anything is spent, every effect of an action is bound into an
//! `EffectOp` against concrete ids. Binding fails if the method is not
//! supported by the resolved target or a param is malformed.

use serde::{Deserialize, Serialize};

use crate::actions::catalog::TargetType;
use crate::actions::property::{Literal, Value, PLAYER_FACTION_TOKEN};
use crate::core::types::{FactionId, RegionId, ThreatId};
use crate::faction::Resources;
use crate::region::{BuffType, BuildingType, GlobalBuffType, Owner};
use crate::unit::UnitKind;

/// How an effect finds its receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectTarget {
    SelectedThreat,
    /// Whatever the action itself targets (threat or region)
    ActionTarget,
    World,
    Unknown(String),
}

impl From<String> for EffectTarget {
    fn from(s: String) -> Self {
        match s.as_str() {
            "selected_threat" => Self::SelectedThreat,
            "action_target" => Self::ActionTarget,
            "world" => Self::World,
            _ => Self::Unknown(s),
        }
    }
}

impl From<EffectTarget> for String {
    fn from(t: EffectTarget) -> Self {
        match t {
            EffectTarget::SelectedThreat => "selected_threat".into(),
            EffectTarget::ActionTarget => "action_target".into(),
            EffectTarget::World => "world".into(),
            EffectTarget::Unknown(s) => s,
        }
    }
}

impl EffectTarget {
    /// Receiver kind this strategy yields for an action of `target_type`
    pub fn receiver(&self, target_type: TargetType) -> Option<Receiver> {
        match self {
            EffectTarget::SelectedThreat => Some(Receiver::Threat),
            EffectTarget::ActionTarget => match target_type {
                TargetType::Threat => Some(Receiver::Threat),
                TargetType::Region => Some(Receiver::Region),
                TargetType::None => None,
            },
            EffectTarget::World => Some(Receiver::World),
            EffectTarget::Unknown(_) => None,
        }
    }
}

/// Kind of entity an effect method runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Threat,
    Region,
    World,
}

/// The closed set of operations catalog data may call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EffectMethod {
    Investigate,
    Mitigate,
    AdjustSeverity,
    AddBuff,
    SetOwner,
    AddBuilding,
    AdjustStability,
    AdjustEconomy,
    AdjustEducation,
    RecruitAgent,
    DeployUnit,
    LaunchSatellite,
    AddGlobalBuff,
    GrantResources,
    AdvanceResearch,
    Unknown(String),
}

impl From<String> for EffectMethod {
    fn from(s: String) -> Self {
        match s.as_str() {
            "investigate" => Self::Investigate,
            "mitigate" => Self::Mitigate,
            "adjust_severity" => Self::AdjustSeverity,
            "add_buff" => Self::AddBuff,
            "set_owner" => Self::SetOwner,
            "add_building" => Self::AddBuilding,
            "adjust_stability" => Self::AdjustStability,
            "adjust_economy" => Self::AdjustEconomy,
            "adjust_education" => Self::AdjustEducation,
            "recruit_agent" => Self::RecruitAgent,
            "deploy_unit" => Self::DeployUnit,
            "launch_satellite" => Self::LaunchSatellite,
            "add_global_buff" => Self::AddGlobalBuff,
            "grant_resources" => Self::GrantResources,
            "advance_research" => Self::AdvanceResearch,
            _ => Self::Unknown(s),
        }
    }
}

impl From<EffectMethod> for String {
    fn from(m: EffectMethod) -> Self {
        m.name().to_string()
    }
}

impl EffectMethod {
    pub fn name(&self) -> &str {
        match self {
            Self::Investigate => "investigate",
            Self::Mitigate => "mitigate",
            Self::AdjustSeverity => "adjust_severity",
            Self::AddBuff => "add_buff",
            Self::SetOwner => "set_owner",
            Self::AddBuilding => "add_building",
            Self::AdjustStability => "adjust_stability",
            Self::AdjustEconomy => "adjust_economy",
            Self::AdjustEducation => "adjust_education",
            Self::RecruitAgent => "recruit_agent",
            Self::DeployUnit => "deploy_unit",
            Self::LaunchSatellite => "launch_satellite",
            Self::AddGlobalBuff => "add_global_buff",
            Self::GrantResources => "grant_resources",
            Self::AdvanceResearch => "advance_research",
            Self::Unknown(s) => s,
        }
    }

    /// Receiver that supports this method
    pub fn receiver(&self) -> Option<Receiver> {
        use EffectMethod::*;
        match self {
            Investigate | Mitigate | AdjustSeverity => Some(Receiver::Threat),
            AddBuff | SetOwner | AddBuilding | AdjustStability | AdjustEconomy
            | AdjustEducation | RecruitAgent | DeployUnit => Some(Receiver::Region),
            LaunchSatellite | AddGlobalBuff | GrantResources | AdvanceResearch => {
                Some(Receiver::World)
            }
            Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub target: EffectTarget,
    pub method: EffectMethod,
    #[serde(default)]
    pub params: Vec<Literal>,
}

/// A concrete receiver picked from the action context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    Threat(ThreatId),
    Region(RegionId),
    World,
}

impl ResolvedTarget {
    pub fn receiver(&self) -> Receiver {
        match self {
            ResolvedTarget::Threat(_) => Receiver::Threat,
            ResolvedTarget::Region(_) => Receiver::Region,
            ResolvedTarget::World => Receiver::World,
        }
    }
}

/// A fully bound effect, ready to apply
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOp {
    Investigate { threat: ThreatId, amount: f64 },
    Mitigate { threat: ThreatId },
    AdjustSeverity { threat: ThreatId, delta: f64 },
    AddBuff { region: RegionId, kind: BuffType, duration: f64, owner: Option<FactionId> },
    SetOwner { region: RegionId, owner: Owner },
    AddBuilding { region: RegionId, kind: BuildingType },
    AdjustStability { region: RegionId, delta: f64 },
    AdjustEconomy { region: RegionId, delta: f64 },
    AdjustEducation { region: RegionId, delta: f64 },
    RecruitAgent { region: RegionId, faction: FactionId },
    DeployUnit { region: RegionId, kind: UnitKind, faction: FactionId },
    LaunchSatellite { faction: FactionId, altitude_km: f64, inclination: f64 },
    AddGlobalBuff { kind: GlobalBuffType, duration: f64, owner: Option<FactionId> },
    GrantResources { faction: FactionId, amount: Resources },
    AdvanceResearch { faction: FactionId, amount: f64 },
}

/// Positional param reader with faction-token substitution
struct Params<'a> {
    method: &'a str,
    params: &'a [Literal],
    faction: FactionId,
}

impl Params<'_> {
    fn get(&self, i: usize) -> Option<Value> {
        self.params
            .get(i)
            .map(|p| p.resolve(PLAYER_FACTION_TOKEN, self.faction))
    }

    fn missing(&self, i: usize, what: &str) -> String {
        format!("{}: param {} must be {}", self.method, i, what)
    }

    fn number(&self, i: usize) -> Result<f64, String> {
        self.get(i)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| self.missing(i, "a number"))
    }

    fn text(&self, i: usize) -> Result<String, String> {
        match self.get(i) {
            Some(Value::Text(s)) => Ok(s),
            _ => Err(self.missing(i, "a name")),
        }
    }

    fn faction(&self, i: usize) -> Result<FactionId, String> {
        self.get(i)
            .and_then(|v| v.as_faction())
            .ok_or_else(|| self.missing(i, PLAYER_FACTION_TOKEN))
    }

    fn optional_faction(&self, i: usize) -> Result<Option<FactionId>, String> {
        match self.get(i) {
            None => Ok(None),
            Some(Value::Faction(f)) => Ok(Some(f)),
            Some(_) => Err(self.missing(i, PLAYER_FACTION_TOKEN)),
        }
    }

    fn parsed<T: std::str::FromStr>(&self, i: usize) -> Result<T, String>
    where
        T::Err: std::fmt::Display,
    {
        let name = self.text(i)?;
        name.parse::<T>()
            .map_err(|e| format!("{}: {}", self.method, e))
    }
}

impl Effect {
    /// Bind this effect to a concrete receiver for `faction`
    pub fn bind(&self, target: ResolvedTarget, faction: FactionId) -> Result<EffectOp, String> {
        let Some(expected) = self.method.receiver() else {
            return Err(format!("unknown effect method '{}'", self.method.name()));
        };
        if expected != target.receiver() {
            return Err(format!(
                "method '{}' is not supported by a {:?} target",
                self.method.name(),
                target.receiver()
            ));
        }
        let p = Params {
            method: self.method.name(),
            params: &self.params,
            faction,
        };

        let op = match (&self.method, target) {
            (EffectMethod::Investigate, ResolvedTarget::Threat(threat)) => EffectOp::Investigate {
                threat,
                amount: p.number(0)?,
            },
            (EffectMethod::Mitigate, ResolvedTarget::Threat(threat)) => EffectOp::Mitigate { threat },
            (EffectMethod::AdjustSeverity, ResolvedTarget::Threat(threat)) => {
                EffectOp::AdjustSeverity { threat, delta: p.number(0)? }
            }
            (EffectMethod::AddBuff, ResolvedTarget::Region(region)) => EffectOp::AddBuff {
                region,
                kind: p.parsed(0)?,
                duration: p.number(1)?,
                owner: p.optional_faction(2)?,
            },
            (EffectMethod::SetOwner, ResolvedTarget::Region(region)) => {
                let owner = match p.get(0) {
                    Some(Value::Faction(f)) => Owner::Faction(f),
                    Some(Value::Text(s)) if s == "NEUTRAL" => Owner::Neutral,
                    _ => return Err(p.missing(0, "playerFaction or NEUTRAL")),
                };
                EffectOp::SetOwner { region, owner }
            }
            (EffectMethod::AddBuilding, ResolvedTarget::Region(region)) => EffectOp::AddBuilding {
                region,
                kind: p.parsed(0)?,
            },
            (EffectMethod::AdjustStability, ResolvedTarget::Region(region)) => {
                EffectOp::AdjustStability { region, delta: p.number(0)? }
            }
            (EffectMethod::AdjustEconomy, ResolvedTarget::Region(region)) => {
                EffectOp::AdjustEconomy { region, delta: p.number(0)? }
            }
            (EffectMethod::AdjustEducation, ResolvedTarget::Region(region)) => {
                EffectOp::AdjustEducation { region, delta: p.number(0)? }
            }
            (EffectMethod::RecruitAgent, ResolvedTarget::Region(region)) => EffectOp::RecruitAgent {
                region,
                faction: p.faction(0)?,
            },
            (EffectMethod::DeployUnit, ResolvedTarget::Region(region)) => EffectOp::DeployUnit {
                region,
                kind: p.parsed(0)?,
                faction: p.faction(1)?,
            },
            (EffectMethod::LaunchSatellite, ResolvedTarget::World) => EffectOp::LaunchSatellite {
                faction: p.faction(0)?,
                altitude_km: p.number(1)?,
                inclination: p.number(2)?.to_radians(),
            },
            (EffectMethod::AddGlobalBuff, ResolvedTarget::World) => EffectOp::AddGlobalBuff {
                kind: p.parsed(0)?,
                duration: p.number(1)?,
                owner: p.optional_faction(2)?,
            },
            (EffectMethod::GrantResources, ResolvedTarget::World) => EffectOp::GrantResources {
                faction: p.faction(0)?,
                amount: Resources::new(p.number(1)?, p.number(2)?, p.number(3)?),
            },
            (EffectMethod::AdvanceResearch, ResolvedTarget::World) => EffectOp::AdvanceResearch {
                faction: p.faction(0)?,
                amount: p.number(1)?,
            },
            (method, target) => {
                return Err(format!("method '{}' cannot bind to {:?}", method.name(), target));
            }
        };
        Ok(op)
    }

    /// Load-time check against a placeholder receiver
    pub fn check(&self, target_type: TargetType) -> Result<(), String> {
        let receiver = self.target.receiver(target_type).ok_or_else(|| match &self.target {
            EffectTarget::Unknown(name) => format!("unknown effect target '{}'", name),
            _ => format!("'{:?}' has no receiver for a {:?} action", self.target, target_type),
        })?;
        let placeholder = match receiver {
            Receiver::Threat => ResolvedTarget::Threat(ThreatId(0)),
            Receiver::Region => ResolvedTarget::Region(RegionId(0)),
            Receiver::World => ResolvedTarget::World,
        };
        self.bind(placeholder, FactionId(0)).map(|_| ())
    }
}
