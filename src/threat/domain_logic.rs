//! Per-domain threat update rules
//!
//! `update` dispatches on `ThreatDomain`. Each rule mutates only the threat
//! and reads the region the threat sits in; anything that must touch other
//! state (region damage, faction funds, new threats, log entries) is returned
//! in a `DomainOutcome` for the manager to apply.
//!
//! A threat whose property bag does not match its domain (or is `None`) is
//! left untouched.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use crate::core::types::{clamp01, FactionId, RegionId};
use crate::narrative::EventType;
use crate::region::{BuffType, Region};
use crate::threat::properties::{
    AlgorithmTag, BiologicalProperties, CyberProperties, DomainProperties, EconomicProperties,
    EmergentBehavior, EnvironmentalProperties, FailureMode, GeologicalProperties,
    InformationalProperties, QuantumEffect, QuantumProperties, RadiologicalProperties,
    RoboticProperties, SpaceProperties, WmdProperties, COHERENCE_COLLAPSED,
};
use crate::threat::{Threat, ThreatDomain, ThreatScalars, ThreatSpawn, ThreatSubType, ThreatType};

// === QUANTUM ===
const COHERENCE_DECAY: f64 = 0.01;
const COHERENCE_THRESHOLD: f64 = 1.0;
const ENTANGLEMENT_GROWTH: f64 = 0.005;
const COLLAPSE_VISIBILITY_PENALTY: f64 = 0.2;

// === ROBOT ===
const INTELLIGENCE_GAIN: f64 = 0.01;
const DEEP_LEARNING_BONUS: f64 = 1.5;
const AUTONOMY_THRESHOLD: f64 = 0.5;
const AUTONOMY_GAIN: f64 = 0.02;
const DECISION_GAIN: f64 = 0.01;
const FAILURE_THRESHOLD: f64 = 0.7;
const EMERGENCE_THRESHOLD: f64 = 0.7;

// === BIO ===
const LETHALITY_RATE: f64 = 0.001;
const INFECTIVITY_GROWTH: f64 = 0.005;
const QUARANTINE_DECAY: f64 = 0.01;

// === CYBER ===
const STEALTH_DECAY: f64 = 0.01;
const CYBER_GROWTH: f64 = 0.002;
const SCRUB_DECAY: f64 = 0.02;
const RANSOM_DRAIN_RATE: f64 = 5.0;

// === INFO ===
const INFO_SPREAD_GAIN: f64 = 0.01;
const PROPAGANDA_SUPPRESSION: f64 = 0.02;
const POLARIZATION_GAIN: f64 = 0.001;

// === ECON ===
const CONTAGION_GAIN: f64 = 0.001;

// === GEO / WMD ===
const GEO_IMPACT_SCALE: f64 = 0.3;
const GEO_ECONOMY_FACTOR: f64 = 0.8;
const WMD_IMPACT_SCALE: f64 = 0.6;
const WMD_YIELD_REFERENCE: f64 = 1000.0;
const FALLOUT_THRESHOLD: f64 = 0.5;
const FALLOUT_HALF_LIFE: f64 = 900.0;

// === SPACE ===
const KARMAN_LINE_KM: f64 = 100.0;

// === ENV ===
const AREA_GROWTH: f64 = 0.01;

/// What a domain rule may read besides the threat itself
pub struct DomainContext<'a> {
    /// Region the threat sits in (nearest-region membership)
    pub region: Option<&'a Region>,
    pub rng: &'a mut ChaCha8Rng,
}

/// One-shot damage to the hosting region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionImpact {
    pub region: RegionId,
    pub stability: f64,
    pub economy: f64,
}

/// Funds removed from a faction (ransomware)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundsDrain {
    pub faction: FactionId,
    pub amount: f64,
}

/// Side effects requested by a domain rule
#[derive(Debug, Default)]
pub struct DomainOutcome {
    pub events: Vec<(EventType, serde_json::Value)>,
    pub region_impact: Option<RegionImpact>,
    pub funds_drain: Option<FundsDrain>,
    pub spawns: Vec<ThreatSpawn>,
}

impl DomainOutcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
            && self.region_impact.is_none()
            && self.funds_drain.is_none()
            && self.spawns.is_empty()
    }
}

/// Run the domain rule for `threat` over `dt` seconds
pub fn update(threat: &mut Threat, dt: f64, ctx: &mut DomainContext) -> DomainOutcome {
    let mut out = DomainOutcome::default();
    if threat.is_mitigated() || dt <= 0.0 {
        return out;
    }
    let bag_matches = threat.properties().domain() == Some(threat.domain);
    if !bag_matches {
        return out;
    }

    let id = threat.id;
    let domain = threat.domain;
    let sub_type = threat.sub_type;
    let position = threat.position;
    let origin = threat.origin;
    let already_impacted = threat.has_had_initial_impact;

    let (terminate, impacted) = threat.update_bag(|bag, s| {
        let mut terminate = false;
        let mut impacted = false;
        match (domain, bag) {
            (ThreatDomain::Quantum, DomainProperties::Quantum(p)) => {
                update_quantum(p, s, dt, ctx, &mut out, id.0)
            }
            (ThreatDomain::Robot, DomainProperties::Robotic(p)) => {
                update_robot(p, s, dt, ctx, &mut out, id.0)
            }
            (ThreatDomain::Bio, DomainProperties::Biological(p)) => update_bio(p, s, dt, ctx),
            (ThreatDomain::Cyber, DomainProperties::Cyber(p)) => {
                update_cyber(p, s, dt, ctx, sub_type, &mut out)
            }
            (ThreatDomain::Info, DomainProperties::Informational(p)) => {
                update_info(p, s, dt, ctx)
            }
            (ThreatDomain::Econ, DomainProperties::Economic(p)) => update_econ(p, s, dt, ctx),
            (ThreatDomain::Geo, DomainProperties::Geological(p)) => {
                if !already_impacted {
                    impact_geo(p, ctx, &mut out, id.0);
                    impacted = true;
                    terminate = true;
                }
            }
            (ThreatDomain::Wmd, DomainProperties::Wmd(p)) => {
                if !already_impacted {
                    impact_wmd(p, ctx, &mut out, id.0, position, origin);
                    impacted = true;
                    terminate = true;
                }
            }
            (ThreatDomain::Rad, DomainProperties::Radiological(p)) => update_rad(p, s, dt),
            (ThreatDomain::Space, DomainProperties::Space(p)) => {
                terminate = update_space(p, dt, &mut out, id.0);
            }
            (ThreatDomain::Env, DomainProperties::Environmental(p)) => update_env(p, s, dt),
            _ => {}
        }
        (terminate, impacted)
    });

    if impacted {
        threat.has_had_initial_impact = true;
    }
    if terminate {
        threat.self_terminate();
    }
    out
}

fn update_quantum(
    p: &mut QuantumProperties,
    s: &mut ThreatScalars,
    dt: f64,
    ctx: &mut DomainContext,
    out: &mut DomainOutcome,
    threat_id: u32,
) {
    p.entanglement = clamp01(p.entanglement + ENTANGLEMENT_GROWTH * s.severity() * dt);

    if p.has_collapsed() {
        return;
    }

    p.coherence_time -= COHERENCE_DECAY * s.severity() * dt;
    if p.coherence_time < COHERENCE_THRESHOLD {
        s.set_severity(s.severity() * 0.5);
        s.set_visibility(s.visibility() + COLLAPSE_VISIBILITY_PENALTY);
        let effect = *QuantumEffect::ALL
            .choose(ctx.rng)
            .unwrap_or(&QuantumEffect::TimingAnomaly);
        p.effects.push(effect);
        p.coherence_time = COHERENCE_COLLAPSED;
        out.events.push((
            EventType::QuantumCollapse,
            json!({ "threat": threat_id, "effect": effect }),
        ));
    }
}

fn update_robot(
    p: &mut RoboticProperties,
    s: &ThreatScalars,
    dt: f64,
    ctx: &mut DomainContext,
    out: &mut DomainOutcome,
    threat_id: u32,
) {
    let mut gain = p.adaptation_rate * s.severity() * INTELLIGENCE_GAIN * dt;
    if p.algorithms.contains(&AlgorithmTag::DeepLearning) {
        gain *= DEEP_LEARNING_BONUS;
    }
    p.intelligence = clamp01(p.intelligence + gain);

    if p.intelligence > AUTONOMY_THRESHOLD {
        p.autonomy = clamp01(p.autonomy + (p.intelligence - AUTONOMY_THRESHOLD) * AUTONOMY_GAIN * dt);
        let before = p.decision_level;
        p.decision_level = clamp01(p.decision_level + p.autonomy * DECISION_GAIN * dt);

        if before <= FAILURE_THRESHOLD && p.decision_level > FAILURE_THRESHOLD {
            let mode = *FailureMode::ALL
                .choose(ctx.rng)
                .unwrap_or(&FailureMode::GoalMisalignment);
            if !p.failure_modes.contains(&mode) {
                p.failure_modes.push(mode);
                out.events.push((
                    EventType::RobotFailureMode,
                    json!({ "threat": threat_id, "mode": mode }),
                ));
            }
        }
    }

    if p.intelligence > EMERGENCE_THRESHOLD
        && !p.emergent_behaviors.contains(&EmergentBehavior::SelfModification)
    {
        p.emergent_behaviors.push(EmergentBehavior::SelfModification);
        out.events.push((
            EventType::RobotEmergentBehavior,
            json!({ "threat": threat_id, "behavior": EmergentBehavior::SelfModification }),
        ));
    }
}

fn update_bio(p: &mut BiologicalProperties, s: &mut ThreatScalars, dt: f64, ctx: &DomainContext) {
    p.lethality = clamp01(p.lethality + LETHALITY_RATE * dt);

    let quarantined = ctx.region.is_some_and(|r| r.has_buff(BuffType::Quarantine));
    if quarantined {
        p.infectivity = clamp01(p.infectivity - QUARANTINE_DECAY * dt);
    } else {
        let density = ctx.region.map_or(0.0, |r| r.population_density());
        p.infectivity = clamp01(p.infectivity + INFECTIVITY_GROWTH * density * dt);
    }
    s.set_spread_rate(p.infectivity);
}

fn update_cyber(
    p: &mut CyberProperties,
    s: &mut ThreatScalars,
    dt: f64,
    ctx: &DomainContext,
    sub_type: Option<ThreatSubType>,
    out: &mut DomainOutcome,
) {
    p.stealth = clamp01(p.stealth - STEALTH_DECAY * dt);
    if s.visibility() < 1.0 - p.stealth {
        s.set_visibility(1.0 - p.stealth);
    }

    let scrubbed = ctx.region.is_some_and(|r| r.has_buff(BuffType::NetworkScrub));
    if scrubbed {
        s.set_severity(s.severity() - SCRUB_DECAY * dt);
    } else {
        s.set_severity(s.severity() + CYBER_GROWTH * dt);
    }

    if sub_type == Some(ThreatSubType::Ransomware) {
        if let Some(owner) = ctx.region.and_then(|r| r.owner().faction()) {
            out.funds_drain = Some(FundsDrain {
                faction: owner,
                amount: RANSOM_DRAIN_RATE * s.severity() * dt,
            });
        }
    }
}

fn update_info(p: &mut InformationalProperties, s: &mut ThreatScalars, dt: f64, ctx: &DomainContext) {
    p.polarization = clamp01(p.polarization + POLARIZATION_GAIN * s.severity() * dt);

    let suppressed = ctx
        .region
        .is_some_and(|r| r.has_buff(BuffType::CounterPropaganda));
    if suppressed {
        s.set_spread_rate(s.spread_rate() - PROPAGANDA_SUPPRESSION * dt);
    } else {
        s.set_spread_rate(s.spread_rate() + INFO_SPREAD_GAIN * p.polarization * dt);
    }
}

fn update_econ(p: &mut EconomicProperties, s: &ThreatScalars, dt: f64, ctx: &DomainContext) {
    // Weak economies catch contagion faster
    let economy = ctx.region.map_or(0.5, |r| r.economy());
    p.contagion_risk = clamp01(p.contagion_risk + CONTAGION_GAIN * (2.0 - economy) * s.severity() * dt);
    p.market_volatility = clamp01(p.market_volatility.max(p.contagion_risk * 0.5));
}

fn impact_geo(p: &GeologicalProperties, ctx: &DomainContext, out: &mut DomainOutcome, threat_id: u32) {
    let stability = (p.magnitude / 10.0).clamp(0.0, 1.0) * GEO_IMPACT_SCALE;
    let region = ctx.region.map(|r| r.id);
    if let Some(region) = region {
        out.region_impact = Some(RegionImpact {
            region,
            stability,
            economy: stability * GEO_ECONOMY_FACTOR,
        });
    }
    out.events.push((
        EventType::SeismicImpact,
        json!({ "threat": threat_id, "magnitude": p.magnitude, "region": region.map(|r| r.0) }),
    ));
}

fn impact_wmd(
    p: &WmdProperties,
    ctx: &DomainContext,
    out: &mut DomainOutcome,
    threat_id: u32,
    position: glam::DVec3,
    origin: Option<FactionId>,
) {
    let magnitude = (p.yield_kt / WMD_YIELD_REFERENCE).min(1.0).max(0.0) * WMD_IMPACT_SCALE;
    let region = ctx.region.map(|r| r.id);
    if let Some(region) = region {
        out.region_impact = Some(RegionImpact {
            region,
            stability: magnitude,
            economy: magnitude,
        });
    }
    out.events.push((
        EventType::WmdDetonation,
        json!({ "threat": threat_id, "yield_kt": p.yield_kt, "region": region.map(|r| r.0) }),
    ));

    if p.fallout_potential > FALLOUT_THRESHOLD {
        let mut spawn = ThreatSpawn::new(ThreatDomain::Rad, ThreatType::Real, p.fallout_potential, position)
            .with_sub_type(ThreatSubType::Fallout)
            .with_properties(DomainProperties::Radiological(RadiologicalProperties {
                contamination: p.fallout_potential,
                half_life: FALLOUT_HALF_LIFE,
            }));
        if let Some(origin) = origin {
            spawn = spawn.with_origin(origin);
        }
        out.spawns.push(spawn);
    }
}

fn update_rad(p: &mut RadiologicalProperties, s: &mut ThreatScalars, dt: f64) {
    if p.half_life > 0.0 {
        let decay = p.contamination * std::f64::consts::LN_2 / p.half_life * dt;
        p.contamination = clamp01(p.contamination - decay);
    }
    s.set_severity(p.contamination);
}

/// Returns true on re-entry
fn update_space(p: &mut SpaceProperties, dt: f64, out: &mut DomainOutcome, threat_id: u32) -> bool {
    p.altitude_km -= p.decay_rate * (1.0 + p.debris_density) * dt;
    if p.altitude_km < KARMAN_LINE_KM {
        out.events.push((
            EventType::OrbitalReentry,
            json!({ "threat": threat_id, "altitude_km": p.altitude_km }),
        ));
        return true;
    }
    false
}

fn update_env(p: &mut EnvironmentalProperties, s: &ThreatScalars, dt: f64) {
    p.area_of_effect = (p.area_of_effect + AREA_GROWTH * s.severity() * dt).max(0.0);
}
