//! Cross-domain threat interactions
//!
//! Sparse table of pairwise transfer rules between co-located threats. The
//! key is an ordered domain pair but lookup accepts either orientation; the
//! effect always receives the threats in the order they were registered.

use ahash::{AHashMap, AHashSet};
use serde_json::json;

use crate::core::types::{RegionId, ThreatId};
use crate::narrative::EventType;
use crate::threat::properties::DomainProperties;
use crate::threat::{Threat, ThreatDomain};

pub type InteractionFn = fn(&mut Threat, &mut Threat, f64);

#[derive(Clone, Copy)]
pub struct Interaction {
    pub effect: InteractionFn,
    /// Narrative tag logged the first time the pair interacts
    pub event: Option<&'static str>,
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction").field("event", &self.event).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionMatrix {
    entries: AHashMap<(ThreatDomain, ThreatDomain), Interaction>,
}

impl InteractionMatrix {
    /// An empty matrix
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set of interactions
    pub fn with_defaults() -> Self {
        let mut m = Self::new();
        m.register(ThreatDomain::Cyber, ThreatDomain::Rad, cyber_rad, Some("CYBER_RAD_MELTDOWN_RISK"));
        m.register(ThreatDomain::Quantum, ThreatDomain::Robot, quantum_robot, Some("QUANTUM_AI_ACCELERATION"));
        m.register(ThreatDomain::Env, ThreatDomain::Rad, env_rad, Some("TOXIC_FALLOUT"));
        m.register(ThreatDomain::Bio, ThreatDomain::Env, bio_env, Some("ECOLOGICAL_OUTBREAK"));
        m.register(ThreatDomain::Info, ThreatDomain::Econ, info_econ, Some("MARKET_PANIC"));
        m.register(ThreatDomain::Cyber, ThreatDomain::Econ, cyber_econ, Some("FINANCIAL_BREACH"));
        m.register(ThreatDomain::Cyber, ThreatDomain::Info, cyber_info, None);
        m.register(ThreatDomain::Space, ThreatDomain::Cyber, space_cyber, Some("SATELLITE_HIJACK"));
        m
    }

    /// Add or replace the rule for a domain pair
    pub fn register(&mut self, a: ThreatDomain, b: ThreatDomain, effect: InteractionFn, event: Option<&'static str>) {
        // Keep a single entry per unordered pair
        self.entries.remove(&(b, a));
        self.entries.insert((a, b), Interaction { effect, event });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rule for a pair in either orientation. The flag is true when the
    /// arguments must be swapped to match the registered order.
    pub fn lookup(&self, a: ThreatDomain, b: ThreatDomain) -> Option<(&Interaction, bool)> {
        if let Some(i) = self.entries.get(&(a, b)) {
            return Some((i, false));
        }
        self.entries.get(&(b, a)).map(|i| (i, true))
    }

    /// Apply the rule for `x` and `y` if one exists. Returns the rule applied.
    pub fn apply(&self, x: &mut Threat, y: &mut Threat, dt: f64) -> Option<&Interaction> {
        let (interaction, swap) = self.lookup(x.domain, y.domain)?;
        if swap {
            (interaction.effect)(y, x, dt);
        } else {
            (interaction.effect)(x, y, dt);
        }
        Some(interaction)
    }

    /// Run every co-located unordered pair once.
    ///
    /// `membership[i]` is the hosting region of `threats[i]`. `logged` holds
    /// pairs whose event was already written and is updated in place.
    pub fn sweep(
        &self,
        threats: &mut [Threat],
        membership: &[Option<RegionId>],
        dt: f64,
        logged: &mut AHashSet<(ThreatId, ThreatId)>,
    ) -> Vec<(EventType, serde_json::Value)> {
        let mut events = Vec::new();
        if self.entries.is_empty() {
            return events;
        }

        let mut by_region: AHashMap<RegionId, Vec<usize>> = AHashMap::new();
        for (idx, region) in membership.iter().enumerate() {
            if let Some(region) = region {
                by_region.entry(*region).or_default().push(idx);
            }
        }
        let mut groups: Vec<(RegionId, Vec<usize>)> = by_region.into_iter().collect();
        groups.sort_by_key(|(region, _)| *region);

        for (region, indices) in groups {
            for (n, &i) in indices.iter().enumerate() {
                for &j in &indices[n + 1..] {
                    // indices are ascending, so i < j
                    let (head, tail) = threats.split_at_mut(j);
                    let (a, b) = (&mut head[i], &mut tail[0]);
                    if a.is_mitigated() || b.is_mitigated() {
                        continue;
                    }
                    let Some(interaction) = self.apply(a, b, dt) else {
                        continue;
                    };
                    if let Some(tag) = interaction.event {
                        if logged.insert((a.id, b.id)) {
                            events.push((
                                EventType::CrossDomainInteraction,
                                json!({
                                    "interaction": tag,
                                    "threats": [a.id.0, b.id.0],
                                    "region": region.0,
                                }),
                            ));
                        }
                    }
                }
            }
        }
        events
    }
}

// === Transfer functions ===
// Every rule reads both sides before writing either.

fn cyber_rad(cyber: &mut Threat, rad: &mut Threat, dt: f64) {
    let (c, r) = (cyber.severity(), rad.severity());
    rad.set_severity(r + 0.001 * c * dt);
    cyber.set_severity(c + 0.0005 * r * dt);
}

fn quantum_robot(quantum: &mut Threat, robot: &mut Threat, dt: f64) {
    let entanglement = match quantum.properties() {
        DomainProperties::Quantum(q) => q.entanglement,
        _ => return,
    };
    if entanglement <= 0.5 {
        return;
    }
    if let DomainProperties::Robotic(r) = robot.properties_mut() {
        r.adaptation_rate = (r.adaptation_rate + 0.01 * entanglement * dt).min(1.0);
        r.intelligence = (r.intelligence + 0.005 * entanglement * dt).min(1.0);
    }
}

fn env_rad(env: &mut Threat, rad: &mut Threat, dt: f64) {
    let e = env.severity();
    rad.adjust_severity(0.002 * e * dt);
    rad.adjust_spread_rate(0.001 * e * dt);
}

fn bio_env(bio: &mut Threat, env: &mut Threat, dt: f64) {
    let e = env.severity();
    if let DomainProperties::Biological(b) = bio.properties_mut() {
        b.infectivity = (b.infectivity + 0.002 * e * dt).min(1.0);
    }
    bio.adjust_severity(0.001 * e * dt);
}

fn info_econ(info: &mut Threat, econ: &mut Threat, dt: f64) {
    let (spread, e) = (info.spread_rate(), econ.severity());
    if let DomainProperties::Economic(p) = econ.properties_mut() {
        p.contagion_risk = (p.contagion_risk + 0.002 * spread * dt).min(1.0);
        p.market_volatility = (p.market_volatility + 0.001 * spread * dt).min(1.0);
    }
    if let DomainProperties::Informational(p) = info.properties_mut() {
        p.polarization = (p.polarization + 0.001 * e * dt).min(1.0);
    }
}

fn cyber_econ(cyber: &mut Threat, econ: &mut Threat, dt: f64) {
    let c = cyber.severity();
    econ.adjust_severity(0.001 * c * dt);
    if let DomainProperties::Economic(p) = econ.properties_mut() {
        p.market_volatility = (p.market_volatility + 0.001 * c * dt).min(1.0);
    }
}

fn cyber_info(cyber: &mut Threat, info: &mut Threat, dt: f64) {
    let c = cyber.severity();
    info.adjust_spread_rate(0.001 * c * dt);
    if let DomainProperties::Informational(p) = info.properties_mut() {
        p.credibility = (p.credibility + 0.002 * c * dt).min(1.0);
    }
}

fn space_cyber(space: &mut Threat, cyber: &mut Threat, dt: f64) {
    let (s, c) = (space.severity(), cyber.severity());
    cyber.set_severity(c + 0.001 * s * dt);
    if let DomainProperties::Space(p) = space.properties_mut() {
        p.debris_density = (p.debris_density + 0.0005 * c * dt).min(1.0);
    }
}
