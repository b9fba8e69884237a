//! Generic interpreter for declarative actions

use serde_json::json;
use tracing::{debug, error};

use crate::actions::catalog::{ActionDescriptor, TargetType};
use crate::actions::effect::{EffectOp, EffectTarget, ResolvedTarget};
use crate::actions::predicate::{Collections, Scope};
use crate::actions::property::{PropertySource, Value};
use crate::core::types::{FactionId, RegionId, ThreatId};
use crate::narrative::EventType;
use crate::region::GlobalBuffType;
use crate::world::World;

/// Who is acting and on what
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext {
    pub faction: FactionId,
    pub threat: Option<ThreatId>,
    pub region: Option<RegionId>,
}

impl ActionContext {
    pub fn new(faction: FactionId) -> Self {
        Self {
            faction,
            threat: None,
            region: None,
        }
    }

    pub fn with_threat(mut self, threat: ThreatId) -> Self {
        self.threat = Some(threat);
        self
    }

    pub fn with_region(mut self, region: RegionId) -> Self {
        self.region = Some(region);
        self
    }
}

/// World-level properties as seen by one faction
pub struct WorldView<'a> {
    pub world: &'a World,
    pub faction: FactionId,
}

impl PropertySource for WorldView<'_> {
    fn property(&self, path: &str) -> Option<Value> {
        let world = self.world;
        if let Some(rest) = path.strip_prefix("global_buff.") {
            let kind: GlobalBuffType = rest.parse().ok()?;
            return Some(Value::Bool(world.global_buffs.is_active(kind)));
        }
        let faction = world.factions.get(self.faction);
        match path {
            "faction.funds" => faction.map(|f| Value::Number(f.resources().funds)),
            "faction.intel" => faction.map(|f| Value::Number(f.resources().intel)),
            "faction.tech" => faction.map(|f| Value::Number(f.resources().tech)),
            "faction.research" => faction.map(|f| Value::Number(f.research.progress())),
            "faction.satellites" => Some(Value::Number(world.units.satellite_count(self.faction) as f64)),
            "faction.agents" => Some(Value::Number(world.agents.count_for(self.faction) as f64)),
            "faction.regions" => Some(Value::Number(
                world.regions.iter().filter(|r| r.is_owned_by(self.faction)).count() as f64,
            )),
            "alert_level" => Some(Value::Number(world.ai.alert_level() as f64)),
            "threat_count" => Some(Value::Number(world.threats.len() as f64)),
            "time" => Some(Value::Number(world.time())),
            _ => None,
        }
    }

    fn property_names() -> &'static [&'static str] {
        &[
            "faction.funds",
            "faction.intel",
            "faction.tech",
            "faction.research",
            "faction.satellites",
            "faction.agents",
            "faction.regions",
            "global_buff",
            "alert_level",
            "threat_count",
            "time",
        ]
    }
}

impl Collections for WorldView<'_> {
    fn visit(&self, collection: &str, f: &mut dyn FnMut(&dyn PropertySource)) -> bool {
        let world = self.world;
        match collection {
            "threats" => world.threats.iter().for_each(|t| f(t)),
            "regions" => world.regions.iter().for_each(|r| f(r)),
            "agents" => world.agents.iter().for_each(|a| f(a)),
            "units" => world.units.units().iter().for_each(|u| f(u)),
            "satellites" => world.units.satellites().iter().for_each(|s| f(s)),
            _ => return false,
        }
        true
    }
}

/// Affordability plus every availability predicate, short-circuiting
pub fn is_action_available(world: &World, action: &ActionDescriptor, ctx: &ActionContext) -> bool {
    let Some(faction) = world.factions.get(ctx.faction) else {
        return false;
    };
    if !faction.can_afford(&action.cost) {
        return false;
    }

    let threat = ctx.threat.and_then(|id| world.threats.get(id));
    let region = ctx
        .region
        .and_then(|id| world.regions.get(id))
        .or_else(|| threat.and_then(|t| world.regions.region_at(t.position)));
    match action.target {
        TargetType::Threat if threat.is_none() => return false,
        TargetType::Region if ctx.region.is_none() || region.is_none() => return false,
        _ => {}
    }

    let view = WorldView {
        world,
        faction: ctx.faction,
    };
    let scope = Scope {
        faction: ctx.faction,
        threat,
        region,
        world: &view,
        collections: &view,
    };
    action.availability.iter().all(|p| p.evaluate(&scope))
}

/// Resolve every effect against the context before anything is spent
fn bind_effects(world: &World, action: &ActionDescriptor, ctx: &ActionContext) -> Result<Vec<EffectOp>, String> {
    let selected_threat = || {
        ctx.threat
            .filter(|&id| world.threats.get(id).is_some())
            .map(ResolvedTarget::Threat)
            .ok_or_else(|| "no live threat selected".to_string())
    };
    let selected_region = || {
        ctx.region
            .filter(|&id| world.regions.get(id).is_some())
            .map(ResolvedTarget::Region)
            .ok_or_else(|| "no region selected".to_string())
    };

    action
        .effects
        .iter()
        .map(|effect| {
            let target = match &effect.target {
                EffectTarget::SelectedThreat => selected_threat()?,
                EffectTarget::ActionTarget => match action.target {
                    TargetType::Threat => selected_threat()?,
                    TargetType::Region => selected_region()?,
                    TargetType::None => return Err("action has no target".to_string()),
                },
                EffectTarget::World => ResolvedTarget::World,
                EffectTarget::Unknown(name) => {
                    return Err(format!("unknown effect target '{}'", name));
                }
            };
            effect.bind(target, ctx.faction)
        })
        .collect()
}

/// Re-validate, spend, then apply effects in order.
///
/// Returns true iff the action was available, every effect bound and
/// checked against the live world, the cost was paid and every effect
/// applied. Nothing is spent unless binding and checking both succeed.
pub fn execute_action(world: &mut World, action: &ActionDescriptor, ctx: &ActionContext) -> bool {
    if !is_action_available(world, action, ctx) {
        debug!("Action {} unavailable for {}", action.id, ctx.faction);
        return false;
    }

    let ops = match bind_effects(world, action, ctx) {
        Ok(ops) => ops,
        Err(e) => {
            error!("Action {} aborted: {}", action.id, e);
            return false;
        }
    };
    apply_bound(world, action, ctx, &ops)
}

/// Check, spend and apply already bound effects.
///
/// `ActionExecuted` is only recorded when every effect applied.
fn apply_bound(world: &mut World, action: &ActionDescriptor, ctx: &ActionContext, ops: &[EffectOp]) -> bool {
    if let Some(e) = ops.iter().find_map(|op| world.check_effect(op).err()) {
        error!("Action {} aborted: {}", action.id, e);
        return false;
    }

    let Some(faction) = world.factions.get_mut(ctx.faction) else {
        return false;
    };
    if !faction.spend(&action.cost) {
        return false;
    }

    let mut failed = false;
    for op in ops {
        if let Err(e) = world.apply_effect(op) {
            error!("Action {} effect failed after spend: {}", action.id, e);
            failed = true;
        }
    }
    if failed {
        return false;
    }

    let now = world.time();
    world.log.record(
        now,
        EventType::ActionExecuted,
        json!({
            "action": action.id,
            "faction": ctx.faction.0,
            "threat": ctx.threat.map(|t| t.0),
            "region": ctx.region.map(|r| r.0),
        }),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::catalog::ActionCatalog;
    use crate::core::config::SimulationConfig;
    use crate::faction::Resources;
    use crate::region::BuffType;
    use crate::threat::{ThreatDomain, ThreatSpawn, ThreatType};

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    fn player(world: &World) -> FactionId {
        world.factions.player_id().unwrap()
    }

    #[test]
    fn test_unaffordable_action_changes_nothing() {
        let mut world = world();
        let me = player(&world);
        let catalog = ActionCatalog::from_toml_str(
            r#"
            [[action]]
            id = "EXPENSIVE"
            name = "Expensive"
            cost = { funds = 1000 }
            [[action.effects]]
            target = "world"
            method = "grant_resources"
            params = ["playerFaction", 0, 50, 0]
            "#,
        )
        .unwrap();
        let action = catalog.get("EXPENSIVE").unwrap();
        let faction = world.factions.get_mut(me).unwrap();
        let current = *faction.resources();
        faction.spend(&Resources::funds(current.funds - 500.0));

        let ctx = ActionContext::new(me);
        let events = world.log.len();
        assert!(!execute_action(&mut world, action, &ctx));
        let after = world.factions.get(me).unwrap().resources();
        assert_eq!(after.funds, 500.0);
        assert_eq!(after.intel, current.intel);
        assert_eq!(world.log.len(), events);
    }

    #[test]
    fn test_availability_is_idempotent() {
        let world = world();
        let me = player(&world);
        let action = world.actions.get("RECRUIT_AGENT").unwrap();
        let region = world.regions.iter().next().unwrap().id;
        let ctx = ActionContext::new(me).with_region(region);
        let first = is_action_available(&world, action, &ctx);
        assert_eq!(first, is_action_available(&world, action, &ctx));
    }

    #[test]
    fn test_quarantine_applies_once() {
        let mut world = world();
        let me = player(&world);
        let region = world.regions.iter().next().unwrap().id;
        let ctx = ActionContext::new(me).with_region(region);

        assert!(world.execute_action("QUARANTINE", &ctx));
        assert!(world.regions.get(region).unwrap().has_buff(BuffType::Quarantine));
        // availability requires no active quarantine
        let funds = world.factions.get(me).unwrap().resources().funds;
        assert!(!world.execute_action("QUARANTINE", &ctx));
        assert_eq!(world.factions.get(me).unwrap().resources().funds, funds);
    }

    #[test]
    fn test_missing_target_aborts_before_spend() {
        let mut world = world();
        let me = player(&world);
        let action = world.actions.get("INVESTIGATE").unwrap().clone();
        let before = *world.factions.get(me).unwrap().resources();
        let ctx = ActionContext::new(me).with_threat(ThreatId(999));
        assert!(!execute_action(&mut world, &action, &ctx));
        assert_eq!(*world.factions.get(me).unwrap().resources(), before);
    }

    #[test]
    fn test_stale_effect_reference_aborts_before_spend() {
        let mut world = world();
        let me = player(&world);
        let action = world.actions.get("QUARANTINE").unwrap().clone();
        let region = world.regions.iter().next().unwrap().id;
        let ops = vec![
            EffectOp::AdjustStability { region, delta: 0.1 },
            EffectOp::AdjustEconomy {
                region: RegionId(999),
                delta: 0.1,
            },
        ];
        let before = *world.factions.get(me).unwrap().resources();
        let stability = world.regions.get(region).unwrap().stability();
        let ctx = ActionContext::new(me).with_region(region);

        assert!(!apply_bound(&mut world, &action, &ctx, &ops));
        assert_eq!(*world.factions.get(me).unwrap().resources(), before);
        assert_eq!(world.regions.get(region).unwrap().stability(), stability);
        assert_eq!(world.log.of_type(EventType::ActionExecuted).count(), 0);
    }

    #[test]
    fn test_investigate_then_mitigate() {
        let mut world = world();
        let me = player(&world);
        let pos = world.regions.iter().next().unwrap().position;
        let id = world.spawn_threat(ThreatSpawn::new(ThreatDomain::Cyber, ThreatType::Real, 0.4, pos));
        let ctx = ActionContext::new(me).with_threat(id);

        assert!(!world.is_action_available("MITIGATE", &ctx));
        while !world.threats.get(id).unwrap().is_investigated() {
            assert!(world.execute_action("INVESTIGATE", &ctx));
        }
        assert!(world.execute_action("MITIGATE", &ctx));
        assert!(world.threats.get(id).unwrap().is_mitigated());
        assert!(world.threats.get(id).unwrap().was_mitigated_by_player());
    }

    #[test]
    fn test_world_view_paths() {
        let world = world();
        let me = player(&world);
        let view = WorldView { world: &world, faction: me };
        assert_eq!(view.property("faction.satellites"), Some(Value::Number(0.0)));
        assert_eq!(view.property("global_buff.SATELLITE_DISRUPTION"), Some(Value::Bool(false)));
        assert_eq!(view.property("alert_level"), Some(Value::Number(0.0)));
        assert!(view.property("faction.karma").is_none());
    }
}
