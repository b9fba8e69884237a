//! AI orchestration: alert level, threat cadence, and planner decisions

use ordered_float::OrderedFloat;
use serde_json::json;
use tracing::{debug, info};

use crate::ai::library::{ai_actions, observe, spawn_threat, AiTurn};
use crate::ai::planner::{plan, Goal, WorldState};
use crate::core::types::FactionId;
use crate::narrative::EventType;
use crate::world::World;

/// Base priority of the weaken-player goal; each alert level adds `WEAKEN_STEP`
const WEAKEN_BASE: f64 = 0.8;
const WEAKEN_STEP: f64 = 0.6;

#[derive(Debug, Clone, Default)]
pub struct AiManager {
    alert_level: u8,
    alert_score: u32,
    /// Accumulates dt toward the next generated threat
    threat_timer: f64,
    decisions: u64,
}

impl AiManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 0, 1 or 2
    pub fn alert_level(&self) -> u8 {
        self.alert_level
    }

    pub fn alert_score(&self) -> u32 {
        self.alert_score
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Alert score: player mitigations plus twice the player's territory
    pub fn compute_alert_score(world: &World) -> u32 {
        let regions = world
            .factions
            .player_id()
            .map(|p| world.regions.iter().filter(|r| r.is_owned_by(p)).count())
            .unwrap_or(0) as u32;
        world.threats.mitigated_by_player() + 2 * regions
    }

    pub fn level_for(score: u32, thresholds: [u32; 2]) -> u8 {
        if score >= thresholds[1] {
            2
        } else if score >= thresholds[0] {
            1
        } else {
            0
        }
    }

    /// Seconds between generated threats at the current alert level
    pub fn threat_interval(&self, world: &World) -> f64 {
        world.config.ai_threat_intervals[self.alert_level as usize]
    }

    /// Goals in descending priority. Ties keep declaration order.
    pub fn goals(&self) -> Vec<Goal> {
        let desire = |key: &str| WorldState::new().with(key, true);
        let mut goals = vec![
            Goal {
                name: "WeakenPlayer",
                priority: WEAKEN_BASE + WEAKEN_STEP * self.alert_level as f64,
                desired: desire("player_weakened"),
            },
            Goal {
                name: "ExpandTerritory",
                priority: 1.0,
                desired: desire("territory_expanded"),
            },
            Goal {
                name: "AdvanceResearch",
                priority: 0.9,
                desired: desire("research_advanced"),
            },
            Goal {
                name: "BuildAgentNetwork",
                priority: 0.7,
                desired: desire("agent_network"),
            },
            Goal {
                name: "OrbitalPresence",
                priority: 0.5,
                desired: desire("orbital_presence"),
            },
        ];
        goals.sort_by_key(|g| std::cmp::Reverse(OrderedFloat(g.priority)));
        goals
    }

    pub fn update(&mut self, dt: f64, world: &mut World) {
        self.update_alert(world);

        let factions = world.factions.ai_ids();

        self.threat_timer += dt;
        let interval = self.threat_interval(world);
        if self.threat_timer >= interval {
            self.threat_timer -= interval;
            for &faction in &factions {
                let mut turn = AiTurn {
                    world: &mut *world,
                    faction,
                };
                if spawn_threat(&mut turn) {
                    debug!("{} generated a threat", faction);
                }
            }
        }

        for faction in factions {
            let due = match world.factions.get_mut(faction) {
                Some(f) => {
                    f.decision_timer += dt;
                    if f.decision_timer >= world.config.ai_decision_interval {
                        f.decision_timer -= world.config.ai_decision_interval;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            };
            if due {
                self.decide(world, faction);
            }
        }
    }

    fn update_alert(&mut self, world: &mut World) {
        let score = Self::compute_alert_score(world);
        let level = Self::level_for(score, world.config.alert_thresholds);
        self.alert_score = score;
        if level != self.alert_level {
            info!("Alert level {} -> {} (score {})", self.alert_level, level, score);
            let now = world.time();
            world.log.record(
                now,
                EventType::AlertLevelChanged,
                json!({ "level": level, "previous": self.alert_level, "score": score }),
            );
            self.alert_level = level;
        }
    }

    /// First action of the first goal with a non-empty plan
    fn choose<'a>(
        &self,
        state: &WorldState,
    ) -> Option<(&'static str, &'static str, fn(&mut AiTurn<'a>) -> bool)> {
        let actions = ai_actions();
        for goal in self.goals() {
            let Some(steps) = plan(state, &actions, &goal) else {
                continue;
            };
            if let Some(action) = steps.first() {
                return Some((goal.name, action.name, action.run));
            }
        }
        None
    }

    fn decide(&mut self, world: &mut World, faction: FactionId) {
        let state = observe(world, faction);
        let Some((goal, action, run)) = self.choose(&state) else {
            debug!("{} has nothing to do", faction);
            return;
        };
        let success = run(&mut AiTurn {
            world: &mut *world,
            faction,
        });
        self.decisions += 1;
        debug!("{} pursued {} via {}: {}", faction, goal, action, success);
        let now = world.time();
        world.log.record(
            now,
            EventType::AiDecision,
            json!({
                "faction": faction.0,
                "goal": goal,
                "action": action,
                "success": success,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::region::Owner;

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_alert_levels() {
        assert_eq!(AiManager::level_for(0, [5, 15]), 0);
        assert_eq!(AiManager::level_for(5, [5, 15]), 1);
        assert_eq!(AiManager::level_for(14, [5, 15]), 1);
        assert_eq!(AiManager::level_for(15, [5, 15]), 2);
    }

    #[test]
    fn test_player_regions_raise_the_alert() {
        let mut world = world();
        let player = world.factions.player_id().unwrap();
        let ids: Vec<_> = world.regions.iter().take(3).map(|r| r.id).collect();
        for id in ids {
            world.regions.get_mut(id).unwrap().set_owner(Owner::Faction(player));
        }
        let mut ai = AiManager::new();
        ai.update(0.0, &mut world);
        assert_eq!(ai.alert_score(), 6);
        assert_eq!(ai.alert_level(), 1);
        assert_eq!(world.log.of_type(EventType::AlertLevelChanged).count(), 1);
    }

    #[test]
    fn test_weaken_goal_rises_with_alert() {
        let mut ai = AiManager::new();
        assert_eq!(ai.goals()[0].name, "ExpandTerritory");
        ai.alert_level = 2;
        assert_eq!(ai.goals()[0].name, "WeakenPlayer");
    }

    #[test]
    fn test_decisions_follow_the_timer() {
        let mut world = world();
        let mut ai = AiManager::new();
        let interval = world.config.ai_decision_interval;
        ai.update(interval * 0.5, &mut world);
        assert_eq!(ai.decisions(), 0);
        ai.update(interval * 0.5, &mut world);
        assert_eq!(ai.decisions(), world.factions.ai_ids().len() as u64);
        assert!(world.log.of_type(EventType::AiDecision).count() >= 1);
    }

    #[test]
    fn test_threat_cadence() {
        let mut world = world();
        let mut ai = AiManager::new();
        let interval = world.config.ai_threat_intervals[0];
        // stay below the decision interval so only the cadence spawns
        world.config.ai_decision_interval = f64::MAX;
        ai.update(interval - 1.0, &mut world);
        assert_eq!(world.threats.len(), 0);
        ai.update(1.0, &mut world);
        assert_eq!(world.threats.len(), world.factions.ai_ids().len());
    }
}
