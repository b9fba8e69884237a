//! Single-ply goal-oriented action selection
//!
//! `plan` looks for one action whose effects satisfy the goal and whose
//! preconditions hold in the current state. It does not chain actions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A flat world-state value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fact {
    Bool(bool),
    Int(i64),
}

impl From<bool> for Fact {
    fn from(b: bool) -> Self {
        Fact::Bool(b)
    }
}

impl From<i64> for Fact {
    fn from(n: i64) -> Self {
        Fact::Int(n)
    }
}

/// Flat key -> fact snapshot. Ordered so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState(BTreeMap<String, Fact>);

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, fact: impl Into<Fact>) {
        self.0.insert(key.into(), fact.into());
    }

    pub fn with(mut self, key: impl Into<String>, fact: impl Into<Fact>) -> Self {
        self.set(key, fact);
        self
    }

    pub fn get(&self, key: &str) -> Option<Fact> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Fact)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every entry of `required` is present here with the same value
    pub fn satisfies(&self, required: &WorldState) -> bool {
        required.iter().all(|(k, v)| self.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub name: &'static str,
    pub priority: f64,
    pub desired: WorldState,
}

/// An action the planner can pick. `run` re-checks affordability itself.
pub struct GoapAction<C> {
    pub name: &'static str,
    pub cost: f64,
    pub preconditions: WorldState,
    pub effects: WorldState,
    pub run: fn(&mut C) -> bool,
}

impl<C> std::fmt::Debug for GoapAction<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoapAction")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("preconditions", &self.preconditions)
            .field("effects", &self.effects)
            .finish()
    }
}

/// Empty plan if the goal already holds, a one-action plan for the first
/// action (in list order) that achieves the goal from `state`, else None.
pub fn plan<'a, C>(
    state: &WorldState,
    actions: &'a [GoapAction<C>],
    goal: &Goal,
) -> Option<Vec<&'a GoapAction<C>>> {
    if state.satisfies(&goal.desired) {
        return Some(Vec::new());
    }
    actions
        .iter()
        .filter(|a| a.effects.satisfies(&goal.desired))
        .find(|a| state.satisfies(&a.preconditions))
        .map(|a| vec![a])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut u32) -> bool {
        true
    }

    fn action(name: &'static str, pre: WorldState, eff: WorldState) -> GoapAction<u32> {
        GoapAction {
            name,
            cost: 1.0,
            preconditions: pre,
            effects: eff,
            run: noop,
        }
    }

    fn goal(desired: WorldState) -> Goal {
        Goal {
            name: "test",
            priority: 1.0,
            desired,
        }
    }

    #[test]
    fn test_satisfied_goal_gives_empty_plan() {
        let state = WorldState::new().with("player_weakened", true);
        let g = goal(WorldState::new().with("player_weakened", true));
        let actions: Vec<GoapAction<u32>> = vec![];
        assert_eq!(plan(&state, &actions, &g).map(|p| p.len()), Some(0));
    }

    #[test]
    fn test_no_matching_effects_gives_none() {
        let state = WorldState::new();
        let g = goal(WorldState::new().with("has_satellite", true));
        let actions = vec![action(
            "recruit",
            WorldState::new(),
            WorldState::new().with("has_agent", true),
        )];
        assert!(plan(&state, &actions, &g).is_none());
    }

    #[test]
    fn test_first_applicable_action_wins() {
        let state = WorldState::new().with("can_afford", true);
        let g = goal(WorldState::new().with("player_weakened", true));
        let actions = vec![
            action(
                "blocked",
                WorldState::new().with("can_afford", false),
                WorldState::new().with("player_weakened", true),
            ),
            action(
                "spawn",
                WorldState::new().with("can_afford", true),
                WorldState::new().with("player_weakened", true),
            ),
            action(
                "sabotage",
                WorldState::new(),
                WorldState::new().with("player_weakened", true),
            ),
        ];
        let p = plan(&state, &actions, &g).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p[0].name, "spawn");
    }

    #[test]
    fn test_preconditions_are_not_chained() {
        // "buy" would unlock "launch", but the planner never chains
        let state = WorldState::new().with("funded", false);
        let g = goal(WorldState::new().with("has_satellite", true));
        let actions = vec![
            action(
                "buy",
                WorldState::new(),
                WorldState::new().with("funded", true),
            ),
            action(
                "launch",
                WorldState::new().with("funded", true),
                WorldState::new().with("has_satellite", true),
            ),
        ];
        assert!(plan(&state, &actions, &g).is_none());
    }

    #[test]
    fn test_int_facts_compare_exactly() {
        let state = WorldState::new().with("alert", 2i64);
        assert!(state.satisfies(&WorldState::new().with("alert", 2i64)));
        assert!(!state.satisfies(&WorldState::new().with("alert", 1i64)));
        assert!(!state.satisfies(&WorldState::new().with("missing", true)));
    }
}
