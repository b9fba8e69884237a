//! Factions - the player and AI organisations competing over the map
//!
//! A faction owns a resource ledger. Spending is all-or-nothing: either the
//! whole cost vector is covered and deducted, or nothing changes.

pub mod manager;
pub mod resources;

use serde::{Deserialize, Serialize};

use crate::core::types::{clamp01, FactionId};

pub use manager::{FactionManager, IncomeSources};
pub use resources::Resources;

/// Singularity research progress thresholds
pub const SINGULARITY_MILESTONES: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactionKind {
    Player,
    Ai,
}

/// Research track toward the "singularity" milestones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    progress: f64,
    milestones_reached: usize,
}

impl ResearchState {
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn milestones_reached(&self) -> usize {
        self.milestones_reached
    }

    pub fn is_complete(&self) -> bool {
        self.milestones_reached == SINGULARITY_MILESTONES.len()
    }

    /// Add progress, returns how many new milestones were crossed
    pub fn advance(&mut self, amount: f64) -> usize {
        self.progress = clamp01(self.progress + amount.max(0.0));
        let reached = SINGULARITY_MILESTONES
            .iter()
            .filter(|&&m| self.progress >= m)
            .count();
        let crossed = reached.saturating_sub(self.milestones_reached);
        self.milestones_reached = reached;
        crossed
    }
}

/// A competing organisation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub kind: FactionKind,
    resources: Resources,
    /// Raises the risk of enemy agent missions in this faction's regions
    pub counter_intel: f64,
    /// Accumulates dt between AI decisions
    pub decision_timer: f64,
    pub research: ResearchState,
    #[serde(skip)]
    dirty: bool,
}

impl Faction {
    pub fn new(id: FactionId, name: impl Into<String>, kind: FactionKind, resources: Resources) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            resources: clamp_resources(resources),
            counter_intel: 0.1,
            decision_timer: 0.0,
            research: ResearchState::default(),
            dirty: true,
        }
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn is_ai(&self) -> bool {
        self.kind == FactionKind::Ai
    }

    pub fn can_afford(&self, cost: &Resources) -> bool {
        self.resources.covers(cost)
    }

    /// Deduct `cost` if affordable. Returns false and changes nothing otherwise.
    pub fn spend(&mut self, cost: &Resources) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.resources.funds -= cost.funds;
        self.resources.intel -= cost.intel;
        self.resources.tech -= cost.tech;
        self.dirty = true;
        true
    }

    /// Add income. Negative components are ignored.
    pub fn earn(&mut self, income: &Resources) {
        if income.is_zero() {
            return;
        }
        self.resources.funds += income.funds.max(0.0);
        self.resources.intel += income.intel.max(0.0);
        self.resources.tech += income.tech.max(0.0);
        self.dirty = true;
    }

    /// Remove up to `amount` funds (ransomware, sabotage). Returns what was taken.
    pub fn drain_funds(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.resources.funds);
        if taken > 0.0 {
            self.resources.funds -= taken;
            self.dirty = true;
        }
        taken
    }

    pub fn advance_research(&mut self, amount: f64) -> usize {
        self.dirty = true;
        self.research.advance(amount)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

fn clamp_resources(r: Resources) -> Resources {
    Resources::new(r.funds.max(0.0), r.intel.max(0.0), r.tech.max(0.0))
}
