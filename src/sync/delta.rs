//! Dirty-flag delta extraction
//!
//! A delta carries entities created since the last extraction, entities
//! whose dirty flag is set (excluding the new ones), and keys of entities
//! that disappeared. New and removed entities are found by comparing the
//! live key set against the keys known at the previous extraction, so no
//! manager has to remember what it deleted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::core::types::{SimTime, Tick};
use crate::faction::Faction;
use crate::narrative::NarrativeEvent;
use crate::region::{GlobalBuff, Region};
use crate::threat::Threat;
use crate::unit::{Satellite, Unit};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Threat,
    Region,
    Faction,
    Agent,
    Unit,
    Satellite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EntitySnapshot {
    Threat(Threat),
    Region(Region),
    Faction(Faction),
    Agent(Agent),
    Unit(Unit),
    Satellite(Satellite),
}

impl EntitySnapshot {
    pub fn key(&self) -> EntityKey {
        let (kind, id) = match self {
            EntitySnapshot::Threat(t) => (EntityKind::Threat, t.id.0),
            EntitySnapshot::Region(r) => (EntityKind::Region, r.id.0),
            EntitySnapshot::Faction(f) => (EntityKind::Faction, f.id.0),
            EntitySnapshot::Agent(a) => (EntityKind::Agent, a.id.0),
            EntitySnapshot::Unit(u) => (EntityKind::Unit, u.id.0),
            EntitySnapshot::Satellite(s) => (EntityKind::Satellite, s.id.0),
        };
        EntityKey { kind, id }
    }
}

/// World-level scalars that travel with every update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldHeader {
    pub tick: Tick,
    pub time: SimTime,
    pub alert_level: u8,
    pub global_buffs: Vec<GlobalBuff>,
    pub plume_particles: usize,
}

impl WorldHeader {
    fn of(world: &World) -> Self {
        Self {
            tick: world.tick_count(),
            time: world.time(),
            alert_level: world.ai.alert_level(),
            global_buffs: world.global_buffs.iter().copied().collect(),
            plume_particles: world.threats.plume().len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub header: WorldHeader,
    pub entities: Vec<EntitySnapshot>,
    pub events: Vec<NarrativeEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldDelta {
    pub header: WorldHeader,
    pub new: Vec<EntitySnapshot>,
    pub updated: Vec<EntitySnapshot>,
    pub removed: Vec<EntityKey>,
    pub events: Vec<NarrativeEvent>,
}

impl WorldDelta {
    /// No entity or event changes
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.removed.is_empty() && self.events.is_empty()
    }
}

/// Shared shape of every synced entity
trait Tracked {
    const KIND: EntityKind;
    fn raw_id(&self) -> u32;
    fn dirty(&self) -> bool;
    fn clear(&mut self);
    fn snapshot(&self) -> EntitySnapshot;
}

macro_rules! tracked {
    ($ty:ty, $kind:ident) => {
        impl Tracked for $ty {
            const KIND: EntityKind = EntityKind::$kind;
            fn raw_id(&self) -> u32 {
                self.id.0
            }
            fn dirty(&self) -> bool {
                self.is_dirty()
            }
            fn clear(&mut self) {
                self.clear_dirty()
            }
            fn snapshot(&self) -> EntitySnapshot {
                EntitySnapshot::$kind(self.clone())
            }
        }
    };
}

tracked!(Threat, Threat);
tracked!(Region, Region);
tracked!(Faction, Faction);
tracked!(Agent, Agent);
tracked!(Unit, Unit);
tracked!(Satellite, Satellite);

/// Remembers what the presentation side already knows
#[derive(Debug, Clone, Default)]
pub struct DeltaTracker {
    known: BTreeSet<EntityKey>,
    event_cursor: u64,
}

/// One pass over a collection
struct Scan<'a> {
    known: &'a BTreeSet<EntityKey>,
    live: BTreeSet<EntityKey>,
    new: Vec<EntitySnapshot>,
    updated: Vec<EntitySnapshot>,
    /// Treat everything as new (full snapshot)
    full: bool,
}

impl Scan<'_> {
    fn visit<'e, T: Tracked + 'e>(&mut self, items: impl Iterator<Item = &'e mut T>) {
        for item in items {
            let key = EntityKey {
                kind: T::KIND,
                id: item.raw_id(),
            };
            self.live.insert(key);
            if self.full || !self.known.contains(&key) {
                self.new.push(item.snapshot());
            } else if item.dirty() {
                self.updated.push(item.snapshot());
            }
            item.clear();
        }
    }

    fn run(mut self, world: &mut World) -> Self {
        self.visit(world.factions.iter_mut());
        self.visit(world.regions.iter_mut());
        self.visit(world.threats.iter_mut());
        self.visit(world.agents.iter_mut());
        self.visit(world.units.units_mut());
        self.visit(world.units.satellites_mut());
        self
    }
}

impl DeltaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything, as of now. Resets the known set and clears dirty flags.
    pub fn full_snapshot(&mut self, world: &mut World) -> WorldSnapshot {
        let scan = Scan {
            known: &self.known,
            live: BTreeSet::new(),
            new: Vec::new(),
            updated: Vec::new(),
            full: true,
        }
        .run(world);
        let live = scan.live;
        let entities = scan.new;
        self.known = live;
        self.event_cursor = world.log.last_id();
        WorldSnapshot {
            header: WorldHeader::of(world),
            entities,
            events: world.log.iter().cloned().collect(),
        }
    }

    /// Changes since the previous extraction
    pub fn extract(&mut self, world: &mut World) -> WorldDelta {
        let scan = Scan {
            known: &self.known,
            live: BTreeSet::new(),
            new: Vec::new(),
            updated: Vec::new(),
            full: false,
        }
        .run(world);
        let removed = self.known.difference(&scan.live).copied().collect();
        let (live, new, updated) = (scan.live, scan.new, scan.updated);
        self.known = live;

        let events = world.log.since(self.event_cursor).to_vec();
        self.event_cursor = world.log.last_id();
        WorldDelta {
            header: WorldHeader::of(world),
            new,
            updated,
            removed,
            events,
        }
    }

    pub fn known(&self) -> usize {
        self.known.len()
    }
}
