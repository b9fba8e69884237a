//! Presentation-side copy of the world, rebuilt from updates

use std::collections::BTreeMap;

use crate::narrative::NarrativeEvent;
use crate::sync::delta::{EntityKey, EntitySnapshot, WorldHeader};
use crate::sync::worker::StateUpdate;

/// Applies each update as a whole. Entities absent from a delta are
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct PresentationMirror {
    pub header: WorldHeader,
    entities: BTreeMap<EntityKey, EntitySnapshot>,
    events: Vec<NarrativeEvent>,
    updates_applied: u64,
}

impl PresentationMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Snapshot(snapshot) => {
                self.entities = snapshot
                    .entities
                    .into_iter()
                    .map(|e| (e.key(), e))
                    .collect();
                self.events = snapshot.events;
                self.header = snapshot.header;
            }
            StateUpdate::Delta(delta) => {
                for entity in delta.new.into_iter().chain(delta.updated) {
                    self.entities.insert(entity.key(), entity);
                }
                for key in &delta.removed {
                    self.entities.remove(key);
                }
                self.events.extend(delta.events);
                self.header = delta.header;
            }
        }
        self.updates_applied += 1;
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntitySnapshot> {
        self.entities.get(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn events(&self) -> &[NarrativeEvent] {
        &self.events
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }
}
