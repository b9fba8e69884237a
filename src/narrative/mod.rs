//! Narrative layer: the event log and chronicle synthesis
//!
//! The simulation only ever appends to the log. Chronicles are derived by a
//! consumer reading the log through a cursor.

pub mod chronicle;
pub mod events;

pub use chronicle::{Chronicle, ChronicleEngine, ChronicleRule};
pub use events::{EventLog, EventType, NarrativeEvent};
