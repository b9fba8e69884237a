//! Global Watch - deterministic world simulation for a threat-response strategy game

pub mod actions;
pub mod agent;
pub mod ai;
pub mod core;
pub mod data;
pub mod faction;
pub mod narrative;
pub mod region;
pub mod sync;
pub mod threat;
pub mod unit;
pub mod world;
