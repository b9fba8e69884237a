//! AI factions: a single-ply planner over a small action library

pub mod library;
pub mod manager;
pub mod planner;

pub use library::AiTurn;
pub use manager::AiManager;
pub use planner::{plan, Fact, Goal, GoapAction, WorldState};
