//! Simulation/presentation boundary: deltas, snapshots and the worker thread

pub mod clock;
pub mod delta;
pub mod mirror;
pub mod worker;

pub use clock::FixedStep;
pub use delta::{DeltaTracker, EntityKey, EntityKind, EntitySnapshot, WorldDelta, WorldHeader, WorldSnapshot};
pub use mirror::PresentationMirror;
pub use worker::{SimulationWorker, StateUpdate, WorkerCommand};
