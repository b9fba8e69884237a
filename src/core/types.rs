//! Core type definitions used throughout the codebase

use derive_more::Display;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Unique identifier for threats. Never reused after a threat is removed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "threat-{}", _0)]
pub struct ThreatId(pub u32);

/// Unique identifier for regions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "region-{}", _0)]
pub struct RegionId(pub u32);

/// Unique identifier for factions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "faction-{}", _0)]
pub struct FactionId(pub u32);

/// Unique identifier for field agents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "agent-{}", _0)]
pub struct AgentId(pub u32);

/// Unique identifier for ground/air units and satellites (shared id space)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "unit-{}", _0)]
pub struct UnitId(pub u32);

/// Simulation time in seconds since `start()`
pub type SimTime = f64;

/// Tick counter (one per `World::tick` call)
pub type Tick = u64;

/// Monotone id allocator shared by every entity collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating after the given id (used after loading static data)
    pub fn starting_after(last: u32) -> Self {
        Self { next: last + 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Clamp a normalized scalar to [0, 1]. NaN collapses to 0.
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Convert latitude/longitude in degrees to a point on a sphere of `radius`.
///
/// Y is the polar axis; longitude 0 lies on +Z.
pub fn lat_lon_to_position(lat_deg: f64, lon_deg: f64, radius: f64) -> DVec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    DVec3::new(
        radius * lat.cos() * lon.sin(),
        radius * lat.sin(),
        radius * lat.cos() * lon.cos(),
    )
}

/// Inverse of [`lat_lon_to_position`], returns (lat, lon) in degrees.
pub fn position_to_lat_lon(position: DVec3) -> (f64, f64) {
    let r = position.length();
    if r < 1e-9 {
        return (0.0, 0.0);
    }
    let lat = (position.y / r).clamp(-1.0, 1.0).asin().to_degrees();
    let lon = position.x.atan2(position.z).to_degrees();
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(ThreatId(7).to_string(), "threat-7");
        assert_eq!(RegionId(2).to_string(), "region-2");
        assert_eq!(FactionId(1).to_string(), "faction-1");
    }

    #[test]
    fn test_id_allocator_is_monotone() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);

        let mut after = IdAllocator::starting_after(10);
        assert_eq!(after.next_id(), 11);
    }

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(f64::NAN), 0.0);
    }

    #[test]
    fn test_lat_lon_round_trip() {
        let pos = lat_lon_to_position(40.0, -74.0, 100.0);
        assert!((pos.length() - 100.0).abs() < 1e-9);
        let (lat, lon) = position_to_lat_lon(pos);
        assert!((lat - 40.0).abs() < 1e-9);
        assert!((lon + 74.0).abs() < 1e-9);
    }
}
