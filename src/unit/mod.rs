//! Ground/air units and satellites

pub mod manager;
pub mod physics;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{FactionId, RegionId, UnitId};

pub use manager::UnitManager;
pub use physics::{great_circle_path, MovementType, PhysicsState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    GroundTeam,
    ReconDrone,
    SensorStation,
}

impl UnitKind {
    pub fn movement(&self) -> MovementType {
        match self {
            Self::GroundTeam => MovementType::Ground,
            Self::ReconDrone => MovementType::Air,
            Self::SensorStation => MovementType::Static,
        }
    }

    /// (max_speed, max_force) in game-space units
    pub fn limits(&self) -> (f64, f64) {
        match self {
            Self::GroundTeam => (1.5, 3.0),
            Self::ReconDrone => (4.0, 6.0),
            Self::SensorStation => (0.0, 0.0),
        }
    }
}

impl std::str::FromStr for UnitKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GROUND_TEAM" => Ok(Self::GroundTeam),
            "RECON_DRONE" => Ok(Self::ReconDrone),
            "SENSOR_STATION" => Ok(Self::SensorStation),
            other => Err(SimError::Data(format!("unknown unit kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Idle,
    Moving,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub faction: FactionId,
    pub kind: UnitKind,
    /// Region the unit currently stands in
    pub region: Option<RegionId>,
    pub physics: PhysicsState,
    status: UnitStatus,
    path: Vec<DVec3>,
    #[serde(skip)]
    dirty: bool,
}

impl Unit {
    pub fn new(id: UnitId, faction: FactionId, kind: UnitKind, position: DVec3, region: Option<RegionId>) -> Self {
        let (max_speed, max_force) = kind.limits();
        Self {
            id,
            faction,
            kind,
            region,
            physics: PhysicsState::new(position, kind.movement(), max_speed, max_force),
            status: UnitStatus::Idle,
            path: Vec::new(),
            dirty: true,
        }
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// Remaining waypoints, next first
    pub fn path(&self) -> &[DVec3] {
        &self.path
    }

    /// Plan a great-circle path to `destination`
    pub fn move_to(&mut self, destination: DVec3, planet_radius: f64) -> Result<()> {
        let movement = self.physics.movement;
        if !movement.is_steerable() {
            return Err(SimError::InvalidCommand(format!(
                "{} has {:?} movement and cannot be moved",
                self.id, movement
            )));
        }
        let shell = movement.shell_radius(planet_radius);
        self.path = great_circle_path(self.physics.position, destination, shell);
        self.status = UnitStatus::Moving;
        self.dirty = true;
        Ok(())
    }

    /// Step along the path. Returns true on the tick the unit arrives.
    pub fn update(&mut self, dt: f64, planet_radius: f64) -> bool {
        if self.status != UnitStatus::Moving {
            return false;
        }
        let Some(&next) = self.path.first() else {
            self.status = UnitStatus::Idle;
            return true;
        };
        let last = self.path.len() == 1;
        let force = if last {
            self.physics.arrive(next)
        } else {
            self.physics.seek(next)
        };
        let shell = self.physics.movement.shell_radius(planet_radius);
        self.physics.integrate(force, dt, shell);
        self.dirty = true;

        let distance = self.physics.position.distance(next);
        if last && distance < physics::ARRIVAL_RADIUS {
            self.path.clear();
            self.physics.velocity = DVec3::ZERO;
            self.physics.acceleration = DVec3::ZERO;
            self.status = UnitStatus::Idle;
            return true;
        }
        if !last && distance < physics::WAYPOINT_RADIUS {
            self.path.remove(0);
        }
        false
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Seconds for one orbit at the reference altitude
pub const REFERENCE_PERIOD: f64 = 600.0;
/// Game-space units per km of altitude
pub const ALTITUDE_SCALE: f64 = 0.01;

/// An orbiting satellite. Position is fully determined by its orbit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    pub id: UnitId,
    pub faction: FactionId,
    pub altitude_km: f64,
    /// Orbital plane tilt (radians)
    pub inclination: f64,
    /// Angle along the orbit (radians)
    pub phase: f64,
    /// Radians per second
    pub angular_speed: f64,
    pub physics: PhysicsState,
    #[serde(skip)]
    dirty: bool,
}

impl Satellite {
    pub fn new(id: UnitId, faction: FactionId, altitude_km: f64, inclination: f64, phase: f64, planet_radius: f64) -> Self {
        let mut sat = Self {
            id,
            faction,
            altitude_km,
            inclination,
            phase,
            angular_speed: std::f64::consts::TAU / REFERENCE_PERIOD,
            physics: PhysicsState::new(DVec3::ZERO, MovementType::Orbital, 0.0, 0.0),
            dirty: true,
        };
        sat.place(planet_radius);
        sat
    }

    pub fn orbit_radius(&self, planet_radius: f64) -> f64 {
        planet_radius + self.altitude_km * ALTITUDE_SCALE
    }

    fn place(&mut self, planet_radius: f64) {
        let r = self.orbit_radius(planet_radius);
        let tilt = DQuat::from_rotation_x(self.inclination);
        let (s, c) = self.phase.sin_cos();
        self.physics.position = tilt * DVec3::new(c, 0.0, s) * r;
        self.physics.velocity = tilt * DVec3::new(-s, 0.0, c) * r * self.angular_speed;
    }

    pub fn update(&mut self, dt: f64, planet_radius: f64) {
        self.phase = (self.phase + self.angular_speed * dt).rem_euclid(std::f64::consts::TAU);
        self.place(planet_radius);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::lat_lon_to_position;

    #[test]
    fn test_ground_unit_arrives() {
        let start = lat_lon_to_position(0.0, 0.0, 100.0);
        let goal = lat_lon_to_position(0.0, 10.0, 100.0);
        let mut unit = Unit::new(UnitId(0), FactionId(0), UnitKind::GroundTeam, start, None);
        unit.move_to(goal, 100.0).unwrap();

        let mut arrived = false;
        for _ in 0..(30 * 120) {
            if unit.update(1.0 / 30.0, 100.0) {
                arrived = true;
                break;
            }
        }
        assert!(arrived);
        assert_eq!(unit.status(), UnitStatus::Idle);
        assert!(unit.physics.position.distance(goal) < physics::ARRIVAL_RADIUS);
    }

    #[test]
    fn test_static_and_orbital_reject_moves() {
        let mut sensor = Unit::new(UnitId(0), FactionId(0), UnitKind::SensorStation, DVec3::Z * 100.0, None);
        assert!(sensor.move_to(DVec3::X * 100.0, 100.0).is_err());
        assert_eq!(sensor.status(), UnitStatus::Idle);
    }

    #[test]
    fn test_satellite_keeps_orbit_radius() {
        let mut sat = Satellite::new(UnitId(1), FactionId(0), 400.0, 0.5, 0.0, 100.0);
        let r = sat.orbit_radius(100.0);
        for _ in 0..100 {
            sat.update(7.0, 100.0);
            assert!((sat.physics.position.length() - r).abs() < 1e-9);
        }
    }
}
