//! Point-mass physics on the planet surface and in orbit

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Distance under which the final waypoint counts as reached
pub const ARRIVAL_RADIUS: f64 = 0.25;
/// Distance at which an intermediate waypoint is dropped
pub const WAYPOINT_RADIUS: f64 = 1.0;
/// Distance over which `arrive` ramps speed down
pub const SLOWING_RADIUS: f64 = 3.0;
/// Cruise height of air units above the surface
pub const AIR_ALTITUDE: f64 = 2.0;
/// Great-circle segment length used when planning paths
pub const PATH_SEGMENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Ground,
    Air,
    Orbital,
    Static,
}

impl MovementType {
    /// Whether the unit accepts player-directed movement
    pub fn is_steerable(&self) -> bool {
        matches!(self, Self::Ground | Self::Air)
    }

    /// Radius of the shell the unit lives on
    pub fn shell_radius(&self, planet_radius: f64) -> f64 {
        match self {
            Self::Air => planet_radius + AIR_ALTITUDE,
            _ => planet_radius,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    pub position: DVec3,
    pub velocity: DVec3,
    pub acceleration: DVec3,
    pub mass: f64,
    pub max_speed: f64,
    pub max_force: f64,
    pub movement: MovementType,
}

impl PhysicsState {
    pub fn new(position: DVec3, movement: MovementType, max_speed: f64, max_force: f64) -> Self {
        Self {
            position,
            velocity: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            mass: 1.0,
            max_speed,
            max_force,
            movement,
        }
    }

    /// Steering force toward `target` at full speed
    pub fn seek(&self, target: DVec3) -> DVec3 {
        let desired = (target - self.position).normalize_or_zero() * self.max_speed;
        (desired - self.velocity).clamp_length_max(self.max_force)
    }

    /// Steering force toward `target`, slowing inside `SLOWING_RADIUS`
    pub fn arrive(&self, target: DVec3) -> DVec3 {
        let offset = target - self.position;
        let distance = offset.length();
        if distance < 1e-9 {
            return (-self.velocity).clamp_length_max(self.max_force);
        }
        let speed = self.max_speed * (distance / SLOWING_RADIUS).min(1.0);
        let desired = offset / distance * speed;
        (desired - self.velocity).clamp_length_max(self.max_force)
    }

    /// Semi-implicit Euler step, then re-project onto the movement shell
    pub fn integrate(&mut self, force: DVec3, dt: f64, shell_radius: f64) {
        self.acceleration = force / self.mass.max(1e-6);
        self.velocity = (self.velocity + self.acceleration * dt).clamp_length_max(self.max_speed);
        self.position += self.velocity * dt;

        let up = self.position.normalize_or_zero();
        if up != DVec3::ZERO {
            self.position = up * shell_radius;
            // Keep velocity tangent to the shell
            self.velocity -= up * self.velocity.dot(up);
        }
    }
}

/// Spherical interpolation between two points on a shell of `radius`
pub fn slerp(a: DVec3, b: DVec3, t: f64, radius: f64) -> DVec3 {
    let (na, nb) = (a.normalize_or_zero(), b.normalize_or_zero());
    let angle = na.angle_between(nb);
    let dir = if angle < 1e-9 {
        na
    } else {
        let s = angle.sin();
        (na * ((1.0 - t) * angle).sin() + nb * (t * angle).sin()) / s
    };
    dir.normalize_or_zero() * radius
}

/// Waypoints along the great circle from `from` to `to` (excluding `from`)
pub fn great_circle_path(from: DVec3, to: DVec3, radius: f64) -> Vec<DVec3> {
    let arc = from.normalize_or_zero().angle_between(to.normalize_or_zero()) * radius;
    let segments = (arc / PATH_SEGMENT).ceil().max(1.0) as usize;
    (1..=segments)
        .map(|i| slerp(from, to, i as f64 / segments as f64, radius))
        .collect()
}
