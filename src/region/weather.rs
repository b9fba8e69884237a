//! Regional weather
//!
//! Weather nudges economic drift and pushes radiological plumes around.
//! Changes are rolled from a hash of (seed, region) so regions can update
//! in parallel without sharing an RNG.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Current weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Clear,
    Cloudy,
    Rain,
    Storm,
    Heatwave,
    Blizzard,
}

impl Weather {
    /// Multiplier on passive economic growth (1.0 = normal)
    pub fn economy_modifier(&self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Cloudy => 1.0,
            Self::Rain => 0.9,
            Self::Storm => 0.5,
            Self::Heatwave => 0.7,
            Self::Blizzard => 0.4,
        }
    }

    /// Wind speed in game units per second, drives plume drift
    pub fn wind_speed(&self) -> f64 {
        match self {
            Self::Clear => 0.05,
            Self::Cloudy => 0.08,
            Self::Rain => 0.1,
            Self::Storm => 0.3,
            Self::Heatwave => 0.02,
            Self::Blizzard => 0.25,
        }
    }

    /// Weights for [Clear, Cloudy, Rain, Storm, Heatwave, Blizzard]
    fn weights() -> [f64; 6] {
        [0.35, 0.25, 0.2, 0.08, 0.07, 0.05]
    }

    fn from_index(i: usize) -> Self {
        match i {
            0 => Self::Clear,
            1 => Self::Cloudy,
            2 => Self::Rain,
            3 => Self::Storm,
            4 => Self::Heatwave,
            _ => Self::Blizzard,
        }
    }
}

/// Weather state for a single region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherState {
    pub current: Weather,
    /// Seconds the current weather has persisted
    pub elapsed: f64,
    /// Seconds until the weather is re-rolled
    pub duration: f64,
    /// Heading of the wind in the local tangent plane (radians)
    pub wind_heading: f64,
}

impl WeatherState {
    pub fn new() -> Self {
        Self {
            current: Weather::Clear,
            elapsed: 0.0,
            duration: 120.0,
            wind_heading: 0.0,
        }
    }

    /// Advance weather, returns true if it changed
    pub fn update(&mut self, dt: f64, seed: u64) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.duration {
            return false;
        }

        let old = self.current;
        self.current = roll_weather(seed);
        self.elapsed = 0.0;
        // Weather persists 1-5 minutes
        self.duration = 60.0 * ((simple_hash(seed, 1) % 5) + 1) as f64;
        self.wind_heading = (simple_hash(seed, 2) % 360) as f64 * std::f64::consts::PI / 180.0;
        old != self.current
    }

    /// Wind vector tangent to the sphere at `position`
    pub fn wind_at(&self, position: DVec3) -> DVec3 {
        let up = position.normalize_or_zero();
        let mut east = DVec3::Y.cross(up);
        if east.length_squared() < 1e-12 {
            east = DVec3::X;
        }
        let east = east.normalize();
        let north = up.cross(east);
        (east * self.wind_heading.cos() + north * self.wind_heading.sin()) * self.current.wind_speed()
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::new()
    }
}

fn roll_weather(seed: u64) -> Weather {
    let roll = (simple_hash(seed, 0) % 100) as f64 / 100.0;
    let mut cumulative = 0.0;
    for (i, w) in Weather::weights().iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            return Weather::from_index(i);
        }
    }
    Weather::Clear
}

pub(crate) fn simple_hash(seed: u64, modifier: u64) -> u64 {
    let mut h = seed.wrapping_add(modifier);
    h = h.wrapping_mul(6364136223846793005);
    h = h.wrapping_add(1442695040888963407);
    h ^ (h >> 32)
}
