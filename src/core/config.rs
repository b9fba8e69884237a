//! Simulation configuration with documented constants
//!
//! All tunable numbers are collected here with notes on what they affect.
//! Every field has a default, so a TOML file only needs the keys it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::faction::Resources;

/// Configuration for the simulation systems
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === CLOCK ===
    /// Fixed timestep for the worker loop (seconds)
    pub fixed_dt: f64,

    /// Seed for the world RNG. Same seed + same commands = same history.
    pub seed: u64,

    // === GEOGRAPHY ===
    /// Radius of the planet in game-space units
    ///
    /// Region centroids and threat positions live on this sphere.
    /// Region radii are expressed in the same units.
    pub planet_radius: f64,

    /// Stability relaxes toward this value when nothing disturbs a region
    pub stability_baseline: f64,

    /// Fraction of (baseline - stability) recovered per second
    pub stability_drift_rate: f64,

    /// Economy growth per second per unit of education
    pub economy_growth_rate: f64,

    // === THREATS ===
    /// Base damage per second a severity-1.0 threat deals to its region
    ///
    /// Multiplied by the per-domain economic/stability multipliers.
    pub damage_rate: f64,

    /// Damage factor applied to GEO threats in a FORTIFIED region (0.2 = -80%)
    pub fortified_damage_factor: f64,

    /// Severity above which a BIO threat starts seeding neighbours
    pub bio_spread_threshold: f64,

    /// Seconds of accumulated dt between BIO spread checks
    pub bio_spread_interval: f64,

    /// Severity of a freshly seeded BIO threat
    pub bio_seed_severity: f64,

    /// Particles emitted per second per unit of contamination
    pub plume_emission_rate: f64,

    /// Lifetime of a plume particle (seconds)
    pub plume_particle_lifetime: f64,

    // === ECONOMY ===
    /// Fixed per-second income for the player faction
    pub player_trickle: Resources,

    /// Fixed per-second income for AI factions before milestone multipliers
    pub ai_trickle: Resources,

    /// Added to the AI trickle multiplier per singularity milestone reached
    pub ai_milestone_multiplier_step: f64,

    /// Funds per second from an owned region at economy 1.0
    pub region_income_rate: f64,

    /// Funds multiplier for owned regions with a BASE
    pub base_income_multiplier: f64,

    /// Tech per second from a RESEARCH_OUTPOST at education 1.0
    pub research_outpost_tech_rate: f64,

    /// Intel per second per owned satellite
    pub satellite_intel_rate: f64,

    /// Intel per second from an INFORMANT_NETWORK buff
    pub informant_intel_rate: f64,

    // === AGENTS ===
    /// Experience needed per agent level
    pub agent_xp_per_level: u32,

    /// Probability that a failed mission kills the agent (otherwise captured)
    pub agent_kia_chance: f64,

    // === AI ===
    /// Seconds between AI planner decisions
    pub ai_decision_interval: f64,

    /// Seconds between opportunistic AI threat spawns, per alert level 0/1/2
    pub ai_threat_intervals: [f64; 3],

    /// Alert score at or above which the AI reaches level 1 and level 2
    pub alert_thresholds: [u32; 2],

    /// Funds cost of an AI-generated threat
    pub ai_threat_cost: Resources,

    // === SYNC ===
    /// Capacity of the worker -> presentation update channel
    ///
    /// A full channel makes the worker skip extraction for that tick;
    /// dirty flags accumulate into the next delta instead of blocking.
    pub update_channel_capacity: usize,

    /// Capacity of the presentation -> worker command channel
    pub command_channel_capacity: usize,

    // === PARALLELIZATION ===
    /// Minimum region count before region drift runs on rayon
    pub parallel_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 30.0,
            seed: 0x5EED_0F_600D,

            planet_radius: 100.0,
            stability_baseline: 0.5,
            stability_drift_rate: 0.001,
            economy_growth_rate: 0.0002,

            damage_rate: 0.002,
            fortified_damage_factor: 0.2,
            bio_spread_threshold: 0.7,
            bio_spread_interval: 30.0,
            bio_seed_severity: 0.2,
            plume_emission_rate: 4.0,
            plume_particle_lifetime: 20.0,

            player_trickle: Resources::new(2.0, 0.5, 0.2),
            ai_trickle: Resources::new(2.5, 0.5, 0.3),
            ai_milestone_multiplier_step: 0.25,
            region_income_rate: 1.0,
            base_income_multiplier: 1.5,
            research_outpost_tech_rate: 0.1,
            satellite_intel_rate: 0.3,
            informant_intel_rate: 0.2,

            agent_xp_per_level: 100,
            agent_kia_chance: 0.3,

            ai_decision_interval: 5.0,
            ai_threat_intervals: [60.0, 40.0, 20.0],
            alert_thresholds: [5, 15],
            ai_threat_cost: Resources::new(150.0, 0.0, 0.0),

            update_channel_capacity: 8,
            command_channel_capacity: 64,

            parallel_threshold: 1000,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document over the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate().map_err(SimError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.fixed_dt <= 0.0 {
            return Err(format!("fixed_dt ({}) must be positive", self.fixed_dt));
        }

        if self.planet_radius <= 0.0 {
            return Err("planet_radius must be positive".into());
        }

        if !(0.0..=1.0).contains(&self.fortified_damage_factor) {
            return Err(format!(
                "fortified_damage_factor ({}) must be within [0, 1]",
                self.fortified_damage_factor
            ));
        }

        if self.bio_spread_interval <= 0.0 || self.ai_decision_interval <= 0.0 {
            return Err("Timer intervals must be positive".into());
        }

        // Higher alert means faster spawns
        let [calm, wary, alarmed] = self.ai_threat_intervals;
        if !(calm >= wary && wary >= alarmed && alarmed > 0.0) {
            return Err(format!(
                "ai_threat_intervals ({:?}) must be positive and non-increasing",
                self.ai_threat_intervals
            ));
        }

        if self.alert_thresholds[0] >= self.alert_thresholds[1] {
            return Err(format!(
                "alert_thresholds ({:?}) must be strictly increasing",
                self.alert_thresholds
            ));
        }

        if self.update_channel_capacity == 0 || self.command_channel_capacity == 0 {
            return Err("Channel capacities must be at least 1".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_keys() {
        let config = SimulationConfig::from_toml_str(
            r#"
seed = 42
ai_decision_interval = 2.5
"#,
        )
        .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.ai_decision_interval, 2.5);
        assert_eq!(config.bio_spread_threshold, 0.7);
    }

    #[test]
    fn test_nested_resources_parse() {
        let config = SimulationConfig::from_toml_str(
            r#"
[player_trickle]
funds = 10.0
intel = 1.0
tech = 0.0
"#,
        )
        .unwrap();

        assert_eq!(config.player_trickle.funds, 10.0);
    }

    #[test]
    fn test_invalid_intervals_rejected() {
        let result = SimulationConfig::from_toml_str("ai_threat_intervals = [10.0, 20.0, 30.0]");
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = SimulationConfig::from_toml_str("seed = \"not a number\"");
        assert!(matches!(result, Err(SimError::TomlError(_))));
    }
}
