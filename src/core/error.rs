use thiserror::Error;

use crate::core::types::{AgentId, FactionId, RegionId, ThreatId, UnitId};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Threat not found: {0}")]
    ThreatNotFound(ThreatId),

    #[error("Region not found: {0}")]
    RegionNotFound(RegionId),

    #[error("Faction not found: {0}")]
    FactionNotFound(FactionId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Static data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
