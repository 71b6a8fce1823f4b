use thiserror::Error;

use crate::battle::grid::GridCoord;
use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Units {attacker} and {defender} are on the same side")]
    SameSide { attacker: UnitId, defender: UnitId },

    #[error("Unit {0} is dead and cannot act")]
    UnitDead(UnitId),

    #[error("Unit {defender} is out of range of {attacker}")]
    OutOfRange { attacker: UnitId, defender: UnitId },

    #[error("Cell ({}, {}) is outside the grid", .0.q, .0.r)]
    InvalidCell(GridCoord),

    #[error("No player unit could be deployed")]
    EmptyRoster,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BattleError>;
