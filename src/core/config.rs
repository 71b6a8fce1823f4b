//! Battle configuration with documented constants
//!
//! Every tunable number of the engine lives here. `BattleConfig::default()`
//! reproduces the reference rules; a TOML file may override any subset.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::army_gen::ArmyConfig;
use crate::battle::constants::{
    COUNTER_DAMAGE_FACTOR, DAMAGE_VARIANCE_MAX, DAMAGE_VARIANCE_MIN, FORMATION_COLS,
    FORMATION_ROWS, GRID_COLS, GRID_ROWS, MAX_TURNS,
};
use crate::core::error::{BattleError, Result};
use crate::core::types::Turn;

/// Configuration for a single battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    // === GRID ===
    /// Number of columns (valid q is `0..cols`)
    pub cols: i32,

    /// Number of rows (valid r is `0..rows`)
    pub rows: i32,

    // === TURNS ===
    /// Turn number at which the battle is decided by remaining hp fraction
    pub max_turns: Turn,

    // === COMBAT ===
    /// Lower bound (inclusive) of the damage multiplier
    pub damage_variance_min: f64,

    /// Upper bound (exclusive) of the damage multiplier
    pub damage_variance_max: f64,

    /// Share of the defender's damage dealt back by a melee counterattack
    pub counter_damage_factor: f64,

    // === DEPLOYMENT ===
    /// Width of the player formation block (slots per row)
    pub formation_cols: i32,

    /// Height of the player formation block
    pub formation_rows: i32,

    // === ENEMY ARMY ===
    pub army: ArmyConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            cols: GRID_COLS,
            rows: GRID_ROWS,
            max_turns: MAX_TURNS,
            damage_variance_min: DAMAGE_VARIANCE_MIN,
            damage_variance_max: DAMAGE_VARIANCE_MAX,
            counter_damage_factor: COUNTER_DAMAGE_FACTOR,
            formation_cols: FORMATION_COLS,
            formation_rows: FORMATION_ROWS,
            army: ArmyConfig::default(),
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.cols <= 0 || self.rows <= 0 {
            return Err(BattleError::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.cols, self.rows
            )));
        }

        if self.max_turns == 0 {
            return Err(BattleError::InvalidConfig("max_turns must be positive".into()));
        }

        if !(self.damage_variance_min > 0.0 && self.damage_variance_min < self.damage_variance_max)
        {
            return Err(BattleError::InvalidConfig(format!(
                "damage variance range [{}, {}) is empty or non-positive",
                self.damage_variance_min, self.damage_variance_max
            )));
        }

        if self.counter_damage_factor < 0.0 {
            return Err(BattleError::InvalidConfig(
                "counter_damage_factor must not be negative".into(),
            ));
        }

        if self.formation_cols <= 0
            || self.formation_rows <= 0
            || self.formation_cols > self.cols
            || self.formation_rows > self.rows
        {
            return Err(BattleError::InvalidConfig(format!(
                "formation {}x{} does not fit the {}x{} grid",
                self.formation_cols, self.formation_rows, self.cols, self.rows
            )));
        }

        self.army.validate()
    }
}
