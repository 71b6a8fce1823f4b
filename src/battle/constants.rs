//! Battle system constants - reference values in one place
//!
//! `BattleConfig::default()` is built from these; runtime code reads the config.

use crate::core::types::Turn;

// Grid
pub const GRID_COLS: i32 = 10;
pub const GRID_ROWS: i32 = 8;

// Turns
pub const MAX_TURNS: Turn = 25;

// Combat
pub const DAMAGE_VARIANCE_MIN: f64 = 0.8;
pub const DAMAGE_VARIANCE_MAX: f64 = 1.2;
pub const COUNTER_DAMAGE_FACTOR: f64 = 0.5;
pub const MELEE_RANGE: u32 = 1;

// Player deployment (3x3 war-table block on the left edge)
pub const FORMATION_COLS: i32 = 3;
pub const FORMATION_ROWS: i32 = 3;

// Enemy army scaling
pub const ENEMY_BASE_HP: f64 = 50.0;
pub const ENEMY_HP_PER_POWER: f64 = 0.15;
pub const ENEMY_BASE_DAMAGE: f64 = 20.0;
pub const ENEMY_DAMAGE_PER_POWER: f64 = 0.06;
pub const MAX_ENEMY_UNITS: u32 = 9;
pub const FALLBACK_MIN_UNITS: u32 = 8;
pub const FALLBACK_MAX_UNITS: u32 = 9;
