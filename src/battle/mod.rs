//! Battle system - turn-based tactics on a small square grid
//!
//! Two rosters, one action per unit per turn. The player side is driven from
//! outside through `BattleState::select_cell`; the enemy side is driven by an
//! AI. Every random draw flows through the battle's own seeded RNG, so a seed
//! plus the same requests replays the same battle.

pub mod ai;
pub mod army_gen;
pub mod constants;
pub mod deployment;
pub mod execution;
pub mod grid;
pub mod pathfinding;
pub mod resolution;
pub mod targeting;
pub mod unit_type;
pub mod units;

// Re-exports for convenient access
pub use ai::{autoplay, play_player_turn, AiCommander, BattleAi, BattleReport, SideSummary, UnitPlan};
pub use army_gen::{generate_army, ArmyConfig, EnemyTemplate, GeneratedUnit, PowerBracket};
pub use constants::*;
pub use deployment::{sample_roster, PlayerUnitSpec, PositionHint};
pub use execution::{
    check_battle_end, BattleEvent, BattleEventLog, BattleEventType, BattlePhase, BattleResult,
    BattleStart, BattleState, CompletionCallback,
};
pub use grid::{BattleGrid, Direction, GridCoord};
pub use pathfinding::{find_path, reachable_cells, shortest_path};
pub use resolution::{resolve_attack, AttackResult, CombatRules};
pub use targeting::{attack_cells, attackable_enemies};
pub use unit_type::{UnitProperties, UnitType};
pub use units::{BattleUnit, Battlefield, Roster, Side};
