//! Battle report
//!
//! Summarises a finished battle for the headless runner and for tuning the AI.

use serde::{Deserialize, Serialize};

use crate::battle::execution::{BattleEventType, BattleState};
use crate::battle::units::{Battlefield, Roster, Side};
use crate::core::types::{Turn, UnitId};

/// Per-side numbers of a finished battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub side: Side,
    pub deployed: usize,
    pub survivors: usize,
    /// Remaining hp over starting hp, across the whole roster
    pub hp_fraction: f64,
    /// Damage dealt by this side, counterattacks included
    pub damage_dealt: u64,
}

/// Detailed report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub victory: bool,
    pub turns: Turn,
    pub seed: u64,
    pub player: SideSummary,
    pub enemy: SideSummary,
}

fn side_of(field: &Battlefield, unit: UnitId) -> Option<Side> {
    field.get_unit(unit).map(|u| u.side)
}

fn summarize(roster: &Roster, damage_dealt: u64) -> SideSummary {
    let max_hp: u64 = roster.units.iter().map(|u| u.max_hp as u64).sum();
    let hp: u64 = roster.living().map(|u| u.hp as u64).sum();
    SideSummary {
        side: roster.side,
        deployed: roster.units.len(),
        survivors: roster.living_count(),
        hp_fraction: if max_hp > 0 {
            hp as f64 / max_hp as f64
        } else {
            0.0
        },
        damage_dealt,
    }
}

impl BattleReport {
    /// Build the report of a finished battle; None while it is still running
    pub fn from_state(state: &BattleState) -> Option<Self> {
        let victory = state.outcome?;

        let (mut player_damage, mut enemy_damage) = (0u64, 0u64);
        for event in &state.battle_log {
            if let BattleEventType::UnitAttacked {
                attacker,
                damage,
                counter_damage,
                ..
            } = &event.event_type
            {
                match side_of(&state.field, *attacker) {
                    Some(Side::Player) => {
                        player_damage += *damage as u64;
                        enemy_damage += *counter_damage as u64;
                    }
                    Some(Side::Enemy) => {
                        enemy_damage += *damage as u64;
                        player_damage += *counter_damage as u64;
                    }
                    None => {}
                }
            }
        }

        Some(Self {
            victory,
            turns: state.turn_number,
            seed: state.seed,
            player: summarize(&state.field.player, player_damage),
            enemy: summarize(&state.field.enemy, enemy_damage),
        })
    }
}
