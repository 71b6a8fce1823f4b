//! AI Commander - scripted battle AI
//!
//! Focus fire: every unit goes for the closest enemy, breaking ties on the
//! lowest hp, and closes in until that enemy is within its range.

use std::collections::BTreeMap;

use crate::battle::ai::{BattleAi, UnitPlan};
use crate::battle::execution::{BattleEventLog, BattleResult, BattleState};
use crate::battle::grid::GridCoord;
use crate::battle::pathfinding::reachable_cells;
use crate::battle::targeting::attackable_enemies;
use crate::battle::units::{BattleUnit, Battlefield, Side};
use crate::core::types::UnitId;

/// AI Commander implementing BattleAi
///
/// Works for either side; the headless runner uses it to drive the player.
#[derive(Debug, Clone, Default)]
pub struct AiCommander;

impl AiCommander {
    pub fn new() -> Self {
        Self
    }

    /// Pick a destination that brings `target` into range
    ///
    /// Cells from which the target is in range win, fewest steps first.
    /// Otherwise the cell closest to the target, but only if it is closer
    /// than where the unit already stands.
    fn choose_move(
        unit: &BattleUnit,
        target: GridCoord,
        reachable: &BTreeMap<GridCoord, u32>,
    ) -> Option<GridCoord> {
        let in_range = reachable
            .iter()
            .filter(|(cell, _)| cell.distance(&target) <= unit.range)
            .min_by_key(|(_, steps)| **steps)
            .map(|(cell, _)| *cell);
        if in_range.is_some() {
            return in_range;
        }

        let current = unit.position.distance(&target);
        reachable
            .iter()
            .min_by_key(|(cell, steps)| (cell.distance(&target), **steps))
            .filter(|(cell, _)| cell.distance(&target) < current)
            .map(|(cell, _)| *cell)
    }
}

/// Living opponents of `unit`, closest first, then lowest hp
pub fn prioritized_targets<'a>(field: &'a Battlefield, unit: &BattleUnit) -> Vec<&'a BattleUnit> {
    let mut targets: Vec<&BattleUnit> = field.roster(unit.side.opponent()).living().collect();
    targets.sort_by_key(|t| (unit.position.distance(&t.position), t.hp));
    targets
}

impl BattleAi for AiCommander {
    fn plan_unit(&mut self, field: &Battlefield, unit_id: UnitId) -> UnitPlan {
        let Some(unit) = field.get_unit(unit_id).filter(|u| u.alive) else {
            return UnitPlan::hold(unit_id);
        };
        let targets = prioritized_targets(field, unit);
        let Some(primary) = targets.first() else {
            return UnitPlan::hold(unit_id);
        };

        if unit.position.distance(&primary.position) <= unit.range {
            tracing::debug!("{} {} attacks {} in place", unit.side, unit_id, primary.id);
            return UnitPlan {
                unit: unit_id,
                move_to: None,
                target: Some(primary.id),
            };
        }

        let reachable = reachable_cells(field, unit.position, unit.mobility, unit.side);
        let move_to = Self::choose_move(unit, primary.position, &reachable);
        let from = move_to.unwrap_or(unit.position);

        let target = if from.distance(&primary.position) <= unit.range {
            Some(primary.id)
        } else {
            attackable_enemies(field, from, unit.range, unit.side)
                .first()
                .map(|u| u.id)
        };

        tracing::debug!(
            "{} {} targets {}: move {:?}, attack {:?}",
            unit.side,
            unit_id,
            primary.id,
            move_to,
            target
        );
        UnitPlan {
            unit: unit_id,
            move_to,
            target,
        }
    }
}

/// Play the player's current turn through `select_cell`, then end it
///
/// Issues exactly the requests a human would, so it exercises the same state
/// machine paths.
pub fn play_player_turn<A: BattleAi + ?Sized>(
    state: &mut BattleState,
    ai: &mut A,
) -> BattleEventLog {
    let mut log = BattleEventLog::new();
    let turn = state.turn_number;
    let in_turn = |state: &BattleState| {
        !state.is_finished() && state.current_side == Side::Player && state.turn_number == turn
    };

    for unit_id in state.field.player.ready_ids() {
        if !in_turn(state) {
            return log;
        }
        let Some(origin) = state
            .field
            .get_unit(unit_id)
            .filter(|u| u.can_act())
            .map(|u| u.position)
        else {
            continue;
        };
        let plan = ai.plan_unit(&state.field, unit_id);
        if plan.is_idle() {
            continue;
        }

        log.extend(state.select_cell(origin));
        if let Some(dest) = plan.move_to {
            log.extend(state.select_cell(dest));
        }
        if let Some(target) = plan.target {
            let cell = state
                .field
                .get_unit(target)
                .filter(|u| u.alive)
                .map(|u| u.position);
            if let (Some(cell), Some(_)) = (cell, state.selected_unit) {
                log.extend(state.select_cell(cell));
            }
        }
        if state.selected_unit == Some(unit_id) {
            // Plan could not be carried out; drop the selection
            let here = state
                .field
                .get_unit(unit_id)
                .map_or(origin, |u| u.position);
            log.extend(state.select_cell(here));
        }
    }

    if in_turn(state) {
        log.extend(state.end_turn());
    }
    log
}

/// Let `ai` play the player side until the battle ends
pub fn autoplay<A: BattleAi + ?Sized>(state: &mut BattleState, ai: &mut A) -> Option<BattleResult> {
    while !state.is_finished() {
        let turn = state.turn_number;
        play_player_turn(state, ai);
        if !state.is_finished() && state.turn_number == turn {
            tracing::warn!("Turn {} did not advance, stopping autoplay", turn);
            break;
        }
    }
    state.result()
}
