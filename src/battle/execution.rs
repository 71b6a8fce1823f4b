//! Battle execution: turn/phase state machine and orchestration
//!
//! The player side is driven by `select_cell` and `end_turn`; the enemy side
//! runs to completion inside the call that hands it the turn. A termination
//! check follows every finished unit action.

use std::fmt;

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ai::{AiCommander, BattleAi};
use crate::battle::army_gen::generate_army;
use crate::battle::deployment::{deploy_enemy_units, deploy_player_units, PlayerUnitSpec};
use crate::battle::grid::{BattleGrid, GridCoord};
use crate::battle::pathfinding::{reachable_cells, shortest_path};
use crate::battle::resolution::{resolve_attack, AttackResult, CombatRules};
use crate::battle::targeting::attack_cells;
use crate::battle::units::{Battlefield, Side};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{IdGenerator, Turn, UnitId};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    PlayerSelect, // Waiting for the player to pick a unit
    PlayerMove,   // Unit picked, may move or attack
    PlayerAttack, // Unit moved, may attack
    EnemyTurn,    // AI acting
    Done,         // Battle over
}

/// Final outcome handed to the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub victory: bool,
}

/// Everything needed to start a battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStart {
    pub player_units: Vec<PlayerUnitSpec>,
    pub enemy_power: f64,
    /// Seed for every random draw of the battle; drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub turn: Turn,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    UnitSelected {
        unit: UnitId,
    },
    SelectionCleared,
    HighlightsChanged {
        moves: Vec<GridCoord>,
        attacks: Vec<GridCoord>,
    },
    UnitMoved {
        unit: UnitId,
        path: Vec<GridCoord>,
    },
    UnitAttacked {
        attacker: UnitId,
        defender: UnitId,
        damage: u32,
        counter_damage: u32,
    },
    UnitDied {
        unit: UnitId,
    },
    ActionFinished {
        unit: UnitId,
    },
    TurnChanged {
        side: Side,
        turn: Turn,
    },
    BattleEnded {
        victory: bool,
    },
}

/// Events produced by one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_type: BattleEventType, description: String, turn: Turn) {
        self.events.push(BattleEvent {
            turn,
            event_type,
            description,
        });
    }

    /// Append the events of a later request
    pub fn extend(&mut self, other: BattleEventLog) {
        self.events.extend(other.events);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }
}

/// Called once with the outcome
pub type CompletionCallback = Box<dyn FnOnce(BattleResult)>;

fn sorted(cells: &AHashSet<GridCoord>) -> Vec<GridCoord> {
    let mut cells: Vec<GridCoord> = cells.iter().copied().collect();
    cells.sort();
    cells
}

/// Complete battle state
pub struct BattleState {
    pub config: BattleConfig,
    pub field: Battlefield,

    // Turn flow
    pub turn_number: Turn,
    pub current_side: Side,
    pub phase: BattlePhase,

    // Selection
    pub selected_unit: Option<UnitId>,
    pub legal_move_cells: AHashSet<GridCoord>,
    pub legal_attack_cells: AHashSet<GridCoord>,

    pub outcome: Option<bool>,
    pub seed: u64,

    // Log
    pub battle_log: Vec<BattleEvent>,

    rules: CombatRules,
    rng: ChaCha8Rng,
    enemy_ai: Box<dyn BattleAi>,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleState")
            .field("turn_number", &self.turn_number)
            .field("current_side", &self.current_side)
            .field("phase", &self.phase)
            .field("selected_unit", &self.selected_unit)
            .field("outcome", &self.outcome)
            .field("seed", &self.seed)
            .field("field", &self.field)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

impl BattleState {
    /// Deploy both rosters and open the player's first turn
    pub fn new(config: BattleConfig, start: BattleStart) -> Result<Self> {
        config.validate()?;

        let seed = start.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut field = Battlefield::new(BattleGrid::new(config.cols, config.rows));
        let mut ids = IdGenerator::new();

        if deploy_player_units(&mut field, &mut ids, &start.player_units, &config) == 0 {
            return Err(BattleError::EmptyRoster);
        }
        let army = generate_army(&config.army, start.enemy_power, &mut rng);
        deploy_enemy_units(&mut field, &mut ids, &army, &config);

        tracing::info!(
            "Battle started: {} player units vs {} enemy units (power {}, seed {})",
            field.player.units.len(),
            field.enemy.units.len(),
            start.enemy_power,
            seed
        );

        let mut state = Self {
            rules: CombatRules::from_config(&config),
            config,
            field,
            turn_number: 1,
            current_side: Side::Player,
            phase: BattlePhase::PlayerSelect,
            selected_unit: None,
            legal_move_cells: AHashSet::new(),
            legal_attack_cells: AHashSet::new(),
            outcome: None,
            seed,
            battle_log: Vec::new(),
            rng,
            enemy_ai: Box::new(AiCommander::new()),
            on_complete: None,
        };
        state.battle_log.push(BattleEvent {
            turn: 1,
            event_type: BattleEventType::TurnChanged {
                side: Side::Player,
                turn: 1,
            },
            description: "Turn 1: player".into(),
        });
        Ok(state)
    }

    /// Register the completion callback
    ///
    /// Runs immediately if the battle has already ended.
    pub fn on_complete(&mut self, callback: impl FnOnce(BattleResult) + 'static) {
        match self.outcome {
            Some(victory) => callback(BattleResult { victory }),
            None => self.on_complete = Some(Box::new(callback)),
        }
    }

    /// Replace the AI that drives the enemy side
    pub fn set_enemy_ai(&mut self, ai: impl BattleAi + 'static) {
        self.enemy_ai = Box::new(ai);
    }

    /// Is the battle finished?
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Done)
    }

    pub fn result(&self) -> Option<BattleResult> {
        self.outcome.map(|victory| BattleResult { victory })
    }

    // ===== PLAYER REQUESTS =====

    /// A cell (or the unit on it) was chosen
    ///
    /// Interpreted against the current phase; anything illegal is a no-op.
    pub fn select_cell(&mut self, cell: GridCoord) -> BattleEventLog {
        let mut events = BattleEventLog::new();
        if self.is_finished() || self.current_side != Side::Player {
            return events;
        }
        if !self.field.grid.is_valid_cell(cell) {
            return events;
        }

        match self.phase {
            BattlePhase::PlayerSelect => self.handle_select(cell, &mut events),
            BattlePhase::PlayerMove => self.handle_move(cell, &mut events),
            BattlePhase::PlayerAttack => self.handle_attack(cell, &mut events),
            BattlePhase::EnemyTurn | BattlePhase::Done => {}
        }

        self.record(&events);
        events
    }

    /// Forfeit the remaining player actions and hand the turn to the enemy
    pub fn end_turn(&mut self) -> BattleEventLog {
        let mut events = BattleEventLog::new();
        if self.is_finished() || self.current_side != Side::Player {
            return events;
        }

        self.clear_selection(&mut events);
        for unit in self.field.player.units.iter_mut().filter(|u| u.can_act()) {
            unit.has_acted = true;
            events.push(
                BattleEventType::ActionFinished { unit: unit.id },
                format!("{} forfeited its action", unit.id),
                self.turn_number,
            );
        }
        if !self.check_battle_end(&mut events) {
            self.run_enemy_turn(&mut events);
        }

        self.record(&events);
        events
    }

    /// Own living unit on `cell` that still has its action
    fn selectable_unit(&self, cell: GridCoord) -> Option<UnitId> {
        self.field
            .unit_at(cell)
            .filter(|u| u.side == Side::Player && u.can_act())
            .map(|u| u.id)
    }

    fn handle_select(&mut self, cell: GridCoord, events: &mut BattleEventLog) {
        if let Some(unit_id) = self.selectable_unit(cell) {
            self.select_unit(unit_id, events);
        }
    }

    fn handle_move(&mut self, cell: GridCoord, events: &mut BattleEventLog) {
        let Some(unit_id) = self.selected_unit else {
            self.phase = BattlePhase::PlayerSelect;
            return;
        };

        if self.legal_move_cells.contains(&cell) {
            if let Err(e) = self.move_selected(unit_id, cell, events) {
                tracing::warn!("Move of {} failed: {}, finishing its action", unit_id, e);
                self.finish_action(unit_id, events);
            }
        } else if self.legal_attack_cells.contains(&cell) {
            self.attack_cell(unit_id, cell, events);
            self.finish_action(unit_id, events);
        } else {
            match self.selectable_unit(cell) {
                Some(other) if other != unit_id => self.select_unit(other, events),
                _ => self.clear_selection(events),
            }
        }
    }

    fn handle_attack(&mut self, cell: GridCoord, events: &mut BattleEventLog) {
        let Some(unit_id) = self.selected_unit else {
            self.phase = BattlePhase::PlayerSelect;
            return;
        };

        if self.legal_attack_cells.contains(&cell) {
            self.attack_cell(unit_id, cell, events);
            self.finish_action(unit_id, events);
            return;
        }

        let next = self.selectable_unit(cell).filter(|other| *other != unit_id);
        self.finish_action(unit_id, events);
        if let Some(other) = next {
            if self.phase == BattlePhase::PlayerSelect && self.current_side == Side::Player {
                self.select_unit(other, events);
            }
        }
    }

    fn select_unit(&mut self, unit_id: UnitId, events: &mut BattleEventLog) {
        let Some(unit) = self.field.get_unit(unit_id) else {
            return;
        };
        let (position, mobility, range) = (unit.position, unit.mobility, unit.range);

        self.selected_unit = Some(unit_id);
        self.phase = BattlePhase::PlayerMove;
        self.legal_move_cells = reachable_cells(&self.field, position, mobility, Side::Player)
            .into_keys()
            .collect();
        self.legal_attack_cells = attack_cells(&self.field, position, range, Side::Player)
            .into_iter()
            .collect();

        tracing::debug!(
            "Selected {} at ({}, {}): {} moves, {} attacks",
            unit_id,
            position.q,
            position.r,
            self.legal_move_cells.len(),
            self.legal_attack_cells.len()
        );
        events.push(
            BattleEventType::UnitSelected { unit: unit_id },
            format!("Selected {}", unit_id),
            self.turn_number,
        );
        self.push_highlights(events);
    }

    fn move_selected(
        &mut self,
        unit_id: UnitId,
        cell: GridCoord,
        events: &mut BattleEventLog,
    ) -> Result<()> {
        self.move_unit(unit_id, cell, events)?;

        let unit = self
            .field
            .get_unit(unit_id)
            .ok_or(BattleError::UnitNotFound(unit_id))?;
        let (position, range) = (unit.position, unit.range);

        self.phase = BattlePhase::PlayerAttack;
        self.legal_move_cells.clear();
        self.legal_attack_cells = attack_cells(&self.field, position, range, Side::Player)
            .into_iter()
            .collect();
        self.push_highlights(events);

        if self.legal_attack_cells.is_empty() {
            self.finish_action(unit_id, events);
        }
        Ok(())
    }

    fn clear_selection(&mut self, events: &mut BattleEventLog) {
        self.phase = BattlePhase::PlayerSelect;
        if self.selected_unit.take().is_none()
            && self.legal_move_cells.is_empty()
            && self.legal_attack_cells.is_empty()
        {
            return;
        }
        self.legal_move_cells.clear();
        self.legal_attack_cells.clear();
        events.push(
            BattleEventType::SelectionCleared,
            "Selection cleared".into(),
            self.turn_number,
        );
        self.push_highlights(events);
    }

    fn push_highlights(&self, events: &mut BattleEventLog) {
        events.push(
            BattleEventType::HighlightsChanged {
                moves: sorted(&self.legal_move_cells),
                attacks: sorted(&self.legal_attack_cells),
            },
            format!(
                "{} move cells, {} attack cells",
                self.legal_move_cells.len(),
                self.legal_attack_cells.len()
            ),
            self.turn_number,
        );
    }

    // ===== SHARED ACTION STEPS =====

    fn move_unit(
        &mut self,
        unit_id: UnitId,
        to: GridCoord,
        events: &mut BattleEventLog,
    ) -> Result<()> {
        let unit = self
            .field
            .get_unit(unit_id)
            .ok_or(BattleError::UnitNotFound(unit_id))?;
        let (from, side) = (unit.position, unit.side);

        let path = shortest_path(&self.field, from, to, side);
        self.field.move_unit(unit_id, to)?;

        tracing::debug!(
            "{} moved ({}, {}) -> ({}, {}) in {} steps",
            unit_id,
            from.q,
            from.r,
            to.q,
            to.r,
            path.len()
        );
        events.push(
            BattleEventType::UnitMoved {
                unit: unit_id,
                path,
            },
            format!("{} moved to ({}, {})", unit_id, to.q, to.r),
            self.turn_number,
        );
        Ok(())
    }

    /// Resolve `attacker_id` hitting whatever stands on `cell`
    fn resolve_at(&mut self, attacker_id: UnitId, cell: GridCoord) -> Result<AttackResult> {
        let defender_id = self
            .field
            .unit_at(cell)
            .map(|u| u.id)
            .ok_or(BattleError::InvalidCell(cell))?;
        let (attacker, defender) = self.field.pair_mut(attacker_id, defender_id)?;
        if attacker.position.distance(&defender.position) > attacker.range {
            return Err(BattleError::OutOfRange {
                attacker: attacker_id,
                defender: defender_id,
            });
        }
        resolve_attack(attacker, defender, &self.rules, &mut self.rng)
    }

    /// Attack the unit on `cell`, recovering from any failure
    fn attack_cell(&mut self, attacker_id: UnitId, cell: GridCoord, events: &mut BattleEventLog) {
        let result = match self.resolve_at(attacker_id, cell) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Attack by {} failed: {}", attacker_id, e);
                return;
            }
        };

        tracing::debug!(
            "{} hit {} for {} (counter {})",
            result.attacker,
            result.defender,
            result.damage_dealt,
            result.counter_damage
        );
        events.push(
            BattleEventType::UnitAttacked {
                attacker: result.attacker,
                defender: result.defender,
                damage: result.damage_dealt,
                counter_damage: result.counter_damage,
            },
            if result.counter_damage > 0 {
                format!(
                    "{} hit {} for {}, took {} back",
                    result.attacker, result.defender, result.damage_dealt, result.counter_damage
                )
            } else {
                format!(
                    "{} hit {} for {}",
                    result.attacker, result.defender, result.damage_dealt
                )
            },
            self.turn_number,
        );

        for (died, unit) in [
            (result.defender_died, result.defender),
            (result.attacker_died, result.attacker),
        ] {
            if died {
                events.push(
                    BattleEventType::UnitDied { unit },
                    format!("{} died", unit),
                    self.turn_number,
                );
            }
        }
    }

    /// Spend the unit's action and run the termination check
    fn finish_action(&mut self, unit_id: UnitId, events: &mut BattleEventLog) {
        if let Some(unit) = self.field.get_unit_mut(unit_id) {
            unit.has_acted = true;
        }
        let side = self.current_side;
        if side == Side::Player {
            self.clear_selection(events);
        }
        events.push(
            BattleEventType::ActionFinished { unit: unit_id },
            format!("{} finished its action", unit_id),
            self.turn_number,
        );

        if self.check_battle_end(events) {
            return;
        }
        if side == Side::Player && self.field.player.all_acted() {
            self.run_enemy_turn(events);
        }
    }

    // ===== ENEMY TURN =====

    fn run_enemy_turn(&mut self, events: &mut BattleEventLog) {
        self.current_side = Side::Enemy;
        self.phase = BattlePhase::EnemyTurn;
        self.field.enemy.reset_actions();
        events.push(
            BattleEventType::TurnChanged {
                side: Side::Enemy,
                turn: self.turn_number,
            },
            format!("Turn {}: enemy", self.turn_number),
            self.turn_number,
        );

        for unit_id in self.field.enemy.ready_ids() {
            if self.is_finished() {
                return;
            }
            if !self.field.get_unit(unit_id).is_some_and(|u| u.can_act()) {
                continue;
            }
            self.run_ai_unit(unit_id, events);
            if self.is_finished() {
                return;
            }
        }

        self.turn_number += 1;
        if self.check_battle_end(events) {
            return;
        }
        self.start_player_turn(events);
    }

    fn run_ai_unit(&mut self, unit_id: UnitId, events: &mut BattleEventLog) {
        let plan = self.enemy_ai.plan_unit(&self.field, unit_id);

        if let Some(dest) = plan.move_to {
            if let Err(e) = self.move_unit(unit_id, dest, events) {
                tracing::warn!("AI move of {} failed: {}", unit_id, e);
            }
        }
        if let Some(target) = plan.target {
            match self.field.get_unit(target).filter(|u| u.alive) {
                Some(defender) => {
                    let cell = defender.position;
                    self.attack_cell(unit_id, cell, events);
                }
                None => tracing::warn!("AI target {} of {} is gone", target, unit_id),
            }
        }

        self.finish_action(unit_id, events);
    }

    fn start_player_turn(&mut self, events: &mut BattleEventLog) {
        self.current_side = Side::Player;
        self.phase = BattlePhase::PlayerSelect;
        self.field.player.reset_actions();
        events.push(
            BattleEventType::TurnChanged {
                side: Side::Player,
                turn: self.turn_number,
            },
            format!("Turn {}: player", self.turn_number),
            self.turn_number,
        );
    }

    // ===== TERMINATION =====

    /// End the battle if a side is wiped out or the turn cap is reached
    pub fn check_battle_end(&mut self, events: &mut BattleEventLog) -> bool {
        if self.is_finished() {
            return true;
        }
        match check_battle_end(&self.field, self.turn_number, self.config.max_turns) {
            Some(victory) => {
                self.end_battle(victory, events);
                true
            }
            None => false,
        }
    }

    fn end_battle(&mut self, victory: bool, events: &mut BattleEventLog) {
        self.phase = BattlePhase::Done;
        self.outcome = Some(victory);
        self.selected_unit = None;
        self.legal_move_cells.clear();
        self.legal_attack_cells.clear();

        tracing::info!(
            "Battle ended on turn {}: {}",
            self.turn_number,
            if victory { "victory" } else { "defeat" }
        );
        events.push(
            BattleEventType::BattleEnded { victory },
            format!("Battle ended: {}", if victory { "victory" } else { "defeat" }),
            self.turn_number,
        );

        if let Some(callback) = self.on_complete.take() {
            callback(BattleResult { victory });
        }
    }

    fn record(&mut self, events: &BattleEventLog) {
        self.battle_log.extend(events.events.iter().cloned());
    }
}

/// Decide the battle, if it is over
///
/// Victory when no enemy lives, defeat when no player unit lives. At the turn
/// cap the side with the larger summed hp fraction wins; ties go to the player.
pub fn check_battle_end(field: &Battlefield, turn: Turn, max_turns: Turn) -> Option<bool> {
    if !field.enemy.has_living() {
        return Some(true);
    }
    if !field.player.has_living() {
        return Some(false);
    }
    if turn >= max_turns {
        return Some(field.player.hp_fraction_sum() >= field.enemy.hp_fraction_sum());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::deployment::PositionHint;
    use crate::battle::unit_type::UnitType;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn start(units: Vec<PlayerUnitSpec>) -> BattleStart {
        BattleStart {
            player_units: units,
            enemy_power: 0.0,
            seed: Some(42),
        }
    }

    fn infantry_at(q: i32, r: i32) -> PlayerUnitSpec {
        PlayerUnitSpec::new(UnitType::Infantry, 100, 20)
            .at(PositionHint::Cell(GridCoord::new(q, r)))
    }

    fn battle(units: Vec<PlayerUnitSpec>) -> BattleState {
        BattleState::new(BattleConfig::default(), start(units)).unwrap()
    }

    #[test]
    fn test_new_battle_opens_player_turn() {
        let state = battle(vec![infantry_at(0, 4)]);
        assert_eq!(state.turn_number, 1);
        assert_eq!(state.current_side, Side::Player);
        assert_eq!(state.phase, BattlePhase::PlayerSelect);
        assert!(state.field.enemy.has_living());
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_empty_roster_rejected() {
        let result = BattleState::new(BattleConfig::default(), start(Vec::new()));
        assert!(matches!(result, Err(BattleError::EmptyRoster)));
    }

    #[test]
    fn test_select_own_unit_highlights() {
        let mut state = battle(vec![infantry_at(0, 4)]);
        let events = state.select_cell(GridCoord::new(0, 4));

        assert_eq!(state.phase, BattlePhase::PlayerMove);
        assert!(state.selected_unit.is_some());
        assert!(state.legal_move_cells.contains(&GridCoord::new(2, 4)));
        assert!(matches!(
            events.events[0].event_type,
            BattleEventType::UnitSelected { .. }
        ));
    }

    #[test]
    fn test_select_empty_cell_is_noop() {
        let mut state = battle(vec![infantry_at(0, 4)]);
        assert!(state.select_cell(GridCoord::new(4, 0)).is_empty());
        assert!(state.select_cell(GridCoord::new(-1, 3)).is_empty());
        assert_eq!(state.phase, BattlePhase::PlayerSelect);
    }

    #[test]
    fn test_move_without_targets_finishes_unit() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        let id = state.field.player.units[0].id;

        state.select_cell(GridCoord::new(0, 4));
        state.select_cell(GridCoord::new(2, 4));

        let unit = state.field.get_unit(id).unwrap();
        assert_eq!(unit.position, GridCoord::new(2, 4));
        assert!(unit.has_acted);
        assert_eq!(state.phase, BattlePhase::PlayerSelect);
        assert_eq!(state.current_side, Side::Player);
    }

    #[test]
    fn test_acted_unit_cannot_be_reselected() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        state.select_cell(GridCoord::new(0, 4));
        state.select_cell(GridCoord::new(1, 4));
        assert!(state.select_cell(GridCoord::new(1, 4)).is_empty());
        assert!(state.selected_unit.is_none());
    }

    #[test]
    fn test_illegal_cell_deselects() {
        let mut state = battle(vec![infantry_at(0, 4)]);
        state.select_cell(GridCoord::new(0, 4));
        state.select_cell(GridCoord::new(6, 0));
        assert_eq!(state.phase, BattlePhase::PlayerSelect);
        assert!(state.selected_unit.is_none());
        assert!(!state.field.player.units[0].has_acted);
    }

    #[test]
    fn test_reselect_other_unit_during_move() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        let second = state.field.player.units[1].id;
        state.select_cell(GridCoord::new(0, 4));
        state.select_cell(GridCoord::new(0, 0));
        assert_eq!(state.selected_unit, Some(second));
        assert_eq!(state.phase, BattlePhase::PlayerMove);
    }

    #[test]
    fn test_last_action_hands_turn_to_enemy_and_back() {
        let mut state = battle(vec![infantry_at(0, 4)]);
        state.select_cell(GridCoord::new(0, 4));
        let events = state.select_cell(GridCoord::new(1, 4));

        assert!(events.iter().any(|e| matches!(
            e.event_type,
            BattleEventType::TurnChanged {
                side: Side::Enemy,
                turn: 1
            }
        )));
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.current_side, Side::Player);
        assert!(state.field.player.units.iter().all(|u| !u.has_acted));
    }

    #[test]
    fn test_end_turn_advances_turn() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        state.end_turn();
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.phase, BattlePhase::PlayerSelect);
    }

    #[test]
    fn test_turn_cap_ends_battle() {
        let config = BattleConfig {
            max_turns: 3,
            ..BattleConfig::default()
        };
        let mut state = BattleState::new(config, start(vec![infantry_at(0, 0)])).unwrap();
        let mut guard = 0;
        while !state.is_finished() && guard < 10 {
            state.end_turn();
            guard += 1;
        }
        assert!(state.is_finished());
        assert!(state.turn_number <= 3);
    }

    #[test]
    fn test_callback_fires_once_and_events_stop() {
        let config = BattleConfig {
            max_turns: 2,
            ..BattleConfig::default()
        };
        let mut state = BattleState::new(config, start(vec![infantry_at(0, 0)])).unwrap();
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&results);
        state.on_complete(move |result| sink.borrow_mut().push(result));

        state.end_turn();
        assert!(state.is_finished());
        assert!(state.end_turn().is_empty());
        assert!(state.select_cell(GridCoord::new(0, 0)).is_empty());
        assert_eq!(results.borrow().len(), 1);
        assert_eq!(
            state
                .battle_log
                .iter()
                .filter(|e| matches!(e.event_type, BattleEventType::BattleEnded { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_late_callback_runs_immediately() {
        let config = BattleConfig {
            max_turns: 2,
            ..BattleConfig::default()
        };
        let mut state = BattleState::new(config, start(vec![infantry_at(0, 0)])).unwrap();
        state.end_turn();

        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        state.on_complete(move |result| *sink.borrow_mut() = Some(result));
        assert_eq!(*seen.borrow(), state.result());
    }

    #[test]
    fn test_check_battle_end_rules() {
        use crate::battle::units::BattleUnit;

        let mut field = Battlefield::new(BattleGrid::new(10, 8));
        for (id, side, q) in [(1, Side::Player, 0), (2, Side::Enemy, 9)] {
            field.roster_mut(side).push(BattleUnit::new(
                UnitId(id),
                side,
                UnitType::Infantry,
                GridCoord::new(q, 4),
                100,
                20,
            ));
        }

        assert_eq!(check_battle_end(&field, 1, 25), None);
        assert_eq!(check_battle_end(&field, 24, 25), None);
        // Equal strength at the cap goes to the player
        assert_eq!(check_battle_end(&field, 25, 25), Some(true));

        field.player.units[0].apply_damage(1);
        assert_eq!(check_battle_end(&field, 25, 25), Some(false));
        assert_eq!(check_battle_end(&field, 3, 25), None);

        field.enemy.units[0].apply_damage(2);
        assert_eq!(check_battle_end(&field, 25, 25), Some(true));

        field.enemy.units[0].kill();
        assert_eq!(check_battle_end(&field, 1, 25), Some(true));
        field.player.units[0].kill();
        assert_eq!(check_battle_end(&field, 1, 25), Some(true));
    }

    #[test]
    fn test_wiped_player_loses() {
        let mut state = battle(vec![infantry_at(0, 4)]);
        state.field.player.units[0].kill();
        assert_eq!(check_battle_end(&state.field, 1, 25), Some(false));
    }

    #[test]
    fn test_end_turn_reports_forfeited_units() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        let moved = state.field.player.units[0].id;
        let idle = state.field.player.units[1].id;
        state.select_cell(GridCoord::new(0, 4));
        state.select_cell(GridCoord::new(1, 4));

        let events = state.end_turn();
        let finished: Vec<UnitId> = events
            .iter()
            .take_while(|e| !matches!(e.event_type, BattleEventType::TurnChanged { .. }))
            .filter_map(|e| match e.event_type {
                BattleEventType::ActionFinished { unit } => Some(unit),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![idle]);
        assert!(!finished.contains(&moved));
    }

    #[test]
    fn test_battle_log_collects_requests() {
        let mut state = battle(vec![infantry_at(0, 4), infantry_at(0, 0)]);
        let before = state.battle_log.len();
        let events = state.select_cell(GridCoord::new(0, 4));
        assert_eq!(state.battle_log.len(), before + events.len());
    }
}
