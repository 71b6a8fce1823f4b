//! Unit hierarchy: BattleUnit → Roster → Battlefield
//!
//! A roster holds one side's units in deployment order. The battlefield owns
//! the grid plus both rosters and answers occupancy queries. Dead units stay
//! in their roster for bookkeeping but never occupy a cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battle::constants::MELEE_RANGE;
use crate::battle::grid::{BattleGrid, GridCoord};
use crate::battle::unit_type::UnitType;
use crate::core::error::{BattleError, Result};
use crate::core::types::UnitId;

/// One of the two opposing factions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => f.write_str("player"),
            Side::Enemy => f.write_str("enemy"),
        }
    }
}

/// A single combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub side: Side,
    pub unit_type: UnitType,
    /// Cosmetic tier, passed through for renderers
    pub level: u8,

    // Position
    pub position: GridCoord,

    // Stats
    pub hp: u32,
    pub max_hp: u32,
    pub damage: u32,
    pub mobility: u32,
    pub range: u32,

    // State
    pub has_acted: bool,
    pub alive: bool,
}

impl BattleUnit {
    /// Create a unit at full health with its type's default mobility and range
    pub fn new(
        id: UnitId,
        side: Side,
        unit_type: UnitType,
        position: GridCoord,
        hp: u32,
        damage: u32,
    ) -> Self {
        let props = unit_type.default_properties();
        Self {
            id,
            side,
            unit_type,
            level: 1,
            position,
            hp,
            max_hp: hp,
            damage,
            mobility: props.mobility,
            range: props.range,
            has_acted: false,
            alive: hp > 0,
        }
    }

    /// Override mobility and range
    pub fn with_reach(mut self, mobility: u32, range: u32) -> Self {
        self.mobility = mobility;
        self.range = range;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Melee units provoke counterattacks
    pub fn is_melee(&self) -> bool {
        self.range == MELEE_RANGE
    }

    /// Can this unit still take its action this turn?
    pub fn can_act(&self) -> bool {
        self.alive && !self.has_acted
    }

    /// Subtract hp, clamped at zero. Returns the hp actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// Mark the unit dead. Returns false if it was already dead.
    pub fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.hp = 0;
        true
    }

    /// Remaining hp as a fraction of max hp
    pub fn hp_fraction(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        self.hp as f64 / self.max_hp as f64
    }
}

/// Ordered collection of one side's units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub side: Side,
    pub units: Vec<BattleUnit>,
}

impl Roster {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            units: Vec::new(),
        }
    }

    pub fn push(&mut self, unit: BattleUnit) {
        self.units.push(unit);
    }

    pub fn living(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.iter().filter(|u| u.alive)
    }

    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    pub fn has_living(&self) -> bool {
        self.units.iter().any(|u| u.alive)
    }

    /// Has every living unit taken its action?
    pub fn all_acted(&self) -> bool {
        self.living().all(|u| u.has_acted)
    }

    /// Ids of living units that still have their action, in roster order
    pub fn ready_ids(&self) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.can_act())
            .map(|u| u.id)
            .collect()
    }

    pub fn reset_actions(&mut self) {
        for unit in self.units.iter_mut() {
            unit.has_acted = false;
        }
    }

    /// Sum of hp fractions over living units
    pub fn hp_fraction_sum(&self) -> f64 {
        self.living().map(|u| u.hp_fraction()).sum()
    }

    pub fn total_hp(&self) -> u32 {
        self.living().map(|u| u.hp).sum()
    }

    /// Get a unit by ID
    pub fn get_unit(&self, unit_id: UnitId) -> Option<&BattleUnit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    /// Get a mutable unit by ID
    pub fn get_unit_mut(&mut self, unit_id: UnitId) -> Option<&mut BattleUnit> {
        self.units.iter_mut().find(|u| u.id == unit_id)
    }
}

/// Grid plus both rosters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    pub grid: BattleGrid,
    pub player: Roster,
    pub enemy: Roster,
}

impl Battlefield {
    pub fn new(grid: BattleGrid) -> Self {
        Self {
            grid,
            player: Roster::new(Side::Player),
            enemy: Roster::new(Side::Enemy),
        }
    }

    pub fn roster(&self, side: Side) -> &Roster {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    pub fn roster_mut(&mut self, side: Side) -> &mut Roster {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// All units of both sides, player first
    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.player.units.iter().chain(self.enemy.units.iter())
    }

    /// The living unit standing on a cell, if any
    pub fn unit_at(&self, cell: GridCoord) -> Option<&BattleUnit> {
        self.units().find(|u| u.alive && u.position == cell)
    }

    pub fn is_occupied(&self, cell: GridCoord) -> bool {
        self.unit_at(cell).is_some()
    }

    /// Get a unit from either roster
    pub fn get_unit(&self, unit_id: UnitId) -> Option<&BattleUnit> {
        self.player
            .get_unit(unit_id)
            .or_else(|| self.enemy.get_unit(unit_id))
    }

    /// Get a mutable unit from either roster
    pub fn get_unit_mut(&mut self, unit_id: UnitId) -> Option<&mut BattleUnit> {
        if self.player.get_unit(unit_id).is_some() {
            self.player.get_unit_mut(unit_id)
        } else {
            self.enemy.get_unit_mut(unit_id)
        }
    }

    /// Borrow an attacker and a defender from opposite rosters at once
    pub fn pair_mut(
        &mut self,
        attacker_id: UnitId,
        defender_id: UnitId,
    ) -> Result<(&mut BattleUnit, &mut BattleUnit)> {
        let attacker_side = self
            .get_unit(attacker_id)
            .ok_or(BattleError::UnitNotFound(attacker_id))?
            .side;
        let defender_side = self
            .get_unit(defender_id)
            .ok_or(BattleError::UnitNotFound(defender_id))?
            .side;
        if attacker_side == defender_side {
            return Err(BattleError::SameSide {
                attacker: attacker_id,
                defender: defender_id,
            });
        }

        let (attacker_roster, defender_roster) = match attacker_side {
            Side::Player => (&mut self.player, &mut self.enemy),
            Side::Enemy => (&mut self.enemy, &mut self.player),
        };
        let attacker = attacker_roster
            .get_unit_mut(attacker_id)
            .ok_or(BattleError::UnitNotFound(attacker_id))?;
        let defender = defender_roster
            .get_unit_mut(defender_id)
            .ok_or(BattleError::UnitNotFound(defender_id))?;
        Ok((attacker, defender))
    }

    /// Relocate a living unit. The destination must be a free, valid cell.
    pub fn move_unit(&mut self, unit_id: UnitId, to: GridCoord) -> Result<()> {
        if !self.grid.is_valid_cell(to) {
            return Err(BattleError::InvalidCell(to));
        }
        if let Some(occupant) = self.unit_at(to) {
            if occupant.id != unit_id {
                return Err(BattleError::InvalidCell(to));
            }
        }
        let unit = self
            .get_unit_mut(unit_id)
            .ok_or(BattleError::UnitNotFound(unit_id))?;
        if !unit.alive {
            return Err(BattleError::UnitDead(unit_id));
        }
        unit.position = to;
        Ok(())
    }

    /// No two living units share a cell
    pub fn occupancy_is_exclusive(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.units()
            .filter(|u| u.alive)
            .all(|u| seen.insert(u.position))
    }
}
