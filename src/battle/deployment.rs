//! Initial placement of both rosters
//!
//! Player units with a slot hint fill a 3x3 block on the left edge, vertically
//! centred. Units without a usable hint are packed two per row from the left
//! edge; enemy units are packed the same way from the right edge.

use serde::{Deserialize, Serialize};

use crate::battle::army_gen::GeneratedUnit;
use crate::battle::grid::GridCoord;
use crate::battle::unit_type::UnitType;
use crate::battle::units::{BattleUnit, Battlefield, Side};
use crate::core::config::BattleConfig;
use crate::core::types::IdGenerator;

/// Where the caller would like a unit to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionHint {
    /// No preference; packed from the left edge
    #[default]
    None,
    /// Formation slot, row-major within the formation block
    Slot(u32),
    /// Explicit cell
    Cell(GridCoord),
}

fn default_count() -> u32 {
    1
}

fn default_level() -> u8 {
    1
}

/// One entry of the caller's roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUnitSpec {
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    #[serde(default)]
    pub position_hint: PositionHint,
    /// Per-member hp; the deployed unit has `hp * count`
    pub hp: u32,
    /// Per-member damage; the deployed unit has `damage * count`
    pub damage: u32,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Defaults to the unit type's mobility
    #[serde(default)]
    pub mobility: Option<u32>,
    /// Defaults to the unit type's range
    #[serde(default)]
    pub range: Option<u32>,
    #[serde(default = "default_level")]
    pub level: u8,
}

impl PlayerUnitSpec {
    pub fn new(unit_type: UnitType, hp: u32, damage: u32) -> Self {
        Self {
            unit_type,
            position_hint: PositionHint::None,
            hp,
            damage,
            count: 1,
            mobility: None,
            range: None,
            level: 1,
        }
    }

    pub fn at(mut self, hint: PositionHint) -> Self {
        self.position_hint = hint;
        self
    }

    pub fn with_reach(mut self, mobility: u32, range: u32) -> Self {
        self.mobility = Some(mobility);
        self.range = Some(range);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }
}

/// Mixed roster used by the drivers when the caller brings none
pub fn sample_roster() -> Vec<PlayerUnitSpec> {
    vec![
        PlayerUnitSpec::new(UnitType::Infantry, 60, 12)
            .with_count(2)
            .at(PositionHint::Slot(1)),
        PlayerUnitSpec::new(UnitType::Ranged, 40, 10).at(PositionHint::Slot(3)),
        PlayerUnitSpec::new(UnitType::Cavalry, 70, 16).at(PositionHint::Slot(4)),
        PlayerUnitSpec::new(UnitType::Magic, 35, 18).at(PositionHint::Slot(7)),
    ]
}

/// Cell `index` of `count` units packed two per row against the given edge columns
fn packed_cell(index: usize, count: usize, edge_cols: [i32; 2], rows: i32) -> GridCoord {
    let rows_needed = count.div_ceil(2) as i32;
    let start_row = (rows - rows_needed).max(0) / 2;
    GridCoord::new(edge_cols[index % 2], start_row + (index / 2) as i32)
}

/// First free cell scanning columns inward from one edge
fn first_free_cell(field: &Battlefield, from_left: bool) -> Option<GridCoord> {
    let cols = field.grid.cols;
    (0..cols)
        .map(|i| if from_left { i } else { cols - 1 - i })
        .flat_map(|q| (0..field.grid.rows).map(move |r| GridCoord::new(q, r)))
        .find(|cell| !field.is_occupied(*cell))
}

/// Use `preferred` if it is a free grid cell, otherwise the first free cell from the edge
fn resolve_cell(field: &Battlefield, preferred: GridCoord, from_left: bool) -> Option<GridCoord> {
    if field.grid.is_valid_cell(preferred) && !field.is_occupied(preferred) {
        return Some(preferred);
    }
    first_free_cell(field, from_left)
}

fn slot_cell(slot: u32, config: &BattleConfig) -> GridCoord {
    let slot = slot as i32;
    let start_row = (config.rows - config.formation_rows) / 2;
    GridCoord::new(
        slot % config.formation_cols,
        start_row + slot / config.formation_cols,
    )
}

/// Place the caller's roster. Returns the number of units deployed.
pub fn deploy_player_units(
    field: &mut Battlefield,
    ids: &mut IdGenerator,
    specs: &[PlayerUnitSpec],
    config: &BattleConfig,
) -> usize {
    let left_cols = [0, 1.min(config.cols - 1)];
    let mut deployed = 0;
    let mut packed: Vec<&PlayerUnitSpec> = Vec::new();

    let mut hinted: Vec<(&PlayerUnitSpec, GridCoord)> = Vec::new();
    for spec in specs {
        let cell = match spec.position_hint {
            PositionHint::Slot(slot) => slot_cell(slot, config),
            PositionHint::Cell(cell) => cell,
            PositionHint::None => {
                packed.push(spec);
                continue;
            }
        };
        if !field.grid.is_valid_cell(cell) {
            tracing::warn!(
                "Skipping {} unit: hinted cell ({}, {}) is off the grid",
                spec.unit_type,
                cell.q,
                cell.r
            );
            continue;
        }
        hinted.push((spec, cell));
    }

    let packed_count = packed.len();
    let placements = hinted.into_iter().chain(
        packed
            .into_iter()
            .enumerate()
            .map(|(i, spec)| (spec, packed_cell(i, packed_count, left_cols, config.rows))),
    );

    for (spec, preferred) in placements {
        let hp = spec.hp.saturating_mul(spec.count);
        let damage = spec.damage.saturating_mul(spec.count);
        if hp == 0 {
            tracing::warn!("Skipping {} unit with no hp", spec.unit_type);
            continue;
        }
        let Some(cell) = resolve_cell(field, preferred, true) else {
            tracing::warn!("Skipping {} unit: no free cell left", spec.unit_type);
            continue;
        };

        let defaults = spec.unit_type.default_properties();
        let unit = BattleUnit::new(
            ids.next_unit_id(),
            Side::Player,
            spec.unit_type,
            cell,
            hp,
            damage,
        )
        .with_reach(
            spec.mobility.unwrap_or(defaults.mobility),
            spec.range.unwrap_or(defaults.range),
        )
        .with_level(spec.level);
        field.player.push(unit);
        deployed += 1;
    }

    deployed
}

/// Place generated enemies against the right edge. Returns the number deployed.
pub fn deploy_enemy_units(
    field: &mut Battlefield,
    ids: &mut IdGenerator,
    units: &[GeneratedUnit],
    config: &BattleConfig,
) -> usize {
    let right_cols = [config.cols - 1, (config.cols - 2).max(0)];
    let mut deployed = 0;

    for (i, generated) in units.iter().enumerate() {
        let preferred = packed_cell(i, units.len(), right_cols, config.rows);
        let Some(cell) = resolve_cell(field, preferred, false) else {
            tracing::warn!("Skipping enemy {}: no free cell left", generated.unit_type);
            continue;
        };
        let unit = BattleUnit::new(
            ids.next_unit_id(),
            Side::Enemy,
            generated.unit_type,
            cell,
            generated.hp,
            generated.damage,
        )
        .with_reach(generated.mobility, generated.range);
        field.enemy.push(unit);
        deployed += 1;
    }

    deployed
}
