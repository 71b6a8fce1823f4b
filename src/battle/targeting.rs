//! Target enumeration
//!
//! The grid is flat: no line of sight, no elevation. A target is any living
//! opposing unit within Manhattan range.

use crate::battle::grid::GridCoord;
use crate::battle::units::{BattleUnit, Battlefield, Side};

/// Living units opposing `side` within `range` of `from`, in roster order
pub fn attackable_enemies<'a>(
    field: &'a Battlefield,
    from: GridCoord,
    range: u32,
    side: Side,
) -> Vec<&'a BattleUnit> {
    field
        .roster(side.opponent())
        .living()
        .filter(|u| from.distance(&u.position) <= range)
        .collect()
}

/// Cells of every attackable enemy
pub fn attack_cells(field: &Battlefield, from: GridCoord, range: u32, side: Side) -> Vec<GridCoord> {
    attackable_enemies(field, from, range, side)
        .into_iter()
        .map(|u| u.position)
        .collect()
}
