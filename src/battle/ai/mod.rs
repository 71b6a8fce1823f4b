//! Opponent AI for battle decision-making
//!
//! The engine asks an AI for one plan per unit and applies it itself, so an
//! AI only ever reads the battlefield.

pub mod commander;
pub mod scoring;

pub use commander::{autoplay, play_player_turn, prioritized_targets, AiCommander};
pub use scoring::{BattleReport, SideSummary};

use serde::{Deserialize, Serialize};

use crate::battle::grid::GridCoord;
use crate::battle::units::Battlefield;
use crate::core::types::UnitId;

/// What one unit intends to do with its action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlan {
    pub unit: UnitId,
    /// Destination; expected to be free and within reach
    pub move_to: Option<GridCoord>,
    /// Enemy to attack after the move, if any is in range from there
    pub target: Option<UnitId>,
}

impl UnitPlan {
    /// Neither move nor attack
    pub fn hold(unit: UnitId) -> Self {
        Self {
            unit,
            move_to: None,
            target: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.move_to.is_none() && self.target.is_none()
    }
}

/// Trait for battle AI implementations
pub trait BattleAi {
    /// Decide the action of a single living unit
    fn plan_unit(&mut self, field: &Battlefield, unit_id: UnitId) -> UnitPlan;
}
