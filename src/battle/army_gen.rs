//! Enemy army generation from a power scalar
//!
//! Power picks a unit-count bracket, unlocks higher-tier templates, and scales
//! every template's base hp and damage. The first slot always draws from melee
//! templates when any are unlocked.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    ENEMY_BASE_DAMAGE, ENEMY_BASE_HP, ENEMY_DAMAGE_PER_POWER, ENEMY_HP_PER_POWER,
    FALLBACK_MAX_UNITS, FALLBACK_MIN_UNITS, MAX_ENEMY_UNITS, MELEE_RANGE,
};
use crate::battle::unit_type::UnitType;
use crate::core::error::{BattleError, Result};

/// Unit count range for powers up to `max_power`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerBracket {
    pub max_power: f64,
    pub min_units: u32,
    pub max_units: u32,
}

impl PowerBracket {
    pub const fn new(max_power: f64, min_units: u32, max_units: u32) -> Self {
        Self {
            max_power,
            min_units,
            max_units,
        }
    }
}

/// A kind of enemy unit the generator can field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub unit_type: UnitType,
    pub hp_factor: f64,
    pub damage_factor: f64,
    pub mobility: u32,
    pub range: u32,
    /// Template is only drawn when power >= min_power
    pub min_power: f64,
}

impl EnemyTemplate {
    pub fn is_melee(&self) -> bool {
        self.range == MELEE_RANGE
    }
}

/// Enemy army generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmyConfig {
    /// Ordered by ascending max_power; the first bracket covering power wins
    pub brackets: Vec<PowerBracket>,
    /// Bracket for power beyond the table
    pub fallback_min_units: u32,
    pub fallback_max_units: u32,
    /// Hard cap on generated units
    pub max_units: u32,

    pub base_hp: f64,
    pub hp_per_power: f64,
    pub base_damage: f64,
    pub damage_per_power: f64,

    pub pool: Vec<EnemyTemplate>,
}

impl Default for ArmyConfig {
    fn default() -> Self {
        Self {
            brackets: vec![
                PowerBracket::new(300.0, 1, 2),
                PowerBracket::new(500.0, 2, 3),
                PowerBracket::new(900.0, 3, 4),
                PowerBracket::new(1400.0, 4, 5),
                PowerBracket::new(1900.0, 5, 6),
                PowerBracket::new(2300.0, 6, 7),
                PowerBracket::new(2900.0, 7, 8),
                PowerBracket::new(3500.0, 8, 9),
            ],
            fallback_min_units: FALLBACK_MIN_UNITS,
            fallback_max_units: FALLBACK_MAX_UNITS,
            max_units: MAX_ENEMY_UNITS,
            base_hp: ENEMY_BASE_HP,
            hp_per_power: ENEMY_HP_PER_POWER,
            base_damage: ENEMY_BASE_DAMAGE,
            damage_per_power: ENEMY_DAMAGE_PER_POWER,
            pool: default_pool(),
        }
    }
}

fn template(
    unit_type: UnitType,
    hp_factor: f64,
    damage_factor: f64,
    min_power: f64,
) -> EnemyTemplate {
    let props = unit_type.default_properties();
    EnemyTemplate {
        unit_type,
        hp_factor,
        damage_factor,
        mobility: props.mobility,
        range: props.range,
        min_power,
    }
}

/// Tiered reference pool. Alchemists fight in melee when fielded by the enemy.
fn default_pool() -> Vec<EnemyTemplate> {
    vec![
        template(UnitType::Infantry, 1.0, 1.0, 0.0),
        template(UnitType::Ranged, 0.5, 0.7, 0.0),
        template(UnitType::Cavalry, 0.8, 1.1, 600.0),
        template(UnitType::Beasts, 0.7, 1.3, 2500.0),
        template(UnitType::Magic, 0.5, 1.2, 1100.0),
        EnemyTemplate {
            mobility: 2,
            range: 1,
            ..template(UnitType::Alchemists, 0.6, 1.5, 1700.0)
        },
        template(UnitType::Constructs, 2.5, 1.0, 2800.0),
    ]
}

impl ArmyConfig {
    /// Unit count range for a power level
    pub fn bracket_for(&self, power: f64) -> (u32, u32) {
        self.brackets
            .iter()
            .find(|b| power <= b.max_power)
            .map(|b| (b.min_units, b.max_units))
            .unwrap_or((self.fallback_min_units, self.fallback_max_units))
    }

    /// Templates unlocked at a power level
    pub fn available(&self, power: f64) -> Vec<&EnemyTemplate> {
        self.pool.iter().filter(|t| power >= t.min_power).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool.is_empty() {
            return Err(BattleError::InvalidConfig("enemy pool is empty".into()));
        }
        if !self.pool.iter().any(|t| t.min_power <= 0.0) {
            return Err(BattleError::InvalidConfig(
                "no enemy template is available at power 0".into(),
            ));
        }
        if self.max_units == 0 {
            return Err(BattleError::InvalidConfig("max_units must be positive".into()));
        }
        let ranges = self
            .brackets
            .iter()
            .map(|b| (b.min_units, b.max_units))
            .chain(std::iter::once((
                self.fallback_min_units,
                self.fallback_max_units,
            )));
        for (min, max) in ranges {
            if min == 0 || min > max {
                return Err(BattleError::InvalidConfig(format!(
                    "unit count bracket [{min}, {max}] is empty"
                )));
            }
        }
        if self
            .brackets
            .windows(2)
            .any(|pair| pair[0].max_power >= pair[1].max_power)
        {
            return Err(BattleError::InvalidConfig(
                "power brackets must be sorted by ascending max_power".into(),
            ));
        }
        Ok(())
    }
}

/// A generated enemy unit, ready for deployment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratedUnit {
    pub unit_type: UnitType,
    pub hp: u32,
    pub damage: u32,
    pub mobility: u32,
    pub range: u32,
}

/// Clamp power into the non-negative reals
pub fn sanitize_power(power: f64) -> f64 {
    if power.is_finite() && power >= 0.0 {
        power
    } else {
        tracing::warn!("Enemy power {} is not a non-negative number, using 0", power);
        0.0
    }
}

/// Build a randomized enemy roster for `power`
pub fn generate_army<R: Rng + ?Sized>(
    config: &ArmyConfig,
    power: f64,
    rng: &mut R,
) -> Vec<GeneratedUnit> {
    let power = sanitize_power(power);
    let (min_units, max_units) = config.bracket_for(power);
    let count = rng.gen_range(min_units..=max_units.max(min_units)).min(config.max_units);

    let available = config.available(power);
    let melee: Vec<&EnemyTemplate> = available.iter().copied().filter(|t| t.is_melee()).collect();

    let base_hp = config.base_hp + power * config.hp_per_power;
    let base_damage = config.base_damage + power * config.damage_per_power;

    let mut units = Vec::with_capacity(count as usize);
    for slot in 0..count {
        let pool = if slot == 0 && !melee.is_empty() {
            &melee
        } else {
            &available
        };
        let Some(t) = pool.choose(rng) else {
            break;
        };
        units.push(GeneratedUnit {
            unit_type: t.unit_type,
            hp: ((base_hp * t.hp_factor).floor() as u32).max(1),
            damage: ((base_damage * t.damage_factor).floor() as u32).max(1),
            mobility: t.mobility,
            range: t.range,
        });
    }

    tracing::debug!(
        "Generated {} enemy units for power {:.0} ({} templates unlocked)",
        units.len(),
        power,
        available.len()
    );
    units
}
