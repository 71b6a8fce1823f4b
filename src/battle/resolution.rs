//! Attack resolution: damage roll, melee counterattack, death
//!
//! This is the only place outside unit setup that changes hp or kills units.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::units::BattleUnit;
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::UnitId;

/// Numbers the resolver needs from the battle config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatRules {
    pub variance_min: f64,
    pub variance_max: f64,
    pub counter_factor: f64,
}

impl CombatRules {
    pub fn from_config(config: &BattleConfig) -> Self {
        Self {
            variance_min: config.damage_variance_min,
            variance_max: config.damage_variance_max,
            counter_factor: config.counter_damage_factor,
        }
    }

    /// Draw a damage multiplier uniformly from `[variance_min, variance_max)`
    pub fn roll_multiplier<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.variance_min >= self.variance_max {
            return self.variance_min;
        }
        rng.gen_range(self.variance_min..self.variance_max)
    }
}

impl Default for CombatRules {
    fn default() -> Self {
        Self::from_config(&BattleConfig::default())
    }
}

/// Outcome of one attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResult {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub damage_dealt: u32,
    pub counter_damage: u32,
    pub defender_died: bool,
    pub attacker_died: bool,
}

fn scaled(base: u32, factor: f64) -> u32 {
    (base as f64 * factor).floor().max(0.0) as u32
}

/// Resolve `attacker` hitting `defender`
///
/// A melee attacker whose target survives takes a counterattack at
/// `counter_factor` of the defender's damage with its own roll. Ranged attacks
/// are never countered.
pub fn resolve_attack<R: Rng + ?Sized>(
    attacker: &mut BattleUnit,
    defender: &mut BattleUnit,
    rules: &CombatRules,
    rng: &mut R,
) -> Result<AttackResult> {
    if attacker.side == defender.side {
        return Err(BattleError::SameSide {
            attacker: attacker.id,
            defender: defender.id,
        });
    }
    if !attacker.alive {
        return Err(BattleError::UnitDead(attacker.id));
    }
    if !defender.alive {
        return Err(BattleError::UnitDead(defender.id));
    }

    let damage_dealt = scaled(attacker.damage, rules.roll_multiplier(rng));
    defender.apply_damage(damage_dealt);

    let mut counter_damage = 0;
    if attacker.is_melee() && defender.hp > 0 {
        let multiplier = rules.roll_multiplier(rng);
        counter_damage = scaled(defender.damage, rules.counter_factor * multiplier);
        attacker.apply_damage(counter_damage);
    }

    let defender_died = defender.hp == 0 && defender.kill();
    let attacker_died = attacker.hp == 0 && attacker.kill();

    Ok(AttackResult {
        attacker: attacker.id,
        defender: defender.id,
        damage_dealt,
        counter_damage,
        defender_died,
        attacker_died,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::grid::GridCoord;
    use crate::battle::unit_type::UnitType;
    use crate::battle::units::Side;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unit(id: u32, side: Side, unit_type: UnitType, hp: u32, damage: u32) -> BattleUnit {
        BattleUnit::new(UnitId(id), side, unit_type, GridCoord::new(0, 0), hp, damage)
    }

    #[test]
    fn test_damage_within_variance() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let mut attacker = unit(1, Side::Player, UnitType::Ranged, 100, 50);
            let mut defender = unit(2, Side::Enemy, UnitType::Infantry, 1000, 20);
            let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng).unwrap();
            assert!((40..60).contains(&result.damage_dealt), "{}", result.damage_dealt);
            assert_eq!(defender.hp, 1000 - result.damage_dealt);
        }
    }

    #[test]
    fn test_melee_counter_when_defender_survives() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut attacker = unit(1, Side::Player, UnitType::Infantry, 100, 20);
        let mut defender = unit(2, Side::Enemy, UnitType::Infantry, 100, 20);

        let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng).unwrap();

        // 20 * 0.5 * [0.8, 1.2) floors into 8..=11
        assert!((8..=11).contains(&result.counter_damage));
        assert_eq!(attacker.hp, 100 - result.counter_damage);
        assert!(!result.defender_died && !result.attacker_died);
    }

    #[test]
    fn test_ranged_attack_never_countered() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut attacker = unit(1, Side::Player, UnitType::Ranged, 100, 20);
        let mut defender = unit(2, Side::Enemy, UnitType::Infantry, 100, 90);

        let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng).unwrap();
        assert_eq!(result.counter_damage, 0);
        assert_eq!(attacker.hp, 100);
    }

    #[test]
    fn test_no_counter_from_dead_defender() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut attacker = unit(1, Side::Player, UnitType::Infantry, 100, 50);
        let mut defender = unit(2, Side::Enemy, UnitType::Infantry, 10, 90);

        let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng).unwrap();
        assert!(result.defender_died);
        assert_eq!(result.counter_damage, 0);
        assert_eq!(defender.hp, 0);
        assert!(!defender.alive);
        assert_eq!(attacker.hp, 100);
    }

    #[test]
    fn test_attacker_can_die_to_counter() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut attacker = unit(1, Side::Enemy, UnitType::Cavalry, 5, 1);
        let mut defender = unit(2, Side::Player, UnitType::Constructs, 500, 100);

        let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng).unwrap();
        assert!(result.attacker_died);
        assert!(!attacker.alive);
        assert_eq!(attacker.hp, 0);
    }

    #[test]
    fn test_dead_units_cannot_fight() {
        let rules = CombatRules::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut attacker = unit(1, Side::Player, UnitType::Infantry, 100, 20);
        let mut defender = unit(2, Side::Enemy, UnitType::Infantry, 100, 20);
        defender.kill();

        let result = resolve_attack(&mut attacker, &mut defender, &rules, &mut rng);
        assert!(matches!(result, Err(BattleError::UnitDead(UnitId(2)))));
        assert_eq!(attacker.hp, 100);
    }

    #[test]
    fn test_fixed_multiplier_when_range_collapses() {
        let rules = CombatRules {
            variance_min: 1.0,
            variance_max: 1.0,
            counter_factor: 0.5,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        assert_eq!(rules.roll_multiplier(&mut rng), 1.0);
    }
}
