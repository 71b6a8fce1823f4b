//! Property tests for grid, movement, combat and battle flow

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use war_table::battle::*;
use war_table::core::types::UnitId;
use war_table::core::BattleConfig;

fn cell() -> impl Strategy<Value = GridCoord> {
    (0..GRID_COLS, 0..GRID_ROWS).prop_map(|(q, r)| GridCoord::new(q, r))
}

fn unit_type() -> impl Strategy<Value = UnitType> {
    prop::sample::select(UnitType::all().to_vec())
}

/// Board with units at distinct cells; side alternates by the flag
fn field_from(units: &[(GridCoord, bool)]) -> Battlefield {
    let mut field = Battlefield::new(BattleGrid::new(GRID_COLS, GRID_ROWS));
    for (i, (cell, enemy)) in units.iter().enumerate() {
        if field.is_occupied(*cell) {
            continue;
        }
        let side = if *enemy { Side::Enemy } else { Side::Player };
        field.roster_mut(side).push(BattleUnit::new(
            UnitId(i as u32 + 1),
            side,
            UnitType::Infantry,
            *cell,
            100,
            20,
        ));
    }
    field
}

proptest! {
    #[test]
    fn prop_distance_is_symmetric(a in cell(), b in cell()) {
        prop_assert_eq!(a.distance(&b), b.distance(&a));
        prop_assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn prop_reachable_within_mobility_and_free(
        origin in cell(),
        mobility in 0u32..6,
        blockers in prop::collection::vec((cell(), any::<bool>()), 0..20),
    ) {
        let field = field_from(&blockers);
        let reachable = reachable_cells(&field, origin, mobility, Side::Player);
        for (cell, steps) in &reachable {
            prop_assert!(*steps <= mobility);
            prop_assert!(origin.distance(cell) <= *steps);
            prop_assert!(!field.is_occupied(*cell));
            prop_assert!(field.grid.is_valid_cell(*cell));
            prop_assert_ne!(*cell, origin);
        }
    }

    #[test]
    fn prop_paths_match_reachability(
        origin in cell(),
        blockers in prop::collection::vec((cell(), any::<bool>()), 0..20),
    ) {
        let field = field_from(&blockers);
        for (goal, steps) in reachable_cells(&field, origin, 4, Side::Player) {
            let path = find_path(&field, origin, goal, Side::Player).unwrap();
            prop_assert_eq!(path.len() as u32, steps);
            prop_assert_eq!(path.last(), Some(&goal));
        }
    }

    #[test]
    fn prop_attack_never_heals_or_underflows(
        attacker_type in unit_type(),
        attacker_hp in 1u32..500,
        defender_hp in 1u32..500,
        attacker_damage in 0u32..200,
        defender_damage in 0u32..200,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let at = GridCoord::new(0, 0);
        let mut attacker =
            BattleUnit::new(UnitId(1), Side::Player, attacker_type, at, attacker_hp, attacker_damage);
        let mut defender =
            BattleUnit::new(UnitId(2), Side::Enemy, UnitType::Infantry, at, defender_hp, defender_damage);

        let result = resolve_attack(&mut attacker, &mut defender, &CombatRules::default(), &mut rng).unwrap();

        prop_assert!(defender.hp <= defender_hp);
        prop_assert!(attacker.hp <= attacker_hp);
        prop_assert_eq!(defender.hp, defender_hp.saturating_sub(result.damage_dealt));
        prop_assert_eq!(result.defender_died, defender.hp == 0);
        prop_assert_eq!(defender.alive, defender.hp > 0);
        prop_assert_eq!(attacker.alive, attacker.hp > 0);
        if !attacker.is_melee() || result.defender_died {
            prop_assert_eq!(result.counter_damage, 0);
            prop_assert_eq!(attacker.hp, attacker_hp);
        }
    }

    #[test]
    fn prop_death_happens_once(hp in 0u32..100) {
        let mut unit = BattleUnit::new(UnitId(1), Side::Enemy, UnitType::Beasts, GridCoord::new(3, 3), hp, 5);
        let first = unit.kill();
        let snapshot = unit.clone();
        prop_assert!(!unit.kill());
        prop_assert_eq!(&unit, &snapshot);
        prop_assert_eq!(first, hp > 0);
    }

    #[test]
    fn prop_army_size_and_stats(power in 0.0f64..6000.0, seed in any::<u64>()) {
        let config = ArmyConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (min, max) = config.bracket_for(power);
        let army = generate_army(&config, power, &mut rng);

        prop_assert!(army.len() as u32 >= min.min(config.max_units));
        prop_assert!(army.len() as u32 <= max.min(config.max_units));
        prop_assert!(army.iter().all(|u| u.hp > 0 && u.damage > 0));
        prop_assert!(army[0].range == MELEE_RANGE);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_battles_end_within_turn_cap(
        seed in any::<u64>(),
        power in 0.0f64..4000.0,
        roster in prop::collection::vec((unit_type(), 10u32..200, 1u32..50), 1..7),
    ) {
        let player_units = roster
            .into_iter()
            .map(|(kind, hp, damage)| PlayerUnitSpec::new(kind, hp, damage))
            .collect();
        let mut state = BattleState::new(
            BattleConfig::default(),
            BattleStart { player_units, enemy_power: power, seed: Some(seed) },
        )
        .unwrap();

        let mut ai = AiCommander::new();
        while !state.is_finished() {
            let turn = state.turn_number;
            play_player_turn(&mut state, &mut ai);
            prop_assert!(state.field.occupancy_is_exclusive());
            prop_assert!(state.is_finished() || state.turn_number == turn + 1);
        }
        prop_assert!(state.turn_number <= state.config.max_turns);
        prop_assert!(state.outcome.is_some());
    }
}
