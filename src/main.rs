//! War Table - Entry Point
//!
//! Plays one battle against the scripted AI from the terminal.
//! Usage: `war-table [enemy_power] [config.toml]`

use std::io::{self, Write};

use tracing_subscriber::EnvFilter;
use war_table::battle::{
    sample_roster, BattleEventLog, BattleStart, BattleState, GridCoord, Side,
};
use war_table::core::{BattleConfig, Result};

const DEFAULT_POWER: f64 = 500.0;

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("war_table=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let power = match args.next() {
        Some(arg) => arg.parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!("Could not parse enemy power '{}', using {}", arg, DEFAULT_POWER);
            DEFAULT_POWER
        }),
        None => DEFAULT_POWER,
    };
    let config = match args.next() {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };

    let mut state = BattleState::new(
        config,
        BattleStart {
            player_units: sample_roster(),
            enemy_power: power,
            seed: None,
        },
    )?;
    state.on_complete(|result| {
        println!();
        if result.victory {
            println!("*** VICTORY ***");
        } else {
            println!("*** DEFEAT ***");
        }
    });

    // Display welcome message
    println!("\n=== WAR TABLE ===");
    println!("Seed {} | enemy power {}", state.seed, power);
    println!();
    println!("Commands:");
    println!("  click <q> <r> / c  - Select a unit, a destination or a target");
    println!("  end / e            - End your turn");
    println!("  board / b          - Show the board");
    println!("  units / u          - List all units");
    println!("  quit / q           - Exit");
    println!();
    print_board(&state);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let mut words = input.split_whitespace();

        match words.next() {
            None => continue,
            Some("quit" | "q") => break,
            Some("board" | "b") => print_board(&state),
            Some("units" | "u") => print_units(&state),
            Some("end" | "e") => {
                print_events(&state.end_turn());
                print_board(&state);
            }
            Some("click" | "c") => {
                let q = words.next().and_then(|w| w.parse::<i32>().ok());
                let r = words.next().and_then(|w| w.parse::<i32>().ok());
                match (q, r) {
                    (Some(q), Some(r)) => {
                        print_events(&state.select_cell(GridCoord::new(q, r)));
                        print_board(&state);
                    }
                    _ => println!("Usage: click <q> <r>"),
                }
            }
            Some(_) => println!("Unknown command. Available: click <q> <r>, end, board, units, quit"),
        }

        if state.is_finished() {
            break;
        }
    }

    println!("\nGoodbye! Battle lasted {} turns.", state.turn_number);
    Ok(())
}

fn print_events(events: &BattleEventLog) {
    for event in events.iter() {
        println!("  [{}] {}", event.turn, event.description);
    }
}

/// Player units upper case, enemies lower case, `+` marks a legal move,
/// brackets mark the selection and attackable enemies
fn print_board(state: &BattleState) {
    let grid = &state.field.grid;
    let selected = state
        .selected_unit
        .and_then(|id| state.field.get_unit(id))
        .map(|u| u.position);

    println!();
    println!(
        "--- Turn {} | {} | {:?} ---",
        state.turn_number, state.current_side, state.phase
    );
    print!("   ");
    for q in 0..grid.cols {
        print!("{:^3}", q);
    }
    println!();

    for r in 0..grid.rows {
        print!("{:>2} ", r);
        for q in 0..grid.cols {
            let cell = GridCoord::new(q, r);
            let glyph = match state.field.unit_at(cell) {
                Some(unit) if unit.side == Side::Player => {
                    unit.unit_type.glyph().to_ascii_uppercase()
                }
                Some(unit) => unit.unit_type.glyph(),
                None if state.legal_move_cells.contains(&cell) => '+',
                None => '.',
            };
            if Some(cell) == selected || state.legal_attack_cells.contains(&cell) {
                print!("[{}]", glyph);
            } else {
                print!(" {} ", glyph);
            }
        }
        println!();
    }
    println!();
}

fn print_units(state: &BattleState) {
    for unit in state.field.units() {
        let status = if !unit.alive {
            "dead"
        } else if unit.has_acted {
            "done"
        } else {
            "ready"
        };
        println!(
            "  {:>4} {:<6} {:<10} ({}, {})  hp {:>4}/{:<4} dmg {:>3}  mov {} rng {}  {}",
            unit.id.to_string(),
            unit.side.to_string(),
            unit.unit_type.to_string(),
            unit.position.q,
            unit.position.r,
            unit.hp,
            unit.max_hp,
            unit.damage,
            unit.mobility,
            unit.range,
            status
        );
    }
}
