//! Headless Battle Runner
//!
//! Plays battles with the scripted commander on both sides and prints
//! reports, for balancing enemy power against a roster.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use war_table::battle::{
    autoplay, sample_roster, AiCommander, BattleReport, BattleStart, BattleState, PlayerUnitSpec,
};
use war_table::core::{BattleConfig, BattleError, Result};

/// Headless Battle Runner - scripted player vs scripted enemy
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run autoplayed battles and output reports")]
struct Args {
    /// Enemy power scalar
    #[arg(long, default_value_t = 500.0)]
    power: f64,

    /// Seed of the first run; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Number of battles, played in parallel
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// JSON file with the player roster
    #[arg(long)]
    roster: Option<PathBuf>,

    /// TOML file overriding the battle rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
struct RunSummary {
    runs: usize,
    victories: usize,
    win_rate: f64,
    mean_turns: f64,
    reports: Vec<BattleReport>,
}

impl RunSummary {
    fn new(reports: Vec<BattleReport>) -> Self {
        let runs = reports.len();
        let victories = reports.iter().filter(|r| r.victory).count();
        let turns: u64 = reports.iter().map(|r| r.turns as u64).sum();
        let ratio = |n: f64| if runs > 0 { n / runs as f64 } else { 0.0 };
        Self {
            runs,
            victories,
            win_rate: ratio(victories as f64),
            mean_turns: ratio(turns as f64),
            reports,
        }
    }
}

fn play(
    config: &BattleConfig,
    roster: &[PlayerUnitSpec],
    power: f64,
    seed: u64,
) -> Result<BattleReport> {
    let mut state = BattleState::new(
        config.clone(),
        BattleStart {
            player_units: roster.to_vec(),
            enemy_power: power,
            seed: Some(seed),
        },
    )?;
    autoplay(&mut state, &mut AiCommander::new());
    BattleReport::from_state(&state).ok_or_else(|| {
        BattleError::InvalidConfig(format!("battle with seed {} did not finish", seed))
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("war_table=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BattleConfig::load(path)?,
        None => BattleConfig::default(),
    };
    let roster: Vec<PlayerUnitSpec> = match &args.roster {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => sample_roster(),
    };

    // Determine seed
    let base_seed = args.seed.unwrap_or_else(rand::random);

    let reports = (0..args.runs)
        .into_par_iter()
        .map(|i| play(&config, &roster, args.power, base_seed.wrapping_add(i)))
        .collect::<Result<Vec<_>>>()?;
    let summary = RunSummary::new(reports);

    match args.format.as_str() {
        "text" => print_text(&summary, args.power),
        format => {
            if format != "json" {
                eprintln!("Unknown format '{}', defaulting to json", format);
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn print_text(summary: &RunSummary, power: f64) {
    println!("Battle Results (enemy power {})", power);
    println!("=============");
    for report in &summary.reports {
        println!(
            "seed {:>20}  {:<7}  turns {:>2}  player {}/{} alive ({:.0}% hp)  enemy {}/{} alive ({:.0}% hp)",
            report.seed,
            if report.victory { "victory" } else { "defeat" },
            report.turns,
            report.player.survivors,
            report.player.deployed,
            report.player.hp_fraction * 100.0,
            report.enemy.survivors,
            report.enemy.deployed,
            report.enemy.hp_fraction * 100.0,
        );
    }
    println!();
    println!(
        "Won {}/{} ({:.1}%), mean {:.1} turns",
        summary.victories,
        summary.runs,
        summary.win_rate * 100.0,
        summary.mean_turns
    );
}
