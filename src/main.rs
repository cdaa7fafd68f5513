//! Headless duel runner
//!
//! Pits two combatants against each other with no submitted moves, so every
//! round is fought by stance. Prints the narrative or one JSON round summary
//! per line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use crossguard::combat::combatant::Combatant;
use crossguard::combat::effects::EffectLibrary;
use crossguard::combat::stance::Stance;
use crossguard::combat::weapons::WeaponProfile;
use crossguard::core::{CombatConfig, CombatError, EncounterId, Result};
use crossguard::encounter::Encounter;

/// Headless duel runner - stance-driven fights for balance checks
#[derive(Parser, Debug)]
#[command(name = "crossguard")]
#[command(about = "Run a duel between two combatants and print every round")]
struct Args {
    /// First combatant's weapon
    #[arg(long, default_value = "longsword")]
    first: String,

    /// Second combatant's weapon
    #[arg(long, default_value = "axe")]
    second: String,

    /// Stance for both sides: offensive, defensive or balanced
    #[arg(long, default_value = "balanced")]
    stance: String,

    /// Stop after this many rounds even if both are standing
    #[arg(long, default_value_t = 50)]
    rounds: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Combat config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct DuelResult {
    rounds: u64,
    finished: bool,
    survivors: Vec<String>,
    seed: Option<u64>,
}

fn weapon_by_name(name: &str) -> Result<WeaponProfile> {
    let weapon = match name.to_ascii_lowercase().as_str() {
        "longsword" => WeaponProfile::longsword(),
        "greatsword" => WeaponProfile::greatsword(),
        "axe" => WeaponProfile::axe(),
        "battleaxe" => WeaponProfile::battleaxe(),
        "mace" => WeaponProfile::mace(),
        "warhammer" => WeaponProfile::warhammer(),
        "stave" => WeaponProfile::stave(),
        "dagger" => WeaponProfile::dagger(),
        "spear" => WeaponProfile::spear(),
        "longspear" => WeaponProfile::longspear(),
        "fists" => WeaponProfile::fists(),
        other => return Err(CombatError::Config(format!("unknown weapon '{other}'"))),
    };
    Ok(weapon)
}

fn stance_by_name(name: &str) -> Result<Stance> {
    match name.to_ascii_lowercase().as_str() {
        "offensive" => Ok(Stance::Offensive),
        "defensive" => Ok(Stance::Defensive),
        "balanced" => Ok(Stance::Balanced),
        other => Err(CombatError::Config(format!("unknown stance '{other}'"))),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("crossguard=info")
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let stance = stance_by_name(&args.stance)?;
    let first = Combatant::new("Aldric")
        .stance(stance)
        .armed_with(weapon_by_name(&args.first)?, true);
    let second = Combatant::new("Bryn")
        .stance(stance)
        .armed_with(weapon_by_name(&args.second)?, true);

    tracing::info!(first = %args.first, second = %args.second, "duel starting");

    let mut encounter = Encounter::start(
        EncounterId(1),
        config,
        Arc::new(EffectLibrary::standard()),
        first,
        second,
    );

    let json = args.format == "json";
    let mut fought = 0;
    while !encounter.is_finished() && fought < args.rounds {
        let summary = encounter.resolve_round()?;
        fought += 1;
        if json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("--- Round {} ---", summary.round);
            for line in summary.narrative() {
                println!("{line}");
            }
            for line in &summary.status {
                println!("  {line}");
            }
        }
    }

    let result = DuelResult {
        rounds: fought,
        finished: encounter.is_finished(),
        survivors: encounter.combatants().map(|c| c.name.clone()).collect(),
        seed: args.seed,
    };
    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!();
        println!("After {} rounds: {}", result.rounds, result.survivors.join(", "));
    }
    Ok(())
}
