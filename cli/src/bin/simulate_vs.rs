use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use d20_cli::{init_tracing, io, presets};
use d20_engine::api;
use d20_engine::combat::attack::AttackOptions;
use d20_engine::combat::{CombatOutcome, ParticipantKind};
use d20_engine::{AdMode, Catalog, Character, CharacterClass, CombatState, Dice, LifeState, Race};
use tracing::debug;

#[derive(Parser)]
#[command(name = "simulate-vs")]
#[command(about = "Monte Carlo sim: one character against a group of bestiary monsters")]
struct Args {
    /// Bestiary ids to fight, repeat for several
    #[arg(long = "monster", default_values_t = vec!["goblin".to_string()])]
    monsters: Vec<String>,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on rounds per trial
    #[arg(long, default_value_t = 20)]
    max_rounds: u32,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Advantage mode for the character's attacks: normal | advantage | disadvantage
    #[arg(long, default_value = "normal")]
    adv: AdMode,

    /// Character JSON (if omitted, uses a sample character of --class)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Class of the sample character
    #[arg(long, default_value = "fighter")]
    class: CharacterClass,

    /// Level of the sample character
    #[arg(long, default_value_t = 1)]
    level: u8,

    /// Items/spells/monsters directory (defaults to the built-in catalog)
    #[arg(long)]
    content: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Default)]
struct Tally {
    wins: u32,
    defeats: u32,
    stalemates: u32,
    deaths: u32,
    hits: u32,
    crits: u32,
    misses: u32,
    damage_on_hits: i64,
    xp_total: u64,
    win_rounds: Vec<u32>,
}

impl Tally {
    fn record_attack(&mut self, hit: bool, critical: bool, damage: i32) {
        if hit {
            self.hits += 1;
            self.damage_on_hits += damage as i64;
            if critical {
                self.crits += 1;
            }
        } else {
            self.misses += 1;
        }
    }
}

/// First enemy still in the initiative order.
fn pick_target(combat: &CombatState) -> Option<String> {
    combat
        .initiative
        .iter()
        .find(|e| e.kind == ParticipantKind::Enemy)
        .map(|e| e.id.clone())
}

fn player_turn(
    dice: &mut Dice,
    catalog: &Catalog,
    combat: CombatState,
    pc: Character,
    mode: AdMode,
    tally: &mut Tally,
) -> Result<(CombatState, Character)> {
    match pc.life {
        LifeState::Dead | LifeState::Unconscious { stable: true } => return Ok((combat, pc)),
        LifeState::Unconscious { stable: false } => {
            let step = api::roll_death_save(dice, &pc)?;
            let mut combat = combat;
            combat.record(step.result.to_string());
            if step.result.dead {
                combat = api::remove_combatant(&combat, &step.state.id)?.state;
            }
            return Ok((combat, step.state));
        }
        LifeState::Conscious => {}
    }
    let Some(target) = pick_target(&combat) else {
        return Ok((combat, pc));
    };
    let opts = AttackOptions {
        mode,
        ..AttackOptions::default()
    };
    let step = api::attack(dice, catalog, &combat, &pc, None, &target, opts)?;
    let outcome = step.result;
    tally.record_attack(outcome.hit, outcome.critical, outcome.total_damage);
    let mut combat = step.state;
    if outcome.hit {
        combat = api::apply_damage_to_enemy(&combat, &target, outcome.total_damage, outcome.damage_type)?.state;
    }
    Ok((combat, pc))
}

fn enemy_turn(dice: &mut Dice, combat: CombatState, enemy_id: &str, pc: Character) -> Result<(CombatState, Character)> {
    if pc.is_dead() {
        return Ok((combat, pc));
    }
    let step = api::enemy_attack(dice, &combat, enemy_id, None, &pc, AdMode::Normal)?;
    let mut combat = step.state;
    if !step.result.hit {
        return Ok((combat, pc));
    }
    let hurt = api::apply_damage(dice, &pc, step.result.total_damage, step.result.critical);
    combat.record(hurt.result.report.to_string());
    let pc = hurt.state;
    if pc.is_dead() {
        combat = api::remove_combatant(&combat, &pc.id)?.state;
    }
    Ok((combat, pc))
}

fn run_trial(
    catalog: &Catalog,
    base: &Character,
    monsters: &[&str],
    seed: u64,
    max_rounds: u32,
    mode: AdMode,
    tally: &mut Tally,
) -> Result<()> {
    let mut dice = Dice::from_seed(seed);
    let mut pc = base.clone();
    let mut combat = api::start_combat(&mut dice, catalog, std::slice::from_ref(&pc), monsters, "arena")?;

    while combat.round <= max_rounds && combat.should_end().is_none() {
        let Some(current) = combat.current().cloned() else {
            break;
        };
        (combat, pc) = match current.kind {
            ParticipantKind::Player => player_turn(&mut dice, catalog, combat, pc, mode, tally)?,
            ParticipantKind::Enemy => enemy_turn(&mut dice, combat, &current.id, pc)?,
        };
        if combat.should_end().is_some() {
            break;
        }
        combat = api::advance_turn(&combat)?.state;
    }

    let rounds = combat.round;
    let end = api::end_combat(&combat, std::slice::from_ref(&pc), None)?;
    debug!(seed, outcome = %end.result.summary.outcome, rounds, "trial finished");
    match end.result.summary.outcome {
        CombatOutcome::Victory => {
            tally.wins += 1;
            tally.win_rounds.push(rounds);
        }
        CombatOutcome::Defeat => tally.defeats += 1,
        CombatOutcome::Withdrawn => tally.stalemates += 1,
    }
    if pc.is_dead() {
        tally.deaths += 1;
    }
    tally.xp_total += end.result.summary.xp_each as u64;
    Ok(())
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

fn median(sorted: &[u32]) -> u32 {
    if sorted.is_empty() {
        return 0;
    }
    let m = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[m]
    } else {
        (sorted[m - 1] + sorted[m]) / 2
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let loaded;
    let catalog: &Catalog = match &args.content {
        Some(dir) => {
            loaded = Catalog::from_dir(dir)?;
            &loaded
        }
        None => Catalog::builtin(),
    };

    let base = match args.file.as_ref() {
        Some(path) => io::load_json::<Character>(path)?,
        None => presets::sample_character(catalog, args.class, Race::Human, "Aria", args.level)?,
    };
    let monsters: Vec<&str> = args.monsters.iter().map(String::as_str).collect();

    let mut tally = Tally::default();
    for i in 0..args.trials {
        let trial_seed = args.seed.wrapping_add(i as u64);
        run_trial(catalog, &base, &monsters, trial_seed, args.max_rounds, args.adv, &mut tally)?;
    }

    tally.win_rounds.sort_unstable();
    let trials = args.trials as f64;
    let swings = (tally.hits + tally.misses) as f64;
    let avg_rounds = ratio(
        tally.win_rounds.iter().map(|&r| r as f64).sum::<f64>(),
        tally.win_rounds.len() as f64,
    );

    println!("simulate-vs results");
    println!("-------------------");
    println!("trials:             {}", args.trials);
    println!(
        "character:          {} (L{} {}, AC {}, HP {})",
        base.name, base.level, base.class, base.armor_class, base.hp.max
    );
    println!("opponents:          {}", args.monsters.join(", "));
    println!("advantage:          {}", args.adv);
    println!();
    println!("win rate:           {:.1}%", ratio(tally.wins as f64, trials) * 100.0);
    println!("defeat rate:        {:.1}%", ratio(tally.defeats as f64, trials) * 100.0);
    println!("stalemates:         {}", tally.stalemates);
    println!("deaths:             {}", tally.deaths);
    println!("hit rate:           {:.1}%", ratio(tally.hits as f64, swings) * 100.0);
    println!("crit rate:          {:.1}%", ratio(tally.crits as f64, tally.hits as f64) * 100.0);
    println!(
        "avg dmg per hit:    {:.2}",
        ratio(tally.damage_on_hits as f64, tally.hits as f64)
    );
    println!("avg rounds (wins):  {:.2}", avg_rounds);
    println!("median rounds:      {}", median(&tally.win_rounds));
    println!("avg xp per trial:   {:.1}", ratio(tally.xp_total as f64, trials));

    Ok(())
}
