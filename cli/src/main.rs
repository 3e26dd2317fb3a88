use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use d20_engine::api::{self, CastTarget};
use d20_engine::combat::attack::AttackOptions;
use d20_engine::progression::RestKind;
use d20_engine::{Ability, AdMode, Catalog, Character, CharacterClass, CombatState, Dice, Race, Skill};
use d20_cli::{init_tracing, io, presets};
use serde::Serialize;
use tracing::debug;

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

impl From<Adv> for AdMode {
    fn from(a: Adv) -> Self {
        match a {
            Adv::Normal => AdMode::Normal,
            Adv::Advantage => AdMode::Advantage,
            Adv::Disadvantage => AdMode::Disadvantage,
        }
    }
}

#[derive(Args, Clone, Copy)]
struct Roller {
    /// RNG seed for determinism
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Advantage mode
    #[arg(long, value_enum, default_value_t = Adv::Normal)]
    adv: Adv,
}

impl Roller {
    fn dice(&self) -> Dice {
        Dice::from_seed(self.seed)
    }

    fn mode(&self) -> AdMode {
        self.adv.into()
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll dice notation (e.g. 1d20+5, 2d6+1d4-1) one or more times
    Roll {
        #[arg(default_value = "1d20")]
        notation: String,
        #[command(flatten)]
        roller: Roller,
        /// Number of rolls
        #[arg(long, default_value_t = 1)]
        rolls: u32,
    },
    /// Roll damage, doubling the dice on a critical
    Damage {
        notation: String,
        #[arg(long)]
        crit: bool,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Print a ready-made level 1 character as JSON
    Sample {
        #[arg(long, default_value = "fighter")]
        class: CharacterClass,
        #[arg(long, default_value = "human")]
        race: Race,
        #[arg(long, default_value = "Aria")]
        name: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ability check against a DC
    Check {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        ability: Ability,
        #[arg(long)]
        dc: i32,
        #[command(flatten)]
        roller: Roller,
    },
    /// Skill check against a DC
    Skill {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        skill: Skill,
        #[arg(long)]
        dc: i32,
        #[command(flatten)]
        roller: Roller,
    },
    /// Saving throw against a DC
    Save {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        ability: Ability,
        #[arg(long)]
        dc: i32,
        #[command(flatten)]
        roller: Roller,
    },
    /// Damage a character
    Hurt {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        amount: i32,
        #[arg(long)]
        crit: bool,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Heal a character
    Heal {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        amount: i32,
    },
    /// Roll a death saving throw for a dying character
    DeathSave {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Cast a spell, optionally at another character or an enemy in an encounter
    Cast {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        spell: String,
        /// Slot level (defaults to the lowest that fits)
        #[arg(long)]
        slot: Option<u8>,
        /// Target the caster
        #[arg(long, conflicts_with_all = ["target", "enemy"])]
        on_self: bool,
        /// Character file of the target
        #[arg(long, conflicts_with = "enemy")]
        target: Option<PathBuf>,
        /// Enemy id in the encounter given by --combat
        #[arg(long, requires = "combat")]
        enemy: Option<String>,
        #[arg(long)]
        combat: Option<PathBuf>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Take a short or long rest
    Rest {
        #[arg(long)]
        file: PathBuf,
        /// Long rest instead of a short one
        #[arg(long)]
        long: bool,
        /// Hit dice to spend on a short rest
        #[arg(long, default_value_t = 1)]
        hit_dice: u8,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Take the next level if experience allows it
    LevelUp {
        #[arg(long)]
        file: PathBuf,
    },
    /// Spend one use of a class feature
    UseFeature {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        feature: String,
    },
    /// Start an encounter and roll initiative
    Encounter {
        /// Character files, one per party member
        #[arg(long = "party", required = true)]
        party: Vec<PathBuf>,
        /// Bestiary ids, repeat for several monsters
        #[arg(long = "monster", required = true)]
        monsters: Vec<String>,
        #[arg(long, default_value = "")]
        environment: String,
        /// Where to write the encounter state
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// A character attacks an enemy; damage is applied on a hit
    Attack {
        #[arg(long)]
        combat: PathBuf,
        #[arg(long)]
        file: PathBuf,
        /// Enemy id (e.g. goblin-1)
        #[arg(long)]
        target: String,
        /// Weapon id (defaults to the equipped weapon)
        #[arg(long)]
        weapon: Option<String>,
        #[arg(long)]
        two_handed: bool,
        /// Party members in the encounter (sneak attack needs an ally)
        #[arg(long, default_value_t = 1)]
        party_size: usize,
        #[command(flatten)]
        roller: Roller,
    },
    /// An enemy attacks a character; damage is applied on a hit
    EnemyAttack {
        #[arg(long)]
        combat: PathBuf,
        #[arg(long)]
        enemy: String,
        #[arg(long)]
        file: PathBuf,
        /// Attack name (defaults to the enemy's first)
        #[arg(long)]
        attack: Option<String>,
        #[command(flatten)]
        roller: Roller,
    },
    /// Advance the encounter to the next combatant
    NextTurn {
        #[arg(long)]
        combat: PathBuf,
    },
    /// End the encounter and award experience to the party
    EndCombat {
        #[arg(long)]
        combat: PathBuf,
        #[arg(long = "party")]
        party: Vec<PathBuf>,
    },
}

#[derive(Parser)]
#[command(name = "d20")]
#[command(about = "d20 rules engine harness")]
struct Cli {
    /// Print structured results as JSON instead of log lines
    #[arg(long, global = true)]
    json: bool,
    /// Do not write changed state back to the input files
    #[arg(long, global = true)]
    dry_run: bool,
    /// Load items/spells/monsters from this directory instead of the built-in catalog
    #[arg(long, global = true)]
    content: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

struct Output {
    json: bool,
    dry_run: bool,
}

impl Output {
    /// Print either the narration lines or the structured result.
    fn emit<R: Serialize>(&self, lines: &[String], result: &R) -> Result<()> {
        if self.json {
            io::print_json(result, false)
        } else {
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        debug!(path = %path.display(), "saving state");
        io::write_json(path, value)
    }
}

fn load_character(path: &Path) -> Result<Character> {
    io::load_json(path).with_context(|| format!("loading character from {}", path.display()))
}

fn load_combat(path: &Path) -> Result<CombatState> {
    io::load_json(path).with_context(|| format!("loading encounter from {}", path.display()))
}

/// Log lines added between two encounter states.
fn new_lines(before: &CombatState, after: &CombatState) -> Vec<String> {
    after.log.iter().skip(before.log.len()).cloned().collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loaded;
    let catalog: &Catalog = match &cli.content {
        Some(dir) => {
            loaded = Catalog::from_dir(dir)?;
            &loaded
        }
        None => Catalog::builtin(),
    };
    let out = Output {
        json: cli.json,
        dry_run: cli.dry_run,
    };

    match cli.cmd {
        Cmd::Roll { notation, roller, rolls } => {
            let mut dice = roller.dice();
            let mut results = Vec::with_capacity(rolls as usize);
            for _ in 0..rolls {
                results.push(dice.try_roll(&notation, roller.mode())?);
            }
            let lines: Vec<String> = results.iter().map(|r| r.to_string()).collect();
            out.emit(&lines, &results)?;
        }
        Cmd::Damage { notation, crit, seed } => {
            let mut dice = Dice::from_seed(seed);
            let roll = dice.try_roll_damage(&notation, crit)?;
            out.emit(&[roll.to_string()], &roll)?;
        }
        Cmd::Sample {
            class,
            race,
            name,
            level,
            out: path,
        } => {
            let pc = presets::sample_character(catalog, class, race, &name, level)?;
            match path {
                Some(path) => io::write_json(&path, &pc)?,
                None => io::print_json(&pc, true)?,
            }
        }
        Cmd::Check {
            file,
            ability,
            dc,
            roller,
        } => {
            let pc = load_character(&file)?;
            let res = api::roll_check(&mut roller.dice(), &pc, ability, dc, roller.mode());
            out.emit(&[res.to_string()], &res)?;
        }
        Cmd::Skill {
            file,
            skill,
            dc,
            roller,
        } => {
            let pc = load_character(&file)?;
            let res = api::roll_skill_check(&mut roller.dice(), &pc, skill, dc, roller.mode());
            out.emit(&[res.to_string()], &res)?;
        }
        Cmd::Save {
            file,
            ability,
            dc,
            roller,
        } => {
            let pc = load_character(&file)?;
            let res = api::roll_save(&mut roller.dice(), &pc, ability, dc, roller.mode());
            out.emit(&[res.to_string()], &res)?;
        }
        Cmd::Hurt {
            file,
            amount,
            crit,
            seed,
        } => {
            let pc = load_character(&file)?;
            let step = api::apply_damage(&mut Dice::from_seed(seed), &pc, amount, crit);
            let mut lines = vec![step.result.report.to_string()];
            if let Some(check) = &step.result.concentration {
                lines.push(check.save.to_string());
            }
            out.emit(&lines, &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::Heal { file, amount } => {
            let pc = load_character(&file)?;
            let step = api::heal(&pc, amount)?;
            out.emit(&[step.result.to_string()], &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::DeathSave { file, seed } => {
            let pc = load_character(&file)?;
            let step = api::roll_death_save(&mut Dice::from_seed(seed), &pc)?;
            out.emit(&[step.result.to_string()], &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::Cast {
            file,
            spell,
            slot,
            on_self,
            target,
            enemy,
            combat,
            seed,
        } => {
            let caster = load_character(&file)?;
            let other = target.as_deref().map(load_character).transpose()?;
            let encounter = combat.as_deref().map(load_combat).transpose()?;
            let aim = match (&other, &encounter, enemy.as_deref()) {
                (Some(pc), _, _) => CastTarget::Character(pc),
                (None, Some(state), Some(id)) => CastTarget::Enemy { combat: state, id },
                _ if on_self => CastTarget::Caster,
                _ => CastTarget::None,
            };
            let step = api::cast_spell(&mut Dice::from_seed(seed), catalog, &caster, &spell, slot, aim)?;
            out.emit(&[step.report.to_string()], &step.report)?;
            out.save(&file, &step.caster)?;
            if let (Some(path), Some(pc)) = (&target, &step.target) {
                out.save(path, pc)?;
            }
            if let (Some(path), Some(state)) = (&combat, &step.combat) {
                out.save(path, state)?;
            }
        }
        Cmd::Rest {
            file,
            long,
            hit_dice,
            seed,
        } => {
            let pc = load_character(&file)?;
            let kind = if long {
                RestKind::Long
            } else {
                RestKind::Short { hit_dice }
            };
            let step = api::rest(&mut Dice::from_seed(seed), &pc, kind)?;
            out.emit(&[step.result.to_string()], &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::LevelUp { file } => {
            let pc = load_character(&file)?;
            let step = api::level_up(&pc)?;
            out.emit(&[step.result.to_string()], &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::UseFeature { file, feature } => {
            let pc = load_character(&file)?;
            let step = api::use_feature(&pc, &feature)?;
            let line = match step.result {
                Some(left) => format!("[FEATURE][{}] {feature}: {left} use(s) left", pc.name),
                None => format!("[FEATURE][{}] {feature}", pc.name),
            };
            out.emit(&[line], &step.result)?;
            out.save(&file, &step.state)?;
        }
        Cmd::Encounter {
            party,
            monsters,
            environment,
            out: path,
            seed,
        } => {
            let players = party
                .iter()
                .map(|p| load_character(p))
                .collect::<Result<Vec<_>>>()?;
            let ids: Vec<&str> = monsters.iter().map(String::as_str).collect();
            let state = api::start_combat(&mut Dice::from_seed(seed), catalog, &players, &ids, &environment)?;
            out.emit(&state.log, &state.initiative)?;
            io::write_json(&path, &state)?;
        }
        Cmd::Attack {
            combat,
            file,
            target,
            weapon,
            two_handed,
            party_size,
            roller,
        } => {
            let state = load_combat(&combat)?;
            let pc = load_character(&file)?;
            let opts = AttackOptions {
                mode: roller.mode(),
                two_handed,
                party_size,
                sneak_attack_used: false,
            };
            let mut dice = roller.dice();
            let step = api::attack(&mut dice, catalog, &state, &pc, weapon.as_deref(), &target, opts)?;
            let mut next = step.state;
            if step.result.hit {
                next = api::apply_damage_to_enemy(&next, &target, step.result.total_damage, step.result.damage_type)?.state;
            }
            out.emit(&new_lines(&state, &next), &step.result)?;
            out.save(&combat, &next)?;
        }
        Cmd::EnemyAttack {
            combat,
            enemy,
            file,
            attack,
            roller,
        } => {
            let state = load_combat(&combat)?;
            let pc = load_character(&file)?;
            let mut dice = roller.dice();
            let step = api::enemy_attack(&mut dice, &state, &enemy, attack.as_deref(), &pc, roller.mode())?;
            let mut lines = new_lines(&state, &step.state);
            let mut hurt = pc.clone();
            if step.result.hit {
                let dmg = api::apply_damage(&mut dice, &pc, step.result.total_damage, step.result.critical);
                lines.push(dmg.result.report.to_string());
                if let Some(check) = &dmg.result.concentration {
                    lines.push(check.save.to_string());
                }
                hurt = dmg.state;
            }
            out.emit(&lines, &step.result)?;
            out.save(&combat, &step.state)?;
            out.save(&file, &hurt)?;
        }
        Cmd::NextTurn { combat } => {
            let state = load_combat(&combat)?;
            let step = api::advance_turn(&state)?;
            out.emit(&new_lines(&state, &step.state), &step.result)?;
            out.save(&combat, &step.state)?;
        }
        Cmd::EndCombat { combat, party } => {
            let state = load_combat(&combat)?;
            let players = party
                .iter()
                .map(|p| load_character(p))
                .collect::<Result<Vec<_>>>()?;
            let step = api::end_combat(&state, &players, None)?;
            let (next, members) = step.state;
            let mut lines = new_lines(&state, &next);
            for (id, xp) in &step.result.experience {
                let mut line = format!("[XP][{id}] +{} (total {})", xp.gained, xp.total);
                if xp.level_up_available {
                    line.push_str(", level up available");
                }
                lines.push(line);
            }
            out.emit(&lines, &step.result)?;
            out.save(&combat, &next)?;
            if members.len() != party.len() {
                bail!("party size changed while ending combat");
            }
            for (path, pc) in party.iter().zip(&members) {
                out.save(path, pc)?;
            }
        }
    }
    Ok(())
}
