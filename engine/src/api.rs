//! State-in, state-out operations. Each call clones the state it is given,
//! applies one rules action and hands back the new state together with a
//! structured result. Inputs are never mutated, so a rejected action leaves
//! the caller's copy untouched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::{Ability, Skill};
use crate::character::Character;
use crate::checks::{self, CheckOutcome, Creature};
use crate::combat::attack::{self as combat_attack, AttackOptions, AttackOutcome, AttackTarget};
use crate::combat::{CombatOutcome, CombatState, CombatSummary, InitiativeEntry, TurnReport};
use crate::content::Catalog;
use crate::dice::{AdMode, Dice};
use crate::error::RulesError;
use crate::items::DamageType;
use crate::life::{self, DamageReport, DeathSaveReport, EnemyDamageReport, HealReport};
use crate::progression::{self, ExperienceReport, LevelUpReport, RestKind, RestReport};
use crate::spells::{self, CastReport, ConcentrationCheck, SpellTarget};

/// A new state plus what happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step<S, R> {
    pub state: S,
    pub result: R,
}

impl<S, R> Step<S, R> {
    fn new(state: S, result: R) -> Self {
        Self { state, result }
    }
}

pub fn roll_check(dice: &mut Dice, creature: &impl Creature, ability: Ability, dc: i32, mode: AdMode) -> CheckOutcome {
    checks::ability_check(dice, creature, ability, dc, mode)
}

pub fn roll_skill_check(dice: &mut Dice, creature: &impl Creature, skill: Skill, dc: i32, mode: AdMode) -> CheckOutcome {
    checks::skill_check(dice, creature, skill, dc, mode)
}

pub fn roll_save(dice: &mut Dice, creature: &impl Creature, ability: Ability, dc: i32, mode: AdMode) -> CheckOutcome {
    checks::saving_throw(dice, creature, ability, dc, mode)
}

fn require_active(combat: &CombatState) -> Result<(), RulesError> {
    if combat.is_active() {
        Ok(())
    } else {
        Err(RulesError::CombatNotActive)
    }
}

fn log_attack(combat: &mut CombatState, outcome: &AttackOutcome) {
    combat.record(outcome.to_string());
    if let Some(line) = outcome.damage_line() {
        combat.record(line);
    }
}

/// A character attacks an enemy in the encounter. Damage is rolled but not
/// applied; pass `result.total_damage` to [`apply_damage_to_enemy`].
pub fn attack(
    dice: &mut Dice,
    catalog: &Catalog,
    combat: &CombatState,
    attacker: &Character,
    weapon: Option<&str>,
    target_id: &str,
    opts: AttackOptions,
) -> Result<Step<CombatState, AttackOutcome>, RulesError> {
    require_active(combat)?;
    let enemy = combat
        .enemy(target_id)
        .ok_or_else(|| RulesError::UnknownCombatant { id: target_id.into() })?;
    if enemy.is_defeated() {
        return Err(RulesError::TargetIsDead {
            name: enemy.name.clone(),
        });
    }
    let outcome = combat_attack::make_attack(dice, catalog, attacker, weapon, &AttackTarget::from(enemy), opts)?;
    let mut next = combat.clone();
    log_attack(&mut next, &outcome);
    Ok(Step::new(next, outcome))
}

/// An enemy attacks a character. As with [`attack`], damage is only rolled.
pub fn enemy_attack(
    dice: &mut Dice,
    combat: &CombatState,
    enemy_id: &str,
    attack: Option<&str>,
    target: &Character,
    mode: AdMode,
) -> Result<Step<CombatState, AttackOutcome>, RulesError> {
    require_active(combat)?;
    let enemy = combat
        .enemy(enemy_id)
        .ok_or_else(|| RulesError::UnknownCombatant { id: enemy_id.into() })?;
    if target.is_dead() {
        return Err(RulesError::TargetIsDead {
            name: target.name.clone(),
        });
    }
    let outcome = combat_attack::enemy_attack(dice, enemy, attack, &AttackTarget::from(target), mode)?;
    let mut next = combat.clone();
    log_attack(&mut next, &outcome);
    Ok(Step::new(next, outcome))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDamage {
    #[serde(flatten)]
    pub report: DamageReport,
    /// Set when the character was concentrating and took damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration: Option<ConcentrationCheck>,
}

/// Damage a character. A concentrating character that still stands makes
/// the concentration save here.
pub fn apply_damage(dice: &mut Dice, ch: &Character, amount: i32, critical: bool) -> Step<Character, CharacterDamage> {
    let mut next = ch.clone();
    let report = life::apply_damage(&mut next, amount, critical);
    let concentration = if report.amount > 0 {
        spells::concentration_check(dice, &mut next, report.amount)
    } else {
        None
    };
    Step::new(next, CharacterDamage { report, concentration })
}

/// Damage an enemy in the encounter. A defeated enemy leaves the
/// initiative order but stays on the roster for the XP tally.
pub fn apply_damage_to_enemy(
    combat: &CombatState,
    enemy_id: &str,
    amount: i32,
    damage_type: DamageType,
) -> Result<Step<CombatState, EnemyDamageReport>, RulesError> {
    let mut next = combat.clone();
    let enemy = next
        .enemy_mut(enemy_id)
        .ok_or_else(|| RulesError::UnknownCombatant { id: enemy_id.into() })?;
    let report = life::apply_damage_to_enemy(enemy, amount, damage_type);
    next.record(report.to_string());
    drop_if_defeated(&mut next, enemy_id, report.defeated)?;
    Ok(Step::new(next, report))
}

fn drop_if_defeated(combat: &mut CombatState, id: &str, defeated: bool) -> Result<(), RulesError> {
    if defeated && combat.is_active() && combat.initiative.iter().any(|e| e.id == id) {
        combat.remove_combatant(id)?;
    }
    Ok(())
}

pub fn heal(ch: &Character, amount: i32) -> Result<Step<Character, HealReport>, RulesError> {
    let mut next = ch.clone();
    let report = life::heal(&mut next, amount)?;
    Ok(Step::new(next, report))
}

/// Who a cast is aimed at, by value.
#[derive(Debug, Clone, Copy)]
pub enum CastTarget<'a> {
    None,
    Caster,
    Character(&'a Character),
    Enemy { combat: &'a CombatState, id: &'a str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastStep {
    pub caster: Character,
    /// The other character, when one was targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Character>,
    /// The encounter, when an enemy was targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatState>,
    pub report: CastReport,
}

pub fn cast_spell(
    dice: &mut Dice,
    catalog: &Catalog,
    caster: &Character,
    spell_id: &str,
    slot_level: Option<u8>,
    target: CastTarget<'_>,
) -> Result<CastStep, RulesError> {
    let mut caster = caster.clone();
    match target {
        CastTarget::None | CastTarget::Caster => {
            let t = if matches!(target, CastTarget::Caster) {
                SpellTarget::Caster
            } else {
                SpellTarget::None
            };
            let report = spells::cast_spell(dice, catalog, &mut caster, spell_id, slot_level, t)?;
            Ok(CastStep {
                caster,
                target: None,
                combat: None,
                report,
            })
        }
        CastTarget::Character(other) => {
            let mut other = other.clone();
            let report = spells::cast_spell(
                dice,
                catalog,
                &mut caster,
                spell_id,
                slot_level,
                SpellTarget::Character(&mut other),
            )?;
            Ok(CastStep {
                caster,
                target: Some(other),
                combat: None,
                report,
            })
        }
        CastTarget::Enemy { combat, id } => {
            require_active(combat)?;
            let mut next = combat.clone();
            let enemy = next
                .enemy_mut(id)
                .ok_or_else(|| RulesError::UnknownCombatant { id: id.into() })?;
            let report = spells::cast_spell(
                dice,
                catalog,
                &mut caster,
                spell_id,
                slot_level,
                SpellTarget::Enemy(enemy),
            )?;
            let defeated = next.enemy(id).is_some_and(|e| e.is_defeated());
            next.record(report.to_string());
            drop_if_defeated(&mut next, id, defeated)?;
            Ok(CastStep {
                caster,
                target: None,
                combat: Some(next),
                report,
            })
        }
    }
}

pub fn roll_death_save(dice: &mut Dice, ch: &Character) -> Result<Step<Character, DeathSaveReport>, RulesError> {
    let mut next = ch.clone();
    let report = life::roll_death_save(dice, &mut next)?;
    Ok(Step::new(next, report))
}

/// Spawn the listed bestiary monsters and roll initiative for everyone.
pub fn start_combat(
    dice: &mut Dice,
    catalog: &Catalog,
    players: &[Character],
    monsters: &[&str],
    environment: &str,
) -> Result<CombatState, RulesError> {
    let mut combat = CombatState::new(environment);
    for id in monsters {
        let template = catalog
            .monster(id)
            .ok_or_else(|| RulesError::UnknownMonster { id: (*id).into() })?;
        combat.spawn_enemy(template)?;
    }
    combat.begin(dice, players)?;
    Ok(combat)
}

pub fn advance_turn(combat: &CombatState) -> Result<Step<CombatState, TurnReport>, RulesError> {
    let mut next = combat.clone();
    let report = next.advance_turn()?;
    Ok(Step::new(next, report))
}

pub fn remove_combatant(combat: &CombatState, id: &str) -> Result<Step<CombatState, InitiativeEntry>, RulesError> {
    let mut next = combat.clone();
    let removed = next.remove_combatant(id)?;
    Ok(Step::new(next, removed))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEnd {
    pub summary: CombatSummary,
    /// XP awarded to each party member that received a share, by id.
    pub experience: Vec<(String, ExperienceReport)>,
}

/// Close the encounter and hand each remaining player their XP share.
/// `outcome` overrides the detected one (e.g. a retreat).
pub fn end_combat(
    combat: &CombatState,
    party: &[Character],
    outcome: Option<CombatOutcome>,
) -> Result<Step<(CombatState, Vec<Character>), CombatEnd>, RulesError> {
    let mut next = combat.clone();
    let summary = next.end(outcome)?;
    let mut party = party.to_vec();
    let mut experience = Vec::new();
    for ch in party.iter_mut().filter(|c| summary.recipients.contains(&c.id)) {
        let report = progression::gain_experience(ch, summary.xp_each);
        experience.push((ch.id.clone(), report));
    }
    debug!(awarded = experience.len(), xp_each = summary.xp_each, "experience awarded");
    Ok(Step::new((next, party), CombatEnd { summary, experience }))
}

pub fn level_up(ch: &Character) -> Result<Step<Character, LevelUpReport>, RulesError> {
    let mut next = ch.clone();
    let report = progression::level_up(&mut next)?;
    Ok(Step::new(next, report))
}

pub fn rest(dice: &mut Dice, ch: &Character, kind: RestKind) -> Result<Step<Character, RestReport>, RulesError> {
    let mut next = ch.clone();
    let report = progression::rest(dice, &mut next, kind)?;
    Ok(Step::new(next, report))
}

/// Spend one use of a class feature; the result is the uses left, if limited.
pub fn use_feature(ch: &Character, id: &str) -> Result<Step<Character, Option<u8>>, RulesError> {
    let mut next = ch.clone();
    let left = progression::use_feature(&mut next, id)?;
    Ok(Step::new(next, left))
}
