//! Spell records, the slot economy, concentration, and spell resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ability::Ability;
use crate::character::Character;
use crate::checks::{self, CheckOutcome};
use crate::combat::attack::meets_ac;
use crate::conditions::{self, AttackStyle, Condition};
use crate::content::Catalog;
use crate::dice::{AdMode, DamageRoll, Dice, DiceExpr, Roll};
use crate::enemy::Enemy;
use crate::error::RulesError;
use crate::items::DamageType;
use crate::life::{self, DamageReport, EnemyDamageReport, HealReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    Abjuration,
    Conjuration,
    Divination,
    Enchantment,
    Evocation,
    Illusion,
    Necromancy,
    Transmutation,
}

/// What a successful saving throw does to the spell's damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveEffect {
    Half,
    #[default]
    Negates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDamage {
    pub dice: String,
    pub damage_type: DamageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub id: String,
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    pub school: SpellSchool,
    pub casting_time: String,
    pub range: String,
    pub components: String,
    pub duration: String,
    #[serde(default)]
    pub concentration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<SpellDamage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<Ability>,
    #[serde(default)]
    pub save_effect: SaveEffect,
    /// Resolved with a spell attack roll against AC.
    #[serde(default)]
    pub attack: bool,
    /// Condition imposed on a failed save (or a hit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflicts: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub higher_levels: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl Spell {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }

    pub fn needs_target(&self) -> bool {
        self.damage.is_some()
            || self.healing.is_some()
            || self.inflicts.is_some()
            || self.save.is_some()
            || self.attack
    }

    fn attack_style(&self) -> AttackStyle {
        if self.range.eq_ignore_ascii_case("touch") {
            AttackStyle::Melee
        } else {
            AttackStyle::Ranged
        }
    }
}

pub fn spell_save_dc(ch: &Character) -> Option<i32> {
    ch.spellcasting_mod()
        .map(|m| 8 + ch.proficiency_bonus + m)
}

pub fn spell_attack_bonus(ch: &Character) -> Option<i32> {
    ch.spellcasting_mod().map(|m| ch.proficiency_bonus + m)
}

/// Cantrip damage dice multiplier by caster level.
pub fn cantrip_tier(caster_level: u8) -> u32 {
    match caster_level {
        0..=4 => 1,
        5..=10 => 2,
        11..=16 => 3,
        _ => 4,
    }
}

/// Damage or healing notation after upcasting (one extra die per slot
/// level above the spell's) or cantrip scaling. Unparseable notation is
/// returned unchanged so the lenient roller can flag it.
pub fn scaled_notation(notation: &str, spell_level: u8, slot_level: Option<u8>, caster_level: u8) -> String {
    let expr = match DiceExpr::parse(notation) {
        Ok(expr) => expr,
        Err(err) => {
            warn!(%notation, error = %err, "spell notation does not parse");
            return notation.to_string();
        }
    };
    let scaled = if spell_level == 0 {
        expr.with_dice_multiplier(cantrip_tier(caster_level))
    } else {
        let extra = slot_level.map(|s| s.saturating_sub(spell_level)).unwrap_or(0);
        expr.with_extra_dice(extra as u32)
    };
    scaled.to_string()
}

/// Pick the slot a cast would use. `None` for cantrips.
pub fn resolve_slot(ch: &Character, spell: &Spell, slot_level: Option<u8>) -> Result<Option<u8>, RulesError> {
    if spell.is_cantrip() {
        return Ok(None);
    }
    match slot_level {
        Some(level) => {
            if !(1..=9).contains(&level) {
                return Err(RulesError::InvalidSlotLevel { level });
            }
            if level < spell.level {
                return Err(RulesError::SlotBelowSpellLevel {
                    spell: spell.id.clone(),
                    spell_level: spell.level,
                    slot_level: level,
                });
            }
            if ch.spell_slots.available(level) == 0 {
                return Err(RulesError::NoSpellSlot { level });
            }
            Ok(Some(level))
        }
        None => ch
            .spell_slots
            .lowest_available(spell.level)
            .map(Some)
            .ok_or(RulesError::NoSpellSlot { level: spell.level }),
    }
}

/// Cantrips always; leveled spells need a slot of their level or higher.
pub fn can_cast_spell(ch: &Character, spell: &Spell, slot_level: Option<u8>) -> bool {
    resolve_slot(ch, spell, slot_level).is_ok()
}

pub fn use_spell_slot(ch: &mut Character, level: u8) -> Result<(), RulesError> {
    if !(1..=9).contains(&level) {
        return Err(RulesError::InvalidSlotLevel { level });
    }
    if ch.spell_slots.use_slot(level) {
        Ok(())
    } else {
        Err(RulesError::NoSpellSlot { level })
    }
}

/// Start concentrating on `spell`, returning whatever was dropped for it.
pub fn begin_concentration(ch: &mut Character, spell: &str) -> Option<String> {
    let previous = ch.concentrating_on.replace(spell.to_string());
    if let Some(prev) = &previous {
        debug!(character = %ch.name, dropped = %prev, spell, "concentration replaced");
    }
    previous
}

pub fn end_concentration(ch: &mut Character) -> Option<String> {
    ch.concentrating_on.take()
}

pub fn concentration_dc(damage: i32) -> i32 {
    (damage / 2).max(10)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationCheck {
    pub spell: String,
    pub save: CheckOutcome,
    pub maintained: bool,
}

/// CON save after taking damage while concentrating. `damage` is the whole
/// hit, temporary hit points included. `None` when there was nothing to keep
/// up or no damage at all.
pub fn concentration_check(dice: &mut Dice, ch: &mut Character, damage: i32) -> Option<ConcentrationCheck> {
    if damage <= 0 {
        return None;
    }
    let spell = ch.concentrating_on.clone()?;
    let save = checks::saving_throw(dice, &*ch, Ability::Con, concentration_dc(damage), AdMode::Normal);
    let maintained = save.success;
    if !maintained {
        ch.concentrating_on = None;
    }
    debug!(character = %ch.name, %spell, dc = save.dc, maintained, "concentration check");
    Some(ConcentrationCheck {
        spell,
        save,
        maintained,
    })
}

/// Who a spell is aimed at.
#[derive(Debug)]
pub enum SpellTarget<'a> {
    None,
    Caster,
    Character(&'a mut Character),
    Enemy(&'a mut Enemy),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellAttackRoll {
    pub roll: Roll,
    pub target_ac: i32,
    pub hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedDamage {
    Character(DamageReport),
    Enemy(EnemyDamageReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastReport {
    pub caster: String,
    pub spell: String,
    pub slot_used: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<SpellAttackRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<CheckOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_roll: Option<DamageRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<AppliedDamage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing_roll: Option<DamageRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing: Option<HealReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_applied: Option<Condition>,
    #[serde(default)]
    pub concentration_started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration_dropped: Option<String>,
    /// The target's own concentration check, when a concentrating character was hurt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_concentration: Option<ConcentrationCheck>,
}

impl fmt::Display for CastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[CAST][{}] {}", self.caster, self.spell)?;
        if let Some(level) = self.slot_used {
            write!(f, " (slot {level})")?;
        }
        if let Some(a) = &self.attack {
            write!(
                f,
                " d20={} to-hit={} vs AC={} {}",
                a.roll.natural,
                a.roll.total,
                a.target_ac,
                if a.hit { "HIT" } else { "MISS" }
            )?;
        }
        if let Some(s) = &self.save {
            write!(
                f,
                " {} DC {} {}",
                s.kind,
                s.dc,
                if s.success { "saved" } else { "failed" }
            )?;
        }
        match &self.damage {
            Some(AppliedDamage::Character(d)) => write!(f, " → {} damage", d.amount)?,
            Some(AppliedDamage::Enemy(d)) => write!(f, " → {} {} damage", d.dealt, d.damage_type)?,
            None => {}
        }
        if let Some(h) = &self.healing {
            write!(f, " → heals {}", h.amount)?;
        }
        if let Some(c) = self.condition_applied {
            write!(f, " → {c}")?;
        }
        Ok(())
    }
}

/// Cast a spell. Every precondition is checked before anything changes, so
/// an error leaves caster and target as they were.
pub fn cast_spell(
    dice: &mut Dice,
    catalog: &Catalog,
    caster: &mut Character,
    spell_id: &str,
    slot_level: Option<u8>,
    mut target: SpellTarget<'_>,
) -> Result<CastReport, RulesError> {
    let spell = catalog
        .spell(spell_id)
        .ok_or_else(|| RulesError::UnknownSpell { id: spell_id.into() })?;
    let (Some(dc), Some(attack_bonus), Some(casting_mod)) = (
        spell_save_dc(caster),
        spell_attack_bonus(caster),
        caster.spellcasting_mod(),
    ) else {
        return Err(RulesError::NotASpellcaster {
            name: caster.name.clone(),
        });
    };
    if let Some(condition) = conditions::blocking_condition(&caster.conditions) {
        return Err(RulesError::CannotAct {
            name: caster.name.clone(),
            condition,
        });
    }
    if !caster.knows_spell(spell_id) {
        return Err(RulesError::SpellNotKnown {
            name: caster.name.clone(),
            spell: spell_id.into(),
        });
    }
    let slot = resolve_slot(caster, spell, slot_level)?;
    if spell.needs_target() && matches!(target, SpellTarget::None) {
        return Err(RulesError::MissingTarget {
            spell: spell_id.into(),
        });
    }
    match &target {
        SpellTarget::Caster if caster.is_dead() => {
            return Err(RulesError::TargetIsDead {
                name: caster.name.clone(),
            });
        }
        SpellTarget::Character(t) if t.is_dead() => {
            return Err(RulesError::TargetIsDead { name: t.name.clone() });
        }
        SpellTarget::Enemy(e) if e.is_defeated() => {
            return Err(RulesError::TargetIsDead { name: e.name.clone() });
        }
        _ => {}
    }

    // Committed from here on.
    if let Some(level) = slot {
        caster.spell_slots.use_slot(level);
    }
    let mut report = CastReport {
        caster: caster.name.clone(),
        spell: spell.id.clone(),
        slot_used: slot,
        attack: None,
        save: None,
        damage_roll: None,
        damage: None,
        healing_roll: None,
        healing: None,
        condition_applied: None,
        concentration_started: false,
        concentration_dropped: None,
        target_concentration: None,
    };
    if spell.concentration {
        report.concentration_dropped = begin_concentration(caster, &spell.id);
        report.concentration_started = true;
    }

    // Attack roll or saving throw decides whether the spell lands.
    let mut landed = true;
    let mut critical = false;
    let mut halve = false;
    if spell.attack {
        let (target_ac, target_conditions) = match &target {
            SpellTarget::Character(t) => (t.armor_class, t.conditions.clone()),
            SpellTarget::Enemy(e) => (e.armor_class, e.conditions.clone()),
            SpellTarget::Caster => (caster.armor_class, caster.conditions.clone()),
            SpellTarget::None => (10, Default::default()),
        };
        let mode = conditions::attack_vantage(&caster.conditions, &target_conditions, spell.attack_style()).resolve();
        let roll = dice.roll_expr(&DiceExpr::d20(attack_bonus), mode);
        let hit = meets_ac(roll.natural, roll.total, target_ac);
        critical = hit && roll.critical;
        landed = hit;
        report.attack = Some(SpellAttackRoll { roll, target_ac, hit });
    } else if let Some(ability) = spell.save {
        let save = match &target {
            SpellTarget::Character(t) => Some(checks::saving_throw(dice, &**t, ability, dc, AdMode::Normal)),
            SpellTarget::Enemy(e) => Some(checks::saving_throw(dice, &**e, ability, dc, AdMode::Normal)),
            SpellTarget::Caster => Some(checks::saving_throw(dice, &*caster, ability, dc, AdMode::Normal)),
            SpellTarget::None => None,
        };
        if let Some(save) = save {
            if save.success {
                match spell.save_effect {
                    SaveEffect::Half => halve = true,
                    SaveEffect::Negates => landed = false,
                }
            }
            report.save = Some(save);
        }
    }

    if let Some(dmg) = &spell.damage {
        if landed {
            let notation = scaled_notation(&dmg.dice, spell.level, slot, caster.level);
            let roll = dice.roll_damage(&notation, critical);
            let mut amount = roll.total;
            if halve {
                amount /= 2;
            }
            report.damage = match &mut target {
                SpellTarget::Enemy(e) => Some(AppliedDamage::Enemy(life::apply_damage_to_enemy(
                    e,
                    amount,
                    dmg.damage_type,
                ))),
                SpellTarget::Character(t) => {
                    let applied = life::apply_damage(t, amount, critical);
                    report.target_concentration = concentration_check(dice, t, applied.amount);
                    Some(AppliedDamage::Character(applied))
                }
                SpellTarget::Caster => {
                    let applied = life::apply_damage(caster, amount, critical);
                    report.target_concentration = concentration_check(dice, caster, applied.amount);
                    Some(AppliedDamage::Character(applied))
                }
                SpellTarget::None => None,
            };
            report.damage_roll = Some(roll);
        }
    }

    if let Some(healing) = &spell.healing {
        let notation = scaled_notation(healing, spell.level, slot, caster.level);
        let roll = dice.roll_damage(&notation, false);
        let amount = roll.total + casting_mod;
        report.healing = match &mut target {
            SpellTarget::Character(t) => Some(life::heal(t, amount)?),
            SpellTarget::Caster => Some(life::heal(caster, amount)?),
            SpellTarget::Enemy(e) => {
                let before = e.hp;
                e.hp = (e.hp + amount.max(0)).min(e.max_hp);
                Some(HealReport {
                    target: e.name.clone(),
                    amount: e.hp - before,
                    hp_before: before,
                    hp_after: e.hp,
                    overheal: amount.max(0) - (e.hp - before),
                    regained_consciousness: false,
                })
            }
            SpellTarget::None => None,
        };
        report.healing_roll = Some(roll);
    }

    if let Some(condition) = spell.inflicts {
        let failed_save = report.save.as_ref().map(|s| !s.success).unwrap_or(true);
        if landed && failed_save {
            match &mut target {
                SpellTarget::Character(t) => t.add_condition(condition),
                SpellTarget::Enemy(e) => {
                    e.conditions.insert(condition);
                }
                SpellTarget::Caster => caster.add_condition(condition),
                SpellTarget::None => {}
            }
            report.condition_applied = Some(condition);
        }
    }

    debug!(
        caster = %caster.name,
        spell = %spell.id,
        slot = ?slot,
        landed,
        "spell cast"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcasting_adds_a_die_per_level() {
        assert_eq!(scaled_notation("8d6", 3, Some(5), 9), "10d6");
        assert_eq!(scaled_notation("3d4+3", 1, Some(1), 1), "3d4+3");
    }

    #[test]
    fn cantrips_scale_by_caster_level() {
        assert_eq!(scaled_notation("1d10", 0, None, 1), "1d10");
        assert_eq!(scaled_notation("1d10", 0, None, 5), "2d10");
        assert_eq!(scaled_notation("1d10", 0, None, 11), "3d10");
        assert_eq!(scaled_notation("1d10", 0, None, 17), "4d10");
    }

    #[test]
    fn concentration_dc_has_a_floor() {
        assert_eq!(concentration_dc(14), 10);
        assert_eq!(concentration_dc(30), 15);
        assert_eq!(concentration_dc(21), 10);
        assert_eq!(concentration_dc(23), 11);
    }
}
