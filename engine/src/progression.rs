use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ability::{Ability, proficiency_bonus};
use crate::character::{Character, LifeState};
use crate::classes::{CasterKind, Recharge};
use crate::dice::Dice;
use crate::error::RulesError;
use crate::life;

pub const MAX_LEVEL: u8 = 20;

/// Experience needed to reach each level (index 0 = level 1).
pub const XP_THRESHOLDS: [u32; 20] = [
    0, 300, 900, 2_700, 6_500, 14_000, 23_000, 34_000, 48_000, 64_000, 85_000, 100_000, 120_000,
    140_000, 165_000, 195_000, 225_000, 265_000, 305_000, 355_000,
];

pub fn level_for_xp(xp: u32) -> u8 {
    XP_THRESHOLDS.iter().take_while(|&&t| xp >= t).count() as u8
}

pub fn xp_for_level(level: u8) -> u32 {
    XP_THRESHOLDS[(level.clamp(1, MAX_LEVEL) - 1) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceReport {
    pub gained: u32,
    pub total: u32,
    /// True when the new total unlocks a level the character has not taken yet.
    pub level_up_available: bool,
}

pub fn gain_experience(ch: &mut Character, amount: u32) -> ExperienceReport {
    ch.experience = ch.experience.saturating_add(amount);
    let available = ch.level < MAX_LEVEL && level_for_xp(ch.experience) > ch.level;
    debug!(character = %ch.name, amount, total = ch.experience, available, "experience gained");
    ExperienceReport {
        gained: amount,
        total: ch.experience,
        level_up_available: available,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpReport {
    pub character: String,
    pub new_level: u8,
    pub hp_gained: i32,
    pub new_max_hp: i32,
    pub proficiency_bonus: i32,
    pub new_features: Vec<String>,
    /// Slot maximums after the level (index 0 = 1st level).
    pub spell_slots: [u8; 9],
}

impl fmt::Display for LevelUpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[LEVEL][{}] reaches level {}: +{} HP (max {}), proficiency +{}",
            self.character, self.new_level, self.hp_gained, self.new_max_hp, self.proficiency_bonus
        )?;
        if !self.new_features.is_empty() {
            write!(f, ", new: {}", self.new_features.join(", "))?;
        }
        Ok(())
    }
}

/// Take one level. Refused unless experience supports it.
pub fn level_up(ch: &mut Character) -> Result<LevelUpReport, RulesError> {
    if ch.level >= MAX_LEVEL {
        return Err(RulesError::MaxLevel {
            name: ch.name.clone(),
        });
    }
    let next = ch.level + 1;
    if level_for_xp(ch.experience) < next {
        return Err(RulesError::InsufficientExperience {
            name: ch.name.clone(),
            level: next,
            needed: xp_for_level(next),
            current: ch.experience,
        });
    }
    Ok(apply_level(ch))
}

/// Level without the experience gate, for building higher-level characters.
pub fn advance_to_level(ch: &mut Character, level: u8) -> Vec<LevelUpReport> {
    let target = level.min(MAX_LEVEL);
    let mut reports = Vec::new();
    while ch.level < target {
        reports.push(apply_level(ch));
    }
    ch.experience = ch.experience.max(xp_for_level(ch.level));
    reports
}

fn apply_level(ch: &mut Character) -> LevelUpReport {
    ch.level += 1;
    let hp_gained = (ch.hit_dice.die as i32 / 2 + 1 + ch.abilities.mod_of(Ability::Con)).max(1);
    ch.hp.max += hp_gained;
    if !ch.is_dead() {
        let was_down = ch.hp.current == 0;
        ch.hp.current += hp_gained;
        if was_down {
            life::restore_consciousness(ch);
        }
    }
    ch.proficiency_bonus = proficiency_bonus(ch.level);
    let slots = ch.class.spell_slots(ch.level);
    if ch.class.caster_kind() != CasterKind::None {
        ch.spell_slots.set_max(slots);
    }
    let features = ch.class.features_at(ch.level);
    let new_features: Vec<String> = features.iter().map(|f| f.name.clone()).collect();
    ch.features.extend(features);
    ch.hit_dice.total += 1;
    ch.hit_dice.remaining += 1;

    info!(character = %ch.name, level = ch.level, hp_gained, "level up");
    LevelUpReport {
        character: ch.name.clone(),
        new_level: ch.level,
        hp_gained,
        new_max_hp: ch.hp.max,
        proficiency_bonus: ch.proficiency_bonus,
        new_features,
        spell_slots: slots,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestKind {
    /// Spend up to `hit_dice` hit dice.
    Short { hit_dice: u8 },
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestReport {
    pub character: String,
    pub kind: RestKind,
    pub hit_dice_spent: Vec<u32>,
    pub hp_regained: i32,
    pub hit_dice_recovered: u8,
    pub features_refreshed: Vec<String>,
    pub slots_restored: bool,
}

impl fmt::Display for RestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RestKind::Short { .. } => write!(
                f,
                "[REST][{}] short rest: spent {} hit dice, +{} HP",
                self.character,
                self.hit_dice_spent.len(),
                self.hp_regained
            ),
            RestKind::Long => write!(
                f,
                "[REST][{}] long rest: +{} HP, recovered {} hit dice",
                self.character, self.hp_regained, self.hit_dice_recovered
            ),
        }
    }
}

fn refresh_features(ch: &mut Character, long: bool) -> Vec<String> {
    let mut refreshed = Vec::new();
    for feature in &mut ch.features {
        if let Some(uses) = &mut feature.uses {
            let due = long || uses.recharge == Recharge::ShortRest;
            if due && uses.current < uses.max {
                uses.current = uses.max;
                refreshed.push(feature.id.clone());
            }
        }
    }
    refreshed
}

pub fn short_rest(dice: &mut Dice, ch: &mut Character, hit_dice: u8) -> Result<RestReport, RulesError> {
    if ch.is_dead() || matches!(ch.life, LifeState::Unconscious { .. }) {
        return Err(RulesError::CannotRest {
            name: ch.name.clone(),
            activity: "take a short rest".into(),
        });
    }
    let con = ch.abilities.mod_of(Ability::Con);
    let hp_before = ch.hp.current;
    let mut spent = Vec::new();
    for _ in 0..hit_dice {
        if ch.hit_dice.remaining == 0 || ch.hp.current >= ch.hp.max {
            break;
        }
        let face = dice.die(ch.hit_dice.die);
        ch.hit_dice.remaining -= 1;
        let healed = (face as i32 + con).max(1);
        ch.hp.current = (ch.hp.current + healed).min(ch.hp.max);
        spent.push(face);
    }
    let features_refreshed = refresh_features(ch, false);
    let slots_restored = ch.class.caster_kind() == CasterKind::Pact;
    if slots_restored {
        ch.spell_slots.restore_all();
    }
    debug!(character = %ch.name, spent = spent.len(), hp = ch.hp.current, "short rest");
    Ok(RestReport {
        character: ch.name.clone(),
        kind: RestKind::Short { hit_dice },
        hit_dice_spent: spent,
        hp_regained: ch.hp.current - hp_before,
        hit_dice_recovered: 0,
        features_refreshed,
        slots_restored,
    })
}

pub fn long_rest(ch: &mut Character) -> Result<RestReport, RulesError> {
    if ch.is_dead() {
        return Err(RulesError::CannotRest {
            name: ch.name.clone(),
            activity: "take a long rest".into(),
        });
    }
    let hp_before = ch.hp.current;
    ch.hp.current = ch.hp.max;
    ch.hp.temp = 0;
    let recover = (ch.hit_dice.total / 2).max(1);
    let before = ch.hit_dice.remaining;
    ch.hit_dice.remaining = (ch.hit_dice.remaining + recover).min(ch.hit_dice.total);
    ch.spell_slots.restore_all();
    let features_refreshed = refresh_features(ch, true);
    ch.conditions.clear();
    ch.death_saves = Default::default();
    ch.life = LifeState::Conscious;
    ch.concentrating_on = None;
    debug!(character = %ch.name, "long rest");
    Ok(RestReport {
        character: ch.name.clone(),
        kind: RestKind::Long,
        hit_dice_spent: Vec::new(),
        hp_regained: ch.hp.current - hp_before,
        hit_dice_recovered: ch.hit_dice.remaining - before,
        features_refreshed,
        slots_restored: true,
    })
}

pub fn rest(dice: &mut Dice, ch: &mut Character, kind: RestKind) -> Result<RestReport, RulesError> {
    match kind {
        RestKind::Short { hit_dice } => short_rest(dice, ch, hit_dice),
        RestKind::Long => long_rest(ch),
    }
}

/// Spend one use of a limited feature. Features without a use counter
/// always succeed. Returns the uses left.
pub fn use_feature(ch: &mut Character, id: &str) -> Result<Option<u8>, RulesError> {
    let name = ch.name.clone();
    let feature = ch
        .features
        .iter_mut()
        .find(|f| f.id == id)
        .ok_or_else(|| RulesError::UnknownFeature {
            name: name.clone(),
            id: id.into(),
        })?;
    match &mut feature.uses {
        None => Ok(None),
        Some(uses) if uses.current == 0 => Err(RulesError::FeatureExhausted {
            name,
            feature: id.into(),
        }),
        Some(uses) => {
            uses.current -= 1;
            Ok(Some(uses.current))
        }
    }
}
