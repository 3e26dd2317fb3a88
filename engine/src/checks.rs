use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::{Ability, AbilityScores, Skill};
use crate::conditions::{self, ConditionSet};
use crate::dice::{AdMode, Dice, DiceExpr, Roll};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    #[default]
    None,
    Proficient,
    Expertise,
}

/// Anything that can roll checks and saves: player characters and enemies.
pub trait Creature {
    fn name(&self) -> &str;
    fn abilities(&self) -> &AbilityScores;
    fn proficiency_bonus(&self) -> i32;
    fn conditions(&self) -> &ConditionSet;
    fn is_save_proficient(&self, ability: Ability) -> bool;
    fn skill_proficiency(&self, skill: Skill) -> Proficiency;

    fn ability_mod(&self, ability: Ability) -> i32 {
        self.abilities().mod_of(ability)
    }

    fn save_mod(&self, ability: Ability) -> i32 {
        let prof = if self.is_save_proficient(ability) {
            self.proficiency_bonus()
        } else {
            0
        };
        self.ability_mod(ability) + prof
    }

    fn skill_mod(&self, skill: Skill) -> i32 {
        let prof = match self.skill_proficiency(skill) {
            Proficiency::None => 0,
            Proficiency::Proficient => self.proficiency_bonus(),
            Proficiency::Expertise => self.proficiency_bonus() * 2,
        };
        self.ability_mod(skill.ability()) + prof
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckKind {
    Ability { ability: Ability },
    Skill { skill: Skill },
    Save { ability: Ability },
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Ability { ability } => write!(f, "{ability} check"),
            CheckKind::Skill { skill } => write!(f, "{skill} check"),
            CheckKind::Save { ability } => write!(f, "{ability} save"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub creature: String,
    pub kind: CheckKind,
    pub roll: Roll,
    pub modifier: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
    pub proficient: bool,
    pub expertise: bool,
    pub auto_failed: bool,
    pub mode: AdMode,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            CheckKind::Save { .. } => "SAVE",
            _ => "CHECK",
        };
        if self.auto_failed {
            return write!(
                f,
                "[{tag}][{}] {} DC {} → AUTO-FAIL",
                self.creature, self.kind, self.dc
            );
        }
        write!(
            f,
            "[{tag}][{}] {} DC {}: roll={} total={} → {}",
            self.creature,
            self.kind,
            self.dc,
            self.roll.natural,
            self.total,
            if self.success { "SUCCESS" } else { "FAIL" }
        )
    }
}

fn resolve<C: Creature + ?Sized>(
    dice: &mut Dice,
    creature: &C,
    kind: CheckKind,
    modifier: i32,
    dc: i32,
    mode: AdMode,
    proficiency: Proficiency,
) -> CheckOutcome {
    let roll = dice.roll_expr(&DiceExpr::d20(modifier), mode);
    let total = roll.total;
    let success = total >= dc;
    debug!(
        creature = creature.name(),
        check = %kind,
        natural = roll.natural,
        total,
        dc,
        ?mode,
        success,
        "check resolved"
    );
    CheckOutcome {
        creature: creature.name().to_string(),
        kind,
        roll,
        modifier,
        total,
        dc,
        success,
        proficient: proficiency != Proficiency::None,
        expertise: proficiency == Proficiency::Expertise,
        auto_failed: false,
        mode,
    }
}

pub fn ability_check<C: Creature + ?Sized>(
    dice: &mut Dice,
    creature: &C,
    ability: Ability,
    dc: i32,
    mode: AdMode,
) -> CheckOutcome {
    let mode = conditions::check_vantage(creature.conditions())
        .with(mode)
        .resolve();
    resolve(
        dice,
        creature,
        CheckKind::Ability { ability },
        creature.ability_mod(ability),
        dc,
        mode,
        Proficiency::None,
    )
}

pub fn skill_check<C: Creature + ?Sized>(
    dice: &mut Dice,
    creature: &C,
    skill: Skill,
    dc: i32,
    mode: AdMode,
) -> CheckOutcome {
    let mode = conditions::check_vantage(creature.conditions())
        .with(mode)
        .resolve();
    resolve(
        dice,
        creature,
        CheckKind::Skill { skill },
        creature.skill_mod(skill),
        dc,
        mode,
        creature.skill_proficiency(skill),
    )
}

pub fn saving_throw<C: Creature + ?Sized>(
    dice: &mut Dice,
    creature: &C,
    ability: Ability,
    dc: i32,
    mode: AdMode,
) -> CheckOutcome {
    let kind = CheckKind::Save { ability };
    let proficiency = if creature.is_save_proficient(ability) {
        Proficiency::Proficient
    } else {
        Proficiency::None
    };

    if conditions::auto_fails_save(creature.conditions(), ability) {
        debug!(creature = creature.name(), save = %ability, dc, "save auto-failed");
        return CheckOutcome {
            creature: creature.name().to_string(),
            kind,
            roll: Roll::zero("1d20"),
            modifier: 0,
            total: 0,
            dc,
            success: false,
            proficient: proficiency != Proficiency::None,
            expertise: false,
            auto_failed: true,
            mode: AdMode::Normal,
        };
    }

    let mode = conditions::save_vantage(creature.conditions(), ability)
        .with(mode)
        .resolve();
    resolve(
        dice,
        creature,
        kind,
        creature.save_mod(ability),
        dc,
        mode,
        proficiency,
    )
}
