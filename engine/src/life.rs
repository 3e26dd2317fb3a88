use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::{Character, DeathSaves, LifeState};
use crate::conditions::Condition;
use crate::dice::{AdMode, Dice};
use crate::enemy::Enemy;
use crate::error::RulesError;
use crate::items::DamageType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub target: String,
    pub amount: i32,
    pub absorbed_by_temp: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub dropped_to_zero: bool,
    pub massive_damage: bool,
    pub killed: bool,
    /// Death-save failures added by damage taken at 0 HP.
    pub death_save_failures: u8,
}

impl fmt::Display for DamageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DMG][{}] {} → {} (−{})",
            self.target, self.hp_before, self.hp_after, self.amount
        )?;
        if self.absorbed_by_temp > 0 {
            write!(f, " temp absorbed {}", self.absorbed_by_temp)?;
        }
        if self.killed {
            write!(f, " → DEAD")?;
            if self.massive_damage {
                write!(f, " (massive damage)")?;
            }
        } else if self.dropped_to_zero {
            write!(f, " → Unconscious")?;
        } else if self.death_save_failures > 0 {
            write!(f, " → {} death save failure(s)", self.death_save_failures)?;
        }
        Ok(())
    }
}

/// Apply damage to a character and handle drop-to-0 transitions.
pub fn apply_damage(ch: &mut Character, amount: i32, critical: bool) -> DamageReport {
    let amount = amount.max(0);
    let hp_before = ch.hp.current;
    let mut report = DamageReport {
        target: ch.name.clone(),
        amount,
        absorbed_by_temp: 0,
        hp_before,
        hp_after: hp_before,
        dropped_to_zero: false,
        massive_damage: false,
        killed: false,
        death_save_failures: 0,
    };
    if ch.is_dead() || amount == 0 {
        return report;
    }

    let absorbed = amount.min(ch.hp.temp);
    ch.hp.temp -= absorbed;
    report.absorbed_by_temp = absorbed;
    let remaining = amount - absorbed;
    if remaining == 0 {
        return report;
    }

    if hp_before == 0 {
        // Already down: every hit is a failed death save, a crit is two.
        let failures = if critical { 2 } else { 1 };
        if remaining >= ch.hp.max {
            report.massive_damage = true;
            kill(ch);
        } else {
            ch.death_saves.failures = (ch.death_saves.failures + failures).min(3);
            report.death_save_failures = failures;
            if ch.death_saves.failures >= 3 {
                kill(ch);
            } else {
                ch.life = LifeState::Unconscious { stable: false };
            }
        }
        report.killed = ch.is_dead();
        debug!(character = %ch.name, remaining, failures = ch.death_saves.failures, "damage at 0 HP");
        return report;
    }

    let after = hp_before - remaining;
    if after <= -ch.hp.max {
        ch.hp.current = 0;
        report.massive_damage = true;
        report.dropped_to_zero = true;
        kill(ch);
    } else if after <= 0 {
        ch.hp.current = 0;
        report.dropped_to_zero = true;
        ch.life = LifeState::Unconscious { stable: false };
        ch.death_saves = DeathSaves::default();
        ch.add_condition(Condition::Unconscious);
        ch.add_condition(Condition::Prone);
    } else {
        ch.hp.current = after;
    }
    report.hp_after = ch.hp.current;
    report.killed = ch.is_dead();
    debug!(
        character = %ch.name,
        hp_before,
        hp = ch.hp.current,
        damage = amount,
        state = ?ch.life,
        "damage applied"
    );
    report
}

fn kill(ch: &mut Character) {
    ch.hp.current = 0;
    ch.life = LifeState::Dead;
    ch.concentrating_on = None;
    ch.conditions.insert(Condition::Unconscious);
}

/// Resistance halves (rounding down), then vulnerability doubles, then
/// immunity zeroes. Negative inputs clamp to 0.
pub fn adjust_damage(
    amount: i32,
    damage_type: DamageType,
    resistances: &BTreeSet<DamageType>,
    vulnerabilities: &BTreeSet<DamageType>,
    immunities: &BTreeSet<DamageType>,
) -> i32 {
    let mut amount = amount.max(0);
    if resistances.contains(&damage_type) {
        amount /= 2;
    }
    if vulnerabilities.contains(&damage_type) {
        amount *= 2;
    }
    if immunities.contains(&damage_type) {
        amount = 0;
    }
    amount
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyDamageReport {
    pub target: String,
    pub damage_type: DamageType,
    pub raw: i32,
    pub dealt: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub resisted: bool,
    pub vulnerable: bool,
    pub immune: bool,
    pub defeated: bool,
}

impl fmt::Display for EnemyDamageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DMG][{}] {} → {} (−{} {})",
            self.target, self.hp_before, self.hp_after, self.dealt, self.damage_type
        )?;
        if self.immune {
            write!(f, " immune")?;
        } else if self.resisted && !self.vulnerable {
            write!(f, " resisted")?;
        } else if self.vulnerable && !self.resisted {
            write!(f, " vulnerable")?;
        }
        if self.defeated {
            write!(f, " → DEFEATED")?;
        }
        Ok(())
    }
}

pub fn apply_damage_to_enemy(
    enemy: &mut Enemy,
    amount: i32,
    damage_type: DamageType,
) -> EnemyDamageReport {
    let dealt = adjust_damage(
        amount,
        damage_type,
        &enemy.resistances,
        &enemy.vulnerabilities,
        &enemy.immunities,
    );
    let hp_before = enemy.hp;
    enemy.hp = (enemy.hp - dealt).max(0);
    debug!(enemy = %enemy.id, raw = amount, dealt, hp = enemy.hp, "enemy damaged");
    EnemyDamageReport {
        target: enemy.name.clone(),
        damage_type,
        raw: amount.max(0),
        dealt,
        hp_before,
        hp_after: enemy.hp,
        resisted: enemy.resistances.contains(&damage_type),
        vulnerable: enemy.vulnerabilities.contains(&damage_type),
        immune: enemy.immunities.contains(&damage_type),
        defeated: enemy.is_defeated(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealReport {
    pub target: String,
    pub amount: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    pub overheal: i32,
    pub regained_consciousness: bool,
}

impl fmt::Display for HealReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[HEAL][{}] +{} HP ({} → {})",
            self.target, self.amount, self.hp_before, self.hp_after
        )?;
        if self.regained_consciousness {
            write!(f, " and regains consciousness")?;
        }
        Ok(())
    }
}

/// Healing; if at 0/unconscious, wakes and resets death saves.
pub fn heal(ch: &mut Character, amount: i32) -> Result<HealReport, RulesError> {
    if ch.is_dead() {
        return Err(RulesError::TargetIsDead {
            name: ch.name.clone(),
        });
    }
    let amount = amount.max(0);
    let hp_before = ch.hp.current;
    ch.hp.current = (ch.hp.current + amount).min(ch.hp.max);
    let healed = ch.hp.current - hp_before;
    let mut regained = false;
    if hp_before == 0 && ch.hp.current > 0 {
        restore_consciousness(ch);
        regained = true;
    }
    debug!(character = %ch.name, amount, hp = ch.hp.current, regained, "healed");
    Ok(HealReport {
        target: ch.name.clone(),
        amount: healed,
        hp_before,
        hp_after: ch.hp.current,
        overheal: amount - healed,
        regained_consciousness: regained,
    })
}

/// Back on your feet: conscious, counters cleared, no longer unconscious.
/// Prone stays until the character stands up.
pub(crate) fn restore_consciousness(ch: &mut Character) {
    ch.life = LifeState::Conscious;
    ch.death_saves = DeathSaves::default();
    ch.conditions.remove(&Condition::Unconscious);
}

/// Stabilize an unconscious creature at 0 HP (no more death saves).
pub fn stabilize(ch: &mut Character) -> Result<(), RulesError> {
    if !ch.is_dying() {
        return Err(RulesError::NotDying {
            name: ch.name.clone(),
        });
    }
    ch.life = LifeState::Unconscious { stable: true };
    ch.death_saves = DeathSaves::default();
    debug!(character = %ch.name, "stabilized");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathSaveResult {
    Success,
    Failure,
    /// Natural 1.
    DoubleFailure,
    /// Natural 20.
    Revived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaveReport {
    pub character: String,
    pub roll: u32,
    pub result: DeathSaveResult,
    pub successes: u8,
    pub failures: u8,
    pub stabilized: bool,
    pub dead: bool,
}

impl fmt::Display for DeathSaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let note = match self.result {
            DeathSaveResult::Revived => "NAT20 → regain 1 HP & wake",
            DeathSaveResult::DoubleFailure => "NAT1 → 2 failures",
            DeathSaveResult::Success => "success",
            DeathSaveResult::Failure => "failure",
        };
        if self.dead {
            write!(f, "[DEATHSAVE][{}] roll={} → DEAD", self.character, self.roll)
        } else if self.stabilized {
            write!(
                f,
                "[DEATHSAVE][{}] roll={} → stabilized (3 successes)",
                self.character, self.roll
            )
        } else {
            write!(
                f,
                "[DEATHSAVE][{}] roll={} → {} (S={}, F={})",
                self.character, self.roll, note, self.successes, self.failures
            )
        }
    }
}

/// Roll one death save. Only valid while dying.
pub fn roll_death_save(dice: &mut Dice, ch: &mut Character) -> Result<DeathSaveReport, RulesError> {
    if !ch.is_dying() {
        return Err(RulesError::NotDying {
            name: ch.name.clone(),
        });
    }

    let (roll, _) = dice.d20(AdMode::Normal);
    // Nat 20 → 1 HP and wake; Nat 1 → 2 fails; otherwise success/failure by 10+
    let result = if roll == 20 {
        ch.hp.current = 1;
        restore_consciousness(ch);
        DeathSaveResult::Revived
    } else if roll == 1 {
        ch.death_saves.failures = (ch.death_saves.failures + 2).min(3);
        DeathSaveResult::DoubleFailure
    } else if roll >= 10 {
        ch.death_saves.successes = (ch.death_saves.successes + 1).min(3);
        DeathSaveResult::Success
    } else {
        ch.death_saves.failures = (ch.death_saves.failures + 1).min(3);
        DeathSaveResult::Failure
    };

    let tally = ch.death_saves;
    let mut stabilized = false;
    if tally.failures >= 3 {
        kill(ch);
    } else if tally.successes >= 3 {
        // A stable creature starts a fresh count if it is hurt again.
        ch.life = LifeState::Unconscious { stable: true };
        ch.death_saves = DeathSaves::default();
        stabilized = true;
    }

    debug!(
        character = %ch.name,
        roll,
        ?result,
        successes = tally.successes,
        failures = tally.failures,
        "death save"
    );
    Ok(DeathSaveReport {
        character: ch.name.clone(),
        roll,
        result,
        successes: tally.successes,
        failures: tally.failures,
        stabilized,
        dead: ch.is_dead(),
    })
}
