use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::Character;
use crate::conditions::{self, AttackStyle, Condition, ConditionSet};
use crate::content::Catalog;
use crate::dice::{AdMode, DamageRoll, Dice, DiceExpr, Roll};
use crate::enemy::Enemy;
use crate::error::RulesError;
use crate::items::{self, DamageType, Weapon, WeaponCategory, WeaponProperty};

pub const UNARMED: &str = "unarmed";

/// Natural 20 always hits, natural 1 always misses.
pub fn meets_ac(natural: i32, total: i32, ac: i32) -> bool {
    natural == 20 || (natural != 1 && total >= ac)
}

/// What an attack needs to know about its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTarget {
    pub name: String,
    pub armor_class: i32,
    #[serde(default)]
    pub conditions: ConditionSet,
}

impl From<&Enemy> for AttackTarget {
    fn from(e: &Enemy) -> Self {
        Self {
            name: e.name.clone(),
            armor_class: e.armor_class,
            conditions: e.conditions.clone(),
        }
    }
}

impl From<&Character> for AttackTarget {
    fn from(c: &Character) -> Self {
        Self {
            name: c.name.clone(),
            armor_class: c.armor_class,
            conditions: c.conditions.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOptions {
    #[serde(default)]
    pub mode: AdMode,
    /// Wield a versatile weapon in both hands (ignored with a shield equipped).
    #[serde(default)]
    pub two_handed: bool,
    /// Party members in the encounter; sneak attack needs an ally.
    #[serde(default = "default_party_size")]
    pub party_size: usize,
    #[serde(default)]
    pub sneak_attack_used: bool,
}

fn default_party_size() -> usize {
    1
}

impl Default for AttackOptions {
    fn default() -> Self {
        Self {
            mode: AdMode::Normal,
            two_handed: false,
            party_size: default_party_size(),
            sneak_attack_used: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attacker: String,
    pub target: String,
    pub weapon: String,
    pub roll: Roll,
    pub attack_bonus: i32,
    pub target_ac: i32,
    pub hit: bool,
    pub critical: bool,
    pub mode: AdMode,
    pub damage_type: DamageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<DamageRoll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sneak_attack: Option<DamageRoll>,
    pub total_damage: i32,
}

impl AttackOutcome {
    fn miss(attacker: &str, target: &AttackTarget, weapon: &str, roll: Roll, bonus: i32, damage_type: DamageType) -> Self {
        Self {
            attacker: attacker.to_string(),
            target: target.name.clone(),
            weapon: weapon.to_string(),
            mode: roll.mode,
            roll,
            attack_bonus: bonus,
            target_ac: target.armor_class,
            hit: false,
            critical: false,
            damage_type,
            damage: None,
            sneak_attack: None,
            total_damage: 0,
        }
    }

    /// Transcript line for the damage, if any was dealt.
    pub fn damage_line(&self) -> Option<String> {
        let dmg = self.damage.as_ref()?;
        let prefix = if self.critical { "crit: " } else { "" };
        let mut line = format!(
            "[DMG][{}] {}rolled {} = {} [{}]",
            self.attacker, prefix, dmg.notation, dmg.total, self.damage_type
        );
        if let Some(sneak) = &self.sneak_attack {
            line.push_str(&format!(" + sneak attack {} = {}", sneak.notation, sneak.total));
        }
        Some(line)
    }
}

fn format_d20_sequence(roll: &Roll) -> String {
    let kept = roll.natural;
    match roll.discarded {
        None => format!("d20={kept}"),
        Some(other) => format!("d20={kept} vs d20={other} (keep={kept})"),
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.critical {
            "CRIT!"
        } else if self.hit {
            "HIT"
        } else if self.roll.fumble {
            "MISS (NAT1)"
        } else {
            "MISS"
        };
        let mark = if self.hit { "✔" } else { "✖" };
        write!(
            f,
            "[ATTACK][{}] {} → {} to-hit={} vs AC={} {}",
            self.attacker,
            format_d20_sequence(&self.roll),
            outcome,
            self.roll.total,
            self.target_ac,
            mark
        )
    }
}

fn unarmed_strike() -> Weapon {
    Weapon {
        damage: "1".to_string(),
        damage_type: DamageType::Bludgeoning,
        category: WeaponCategory::Simple,
        ranged: false,
        properties: Vec::new(),
        range: None,
        versatile: None,
    }
}

/// Weapon dice plus a flat modifier that a crit leaves alone.
fn roll_with_modifier(dice: &mut Dice, notation: &str, modifier: i32, critical: bool) -> DamageRoll {
    match DiceExpr::parse(notation) {
        Ok(expr) => dice.roll_damage_expr(&expr.with_modifier(modifier), critical),
        Err(_) => dice.roll_damage(notation, critical),
    }
}

/// A character's weapon attack. `weapon` defaults to the equipped weapon,
/// then to an unarmed strike.
pub fn make_attack(
    dice: &mut Dice,
    catalog: &Catalog,
    attacker: &Character,
    weapon: Option<&str>,
    target: &AttackTarget,
    opts: AttackOptions,
) -> Result<AttackOutcome, RulesError> {
    if let Some(condition) = conditions::blocking_condition(&attacker.conditions) {
        return Err(RulesError::CannotAct {
            name: attacker.name.clone(),
            condition,
        });
    }

    let weapon_id = weapon
        .or(attacker.equipped.weapon.as_deref())
        .unwrap_or(UNARMED);
    let (weapon, proficient) = if weapon_id == UNARMED {
        (unarmed_strike(), true)
    } else {
        let item = catalog
            .item(weapon_id)
            .ok_or_else(|| RulesError::UnknownItem { id: weapon_id.into() })?;
        let w = item
            .as_weapon()
            .ok_or_else(|| RulesError::NotAWeapon { item: weapon_id.into() })?;
        if attacker.quantity_of(weapon_id) == 0 {
            return Err(RulesError::ItemNotInInventory {
                name: attacker.name.clone(),
                item: weapon_id.into(),
                quantity: 1,
            });
        }
        let proficient = items::is_weapon_proficient(&attacker.proficiencies.weapons, weapon_id, w);
        (w.clone(), proficient)
    };

    let ability = items::attack_ability(&weapon, &attacker.abilities);
    let ability_mod = attacker.abilities.mod_of(ability);
    let bonus = ability_mod + if proficient { attacker.proficiency_bonus } else { 0 };
    let style = if weapon.ranged {
        AttackStyle::Ranged
    } else {
        AttackStyle::Melee
    };
    let mode = conditions::attack_vantage(&attacker.conditions, &target.conditions, style)
        .with(opts.mode)
        .resolve();

    let roll = dice.roll_expr(&DiceExpr::d20(bonus), mode);
    let hit = meets_ac(roll.natural, roll.total, target.armor_class);
    debug!(
        attacker = %attacker.name,
        target = %target.name,
        weapon = weapon_id,
        natural = roll.natural,
        total = roll.total,
        ac = target.armor_class,
        hit,
        "attack roll"
    );
    if !hit {
        return Ok(AttackOutcome::miss(&attacker.name, target, weapon_id, roll, bonus, weapon.damage_type));
    }

    let critical = roll.critical;
    let two_handed = opts.two_handed && attacker.equipped.shield.is_none();
    let damage = roll_with_modifier(dice, weapon.damage_for(two_handed), ability_mod, critical);

    let sneak_attack = if attacker.has_feature("sneak_attack")
        && (weapon.has(WeaponProperty::Finesse) || weapon.ranged)
        && opts.party_size > 1
        && !opts.sneak_attack_used
    {
        let count = (attacker.level as u32).div_ceil(2);
        Some(dice.roll_damage(&format!("{count}d6"), critical))
    } else {
        None
    };

    let total_damage = damage.total + sneak_attack.as_ref().map(|s| s.total).unwrap_or(0);
    Ok(AttackOutcome {
        attacker: attacker.name.clone(),
        target: target.name.clone(),
        weapon: weapon_id.to_string(),
        mode: roll.mode,
        roll,
        attack_bonus: bonus,
        target_ac: target.armor_class,
        hit: true,
        critical,
        damage_type: weapon.damage_type,
        damage: Some(damage),
        sneak_attack,
        total_damage,
    })
}

/// An enemy's attack against a character. `attack` defaults to the enemy's first attack.
pub fn enemy_attack(
    dice: &mut Dice,
    enemy: &Enemy,
    attack: Option<&str>,
    target: &AttackTarget,
    mode: AdMode,
) -> Result<AttackOutcome, RulesError> {
    if enemy.is_defeated() {
        return Err(RulesError::CannotAct {
            name: enemy.name.clone(),
            condition: Condition::Unconscious,
        });
    }
    if let Some(condition) = conditions::blocking_condition(&enemy.conditions) {
        return Err(RulesError::CannotAct {
            name: enemy.name.clone(),
            condition,
        });
    }
    let chosen = match attack {
        Some(name) => enemy.attack(name).ok_or_else(|| RulesError::UnknownAttack {
            name: enemy.name.clone(),
            attack: name.into(),
        })?,
        None => enemy.attacks.first().ok_or_else(|| RulesError::UnknownAttack {
            name: enemy.name.clone(),
            attack: "(none)".into(),
        })?,
    };

    let style = if chosen.ranged {
        AttackStyle::Ranged
    } else {
        AttackStyle::Melee
    };
    let mode = conditions::attack_vantage(&enemy.conditions, &target.conditions, style)
        .with(mode)
        .resolve();
    let roll = dice.roll_expr(&DiceExpr::d20(chosen.to_hit), mode);
    let hit = meets_ac(roll.natural, roll.total, target.armor_class);
    debug!(
        enemy = %enemy.id,
        target = %target.name,
        attack = %chosen.name,
        natural = roll.natural,
        total = roll.total,
        hit,
        "enemy attack roll"
    );
    if !hit {
        return Ok(AttackOutcome::miss(&enemy.name, target, &chosen.name, roll, chosen.to_hit, chosen.damage_type));
    }
    let critical = roll.critical;
    let damage = dice.roll_damage(&chosen.damage, critical);
    Ok(AttackOutcome {
        attacker: enemy.name.clone(),
        target: target.name.clone(),
        weapon: chosen.name.clone(),
        mode: roll.mode,
        roll,
        attack_bonus: chosen.to_hit,
        target_ac: target.armor_class,
        hit: true,
        critical,
        damage_type: chosen.damage_type,
        total_damage: damage.total,
        damage: Some(damage),
        sneak_attack: None,
    })
}
