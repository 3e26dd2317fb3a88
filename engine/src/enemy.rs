use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilityScores, Skill};
use crate::checks::{Creature, Proficiency};
use crate::conditions::ConditionSet;
use crate::items::DamageType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyAttack {
    pub name: String,
    pub to_hit: i32,
    pub damage: String,
    pub damage_type: DamageType,
    #[serde(default)]
    pub ranged: bool,
}

/// Bestiary entry. Enemies are stamped out of these per encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    pub hp: i32,
    pub armor_class: i32,
    #[serde(default = "default_speed")]
    pub speed: i32,
    pub abilities: AbilityScores,
    pub attacks: Vec<EnemyAttack>,
    pub challenge_rating: f32,
    pub xp: u32,
    #[serde(default)]
    pub vulnerabilities: BTreeSet<DamageType>,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub immunities: BTreeSet<DamageType>,
    #[serde(default)]
    pub save_proficiencies: Vec<Ability>,
}

fn default_speed() -> i32 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: String,
    /// Bestiary id this enemy was created from.
    pub template: String,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub armor_class: i32,
    pub speed: i32,
    pub abilities: AbilityScores,
    pub attacks: Vec<EnemyAttack>,
    pub challenge_rating: f32,
    pub xp: u32,
    #[serde(default)]
    pub vulnerabilities: BTreeSet<DamageType>,
    #[serde(default)]
    pub resistances: BTreeSet<DamageType>,
    #[serde(default)]
    pub immunities: BTreeSet<DamageType>,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub save_proficiencies: Vec<Ability>,
}

impl Enemy {
    pub fn from_template(id: impl Into<String>, name: impl Into<String>, t: &EnemyTemplate) -> Self {
        Self {
            id: id.into(),
            template: t.id.clone(),
            name: name.into(),
            hp: t.hp,
            max_hp: t.hp,
            armor_class: t.armor_class,
            speed: t.speed,
            abilities: t.abilities,
            attacks: t.attacks.clone(),
            challenge_rating: t.challenge_rating,
            xp: t.xp,
            vulnerabilities: t.vulnerabilities.clone(),
            resistances: t.resistances.clone(),
            immunities: t.immunities.clone(),
            conditions: ConditionSet::new(),
            save_proficiencies: t.save_proficiencies.clone(),
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0
    }

    pub fn attack(&self, name: &str) -> Option<&EnemyAttack> {
        self.attacks.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// Monster proficiency bonus by challenge rating.
pub fn cr_proficiency_bonus(cr: f32) -> i32 {
    match cr {
        cr if cr < 5.0 => 2,
        cr if cr < 9.0 => 3,
        cr if cr < 13.0 => 4,
        cr if cr < 17.0 => 5,
        cr if cr < 21.0 => 6,
        cr if cr < 25.0 => 7,
        cr if cr < 29.0 => 8,
        _ => 9,
    }
}

impl Creature for Enemy {
    fn name(&self) -> &str {
        &self.name
    }

    fn abilities(&self) -> &AbilityScores {
        &self.abilities
    }

    fn proficiency_bonus(&self) -> i32 {
        cr_proficiency_bonus(self.challenge_rating)
    }

    fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    fn is_save_proficient(&self, ability: Ability) -> bool {
        self.save_proficiencies.contains(&ability)
    }

    fn skill_proficiency(&self, _skill: Skill) -> Proficiency {
        Proficiency::None
    }
}
