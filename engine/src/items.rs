//! Equipment records and the stat rules derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilityScores};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Acid,
    Bludgeoning,
    Cold,
    Fire,
    Force,
    Lightning,
    Necrotic,
    Piercing,
    Poison,
    Psychic,
    Radiant,
    Slashing,
    Thunder,
}

impl DamageType {
    pub const ALL: [DamageType; 13] = [
        DamageType::Acid,
        DamageType::Bludgeoning,
        DamageType::Cold,
        DamageType::Fire,
        DamageType::Force,
        DamageType::Lightning,
        DamageType::Necrotic,
        DamageType::Piercing,
        DamageType::Poison,
        DamageType::Psychic,
        DamageType::Radiant,
        DamageType::Slashing,
        DamageType::Thunder,
    ];

    pub fn name(self) -> &'static str {
        use DamageType::*;
        match self {
            Acid => "acid",
            Bludgeoning => "bludgeoning",
            Cold => "cold",
            Fire => "fire",
            Force => "force",
            Lightning => "lightning",
            Necrotic => "necrotic",
            Piercing => "piercing",
            Poison => "poison",
            Psychic => "psychic",
            Radiant => "radiant",
            Slashing => "slashing",
            Thunder => "thunder",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DamageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DamageType::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| format!("unknown damage type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    Simple,
    Martial,
}

impl WeaponCategory {
    pub fn name(self) -> &'static str {
        match self {
            WeaponCategory::Simple => "simple",
            WeaponCategory::Martial => "martial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProperty {
    Ammunition,
    Finesse,
    Heavy,
    Light,
    Loading,
    Reach,
    Thrown,
    TwoHanded,
    Versatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRange {
    pub normal: u32,
    pub long: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub damage: String,
    pub damage_type: DamageType,
    pub category: WeaponCategory,
    #[serde(default)]
    pub ranged: bool,
    #[serde(default)]
    pub properties: Vec<WeaponProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<WeaponRange>,
    /// Two-handed damage for versatile weapons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versatile: Option<String>,
}

impl Weapon {
    pub fn has(&self, property: WeaponProperty) -> bool {
        self.properties.contains(&property)
    }

    pub fn is_finesse(&self) -> bool {
        self.has(WeaponProperty::Finesse)
    }

    /// Damage notation for the chosen grip.
    pub fn damage_for(&self, two_handed: bool) -> &str {
        match (&self.versatile, two_handed) {
            (Some(v), true) => v,
            _ => &self.damage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorCategory {
    Light,
    Medium,
    Heavy,
}

impl ArmorCategory {
    pub fn name(self) -> &'static str {
        match self {
            ArmorCategory::Light => "light",
            ArmorCategory::Medium => "medium",
            ArmorCategory::Heavy => "heavy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    pub category: ArmorCategory,
    pub base_ac: i32,
    /// Only meaningful for medium armor; defaults to +2 there when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dex_bonus: Option<i32>,
    #[serde(default)]
    pub strength_requirement: i32,
    #[serde(default)]
    pub stealth_disadvantage: bool,
}

fn default_shield_bonus() -> i32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    #[serde(default = "default_shield_bonus")]
    pub ac_bonus: i32,
}

impl Default for Shield {
    fn default() -> Self {
        Self {
            ac_bonus: default_shield_bonus(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potion {
    pub healing: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon(Weapon),
    Armor(Armor),
    Shield(Shield),
    Potion(Potion),
    Gear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub value_gp: f64,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn as_weapon(&self) -> Option<&Weapon> {
        match &self.kind {
            ItemKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_armor(&self) -> Option<&Armor> {
        match &self.kind {
            ItemKind::Armor(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_shield(&self) -> Option<&Shield> {
        match &self.kind {
            ItemKind::Shield(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_potion(&self) -> Option<&Potion> {
        match &self.kind {
            ItemKind::Potion(p) => Some(p),
            _ => None,
        }
    }
}

/// Armor class for the given scores and worn equipment.
pub fn calculate_ac(scores: &AbilityScores, armor: Option<&Armor>, shield: Option<&Shield>) -> i32 {
    let dex = scores.mod_of(Ability::Dex);
    let body = match armor {
        None => 10 + dex,
        Some(a) => match a.category {
            ArmorCategory::Light => a.base_ac + dex,
            ArmorCategory::Medium => a.base_ac + dex.min(a.max_dex_bonus.unwrap_or(2)),
            ArmorCategory::Heavy => a.base_ac,
        },
    };
    body + shield.map(|s| s.ac_bonus).unwrap_or(0)
}

/// Finesse weapons use the better of STR and DEX, ranged weapons DEX, the rest STR.
pub fn attack_ability(weapon: &Weapon, scores: &AbilityScores) -> Ability {
    if weapon.is_finesse() {
        if scores.mod_of(Ability::Dex) > scores.mod_of(Ability::Str) {
            Ability::Dex
        } else {
            Ability::Str
        }
    } else if weapon.ranged {
        Ability::Dex
    } else {
        Ability::Str
    }
}

/// Proficiency lists hold weapon ids ("longsword") or category names ("martial").
pub fn is_weapon_proficient(proficiencies: &[String], item_id: &str, weapon: &Weapon) -> bool {
    proficiencies
        .iter()
        .any(|p| p.eq_ignore_ascii_case(item_id) || p.eq_ignore_ascii_case(weapon.category.name()))
}
