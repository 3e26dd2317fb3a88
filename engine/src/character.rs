use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ability::{Ability, AbilityScores, Skill, proficiency_bonus};
use crate::checks::{Creature, Proficiency};
use crate::classes::{CharacterClass, Feature};
use crate::conditions::{Condition, ConditionSet};
use crate::content::Catalog;
use crate::items::{self, Armor, Shield};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
    #[serde(default)]
    pub temp: i32,
}

impl HitPoints {
    pub fn new(max: i32) -> Self {
        Self {
            current: max,
            max,
            temp: 0,
        }
    }
}

/// Hit dice tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitDice {
    pub die: u32,
    pub total: u8,
    pub remaining: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInfo {
    pub max: u8,
    pub current: u8,
}

/// Spell slot tracking, index 0 = 1st level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlots(pub [SlotInfo; 9]);

impl SpellSlots {
    pub fn from_max(max: [u8; 9]) -> Self {
        Self(max.map(|m| SlotInfo { max: m, current: m }))
    }

    pub fn get(&self, level: u8) -> Option<SlotInfo> {
        if (1..=9).contains(&level) {
            Some(self.0[level as usize - 1])
        } else {
            None
        }
    }

    pub fn available(&self, level: u8) -> u8 {
        self.get(level).map(|s| s.current).unwrap_or(0)
    }

    /// Lowest slot level at or above `min_level` with a slot left.
    pub fn lowest_available(&self, min_level: u8) -> Option<u8> {
        (min_level.max(1)..=9).find(|&lvl| self.available(lvl) > 0)
    }

    /// Spend one slot. Returns false when none is left; never goes below 0.
    pub fn use_slot(&mut self, level: u8) -> bool {
        if !(1..=9).contains(&level) {
            return false;
        }
        let slot = &mut self.0[level as usize - 1];
        if slot.current == 0 {
            return false;
        }
        slot.current -= 1;
        true
    }

    pub fn restore_all(&mut self) {
        for slot in &mut self.0 {
            slot.current = slot.max;
        }
    }

    /// Change the maximums, granting any newly gained slots as usable.
    pub fn set_max(&mut self, max: [u8; 9]) {
        for (slot, new_max) in self.0.iter_mut().zip(max) {
            let gained = new_max.saturating_sub(slot.max);
            slot.max = new_max;
            slot.current = (slot.current + gained).min(new_max);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|s| s.max == 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: u8, // 0..=3
    pub failures: u8,  // 0..=3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum LifeState {
    #[default]
    Conscious,
    Unconscious {
        stable: bool,
    },
    Dead,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proficiencies {
    #[serde(default)]
    pub saves: Vec<Ability>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub expertise: Vec<Skill>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub armor: Vec<String>,
    #[serde(default)]
    pub weapons: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipped {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shield: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Halfling,
    Gnome,
    HalfElf,
    HalfOrc,
    Dragonborn,
    Tiefling,
}

impl Race {
    pub fn speed(self) -> i32 {
        match self {
            Race::Dwarf | Race::Halfling | Race::Gnome => 25,
            _ => 30,
        }
    }
}

impl std::str::FromStr for Race {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "human" => Ok(Race::Human),
            "elf" => Ok(Race::Elf),
            "dwarf" => Ok(Race::Dwarf),
            "halfling" => Ok(Race::Halfling),
            "gnome" => Ok(Race::Gnome),
            "half_elf" => Ok(Race::HalfElf),
            "half_orc" => Ok(Race::HalfOrc),
            "dragonborn" => Ok(Race::Dragonborn),
            "tiefling" => Ok(Race::Tiefling),
            other => Err(format!("unknown race '{other}'")),
        }
    }
}

/// A player character. Owned by the caller; changed only through the
/// engine's operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub race: Race,
    pub class: CharacterClass,
    pub level: u8,
    #[serde(default)]
    pub experience: u32,
    pub abilities: AbilityScores,
    pub hp: HitPoints,
    pub armor_class: i32,
    pub speed: i32,
    pub proficiency_bonus: i32,
    pub hit_dice: HitDice,
    #[serde(default)]
    pub proficiencies: Proficiencies,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
    #[serde(default)]
    pub equipped: Equipped,
    #[serde(default)]
    pub gold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spellcasting_ability: Option<Ability>,
    #[serde(default)]
    pub spell_slots: SpellSlots,
    #[serde(default)]
    pub known_spells: Vec<String>,
    #[serde(default)]
    pub prepared_spells: Vec<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub death_saves: DeathSaves,
    #[serde(default)]
    pub life: LifeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentrating_on: Option<String>,
}

impl Character {
    /// A fresh level 1 character with class-derived hit points, saves,
    /// proficiencies, slots and features.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        race: Race,
        class: CharacterClass,
        abilities: AbilityScores,
    ) -> Self {
        let die = class.hit_die();
        let max_hp = (die as i32 + abilities.mod_of(Ability::Con)).max(1);
        let proficiencies = Proficiencies {
            saves: class.saving_throws().to_vec(),
            languages: vec!["common".to_string()],
            armor: class.armor_proficiencies().iter().map(|s| s.to_string()).collect(),
            weapons: class.weapon_proficiencies().iter().map(|s| s.to_string()).collect(),
            ..Proficiencies::default()
        };
        let mut ch = Self {
            id: id.into(),
            name: name.into(),
            race,
            class,
            level: 1,
            experience: 0,
            abilities,
            hp: HitPoints::new(max_hp),
            armor_class: 0,
            speed: race.speed(),
            proficiency_bonus: proficiency_bonus(1),
            hit_dice: HitDice {
                die,
                total: 1,
                remaining: 1,
            },
            proficiencies,
            inventory: Vec::new(),
            equipped: Equipped::default(),
            gold: 0,
            spellcasting_ability: class.spellcasting_ability(),
            spell_slots: SpellSlots::from_max(class.spell_slots(1)),
            known_spells: Vec::new(),
            prepared_spells: Vec::new(),
            features: class.features_at(1),
            conditions: ConditionSet::new(),
            death_saves: DeathSaves::default(),
            life: LifeState::Conscious,
            concentrating_on: None,
        };
        ch.armor_class = items::calculate_ac(&ch.abilities, None, None);
        ch
    }

    pub fn with_skills(mut self, skills: &[Skill]) -> Self {
        self.proficiencies.skills.extend_from_slice(skills);
        self
    }

    pub fn with_expertise(mut self, skills: &[Skill]) -> Self {
        self.proficiencies.expertise.extend_from_slice(skills);
        self
    }

    pub fn with_spells(mut self, spells: &[&str]) -> Self {
        self.known_spells
            .extend(spells.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_item(mut self, item: &str, quantity: u32) -> Self {
        crate::inventory::stash(&mut self, item, quantity);
        self
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.life, LifeState::Dead)
    }

    /// At 0 HP, rolling death saves (neither stable nor dead).
    pub fn is_dying(&self) -> bool {
        self.hp.current == 0 && matches!(self.life, LifeState::Unconscious { stable: false })
    }

    pub fn has_feature(&self, id: &str) -> bool {
        self.features.iter().any(|f| f.id == id)
    }

    pub fn knows_spell(&self, id: &str) -> bool {
        self.known_spells.iter().any(|s| s == id) || self.prepared_spells.iter().any(|s| s == id)
    }

    pub fn quantity_of(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .find(|e| e.item == item)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    /// Add a condition. Incapacitating conditions end concentration.
    pub fn add_condition(&mut self, condition: Condition) {
        if self.conditions.insert(condition) {
            debug!(character = %self.name, %condition, "condition added");
        }
        if condition.breaks_concentration() {
            if let Some(spell) = self.concentrating_on.take() {
                debug!(character = %self.name, %spell, %condition, "concentration broken");
            }
        }
    }

    pub fn remove_condition(&mut self, condition: Condition) -> bool {
        self.conditions.remove(&condition)
    }

    /// Recompute AC from the equipped armor and shield.
    pub fn recompute_armor_class(&mut self, catalog: &Catalog) {
        let armor: Option<&Armor> = self
            .equipped
            .armor
            .as_deref()
            .and_then(|id| catalog.item(id))
            .and_then(|i| i.as_armor());
        let shield: Option<&Shield> = self
            .equipped
            .shield
            .as_deref()
            .and_then(|id| catalog.item(id))
            .and_then(|i| i.as_shield());
        self.armor_class = items::calculate_ac(&self.abilities, armor, shield);
    }

    pub fn spellcasting_mod(&self) -> Option<i32> {
        self.spellcasting_ability.map(|a| self.abilities.mod_of(a))
    }
}

impl Creature for Character {
    fn name(&self) -> &str {
        &self.name
    }

    fn abilities(&self) -> &AbilityScores {
        &self.abilities
    }

    fn proficiency_bonus(&self) -> i32 {
        self.proficiency_bonus
    }

    fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    fn is_save_proficient(&self, ability: Ability) -> bool {
        self.proficiencies.saves.contains(&ability)
    }

    fn skill_proficiency(&self, skill: Skill) -> Proficiency {
        if self.proficiencies.expertise.contains(&skill) {
            Proficiency::Expertise
        } else if self.proficiencies.skills.contains(&skill) {
            Proficiency::Proficient
        } else {
            Proficiency::None
        }
    }
}
