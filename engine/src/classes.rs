//! Class tables: hit dice, proficiencies, spell slot progressions and the
//! features each class unlocks by level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ability::Ability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

/// How a class gains spell slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasterKind {
    None,
    Full,
    Half,
    /// Few slots, all of the highest level, back on a short rest.
    Pact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recharge {
    ShortRest,
    LongRest,
}

/// Limited use tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUses {
    pub max: u8,
    pub current: u8,
    pub recharge: Recharge,
}

/// Class feature/ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<FeatureUses>,
}

impl Feature {
    fn passive(id: &str, name: &str, level: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            level,
            uses: None,
        }
    }

    fn limited(id: &str, name: &str, level: u8, max: u8, recharge: Recharge) -> Self {
        Self {
            uses: Some(FeatureUses {
                max,
                current: max,
                recharge,
            }),
            ..Self::passive(id, name, level)
        }
    }
}

/// Slots per spell level (index 0 = 1st level) for full casters, levels 1-20.
const FULL_CASTER_SLOTS: [[u8; 9]; 20] = [
    [2, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 2, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 2, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 1, 0, 0, 0, 0, 0],
    [4, 3, 3, 2, 0, 0, 0, 0, 0],
    [4, 3, 3, 3, 1, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 2, 1, 1],
];

/// (slot count, slot level) for pact casters, levels 1-20.
fn pact_slots(level: u8) -> (u8, u8) {
    match level {
        0 | 1 => (1, 1),
        2 => (2, 1),
        3 | 4 => (2, 2),
        5 | 6 => (2, 3),
        7 | 8 => (2, 4),
        9 | 10 => (2, 5),
        11..=16 => (3, 5),
        _ => (4, 5),
    }
}

impl CharacterClass {
    pub const ALL: [CharacterClass; 12] = [
        CharacterClass::Barbarian,
        CharacterClass::Bard,
        CharacterClass::Cleric,
        CharacterClass::Druid,
        CharacterClass::Fighter,
        CharacterClass::Monk,
        CharacterClass::Paladin,
        CharacterClass::Ranger,
        CharacterClass::Rogue,
        CharacterClass::Sorcerer,
        CharacterClass::Warlock,
        CharacterClass::Wizard,
    ];

    pub fn name(self) -> &'static str {
        use CharacterClass::*;
        match self {
            Barbarian => "barbarian",
            Bard => "bard",
            Cleric => "cleric",
            Druid => "druid",
            Fighter => "fighter",
            Monk => "monk",
            Paladin => "paladin",
            Ranger => "ranger",
            Rogue => "rogue",
            Sorcerer => "sorcerer",
            Warlock => "warlock",
            Wizard => "wizard",
        }
    }

    pub fn hit_die(self) -> u32 {
        use CharacterClass::*;
        match self {
            Barbarian => 12,
            Fighter | Paladin | Ranger => 10,
            Bard | Cleric | Druid | Monk | Rogue | Warlock => 8,
            Sorcerer | Wizard => 6,
        }
    }

    pub fn saving_throws(self) -> [Ability; 2] {
        use Ability::*;
        use CharacterClass::*;
        match self {
            Barbarian | Fighter => [Str, Con],
            Bard => [Dex, Cha],
            Cleric | Paladin | Warlock => [Wis, Cha],
            Druid | Wizard => [Int, Wis],
            Monk | Ranger => [Str, Dex],
            Rogue => [Dex, Int],
            Sorcerer => [Con, Cha],
        }
    }

    pub fn spellcasting_ability(self) -> Option<Ability> {
        use CharacterClass::*;
        match self {
            Bard | Paladin | Sorcerer | Warlock => Some(Ability::Cha),
            Cleric | Druid | Ranger => Some(Ability::Wis),
            Wizard => Some(Ability::Int),
            Barbarian | Fighter | Monk | Rogue => None,
        }
    }

    pub fn caster_kind(self) -> CasterKind {
        use CharacterClass::*;
        match self {
            Bard | Cleric | Druid | Sorcerer | Wizard => CasterKind::Full,
            Paladin | Ranger => CasterKind::Half,
            Warlock => CasterKind::Pact,
            Barbarian | Fighter | Monk | Rogue => CasterKind::None,
        }
    }

    pub fn armor_proficiencies(self) -> &'static [&'static str] {
        use CharacterClass::*;
        match self {
            Fighter | Paladin => &["light", "medium", "heavy", "shield"],
            Barbarian | Cleric | Druid | Ranger => &["light", "medium", "shield"],
            Bard | Rogue | Warlock => &["light"],
            Monk | Sorcerer | Wizard => &[],
        }
    }

    pub fn weapon_proficiencies(self) -> &'static [&'static str] {
        use CharacterClass::*;
        match self {
            Barbarian | Fighter | Paladin | Ranger => &["simple", "martial"],
            Cleric | Warlock => &["simple"],
            Bard | Rogue => &["simple", "hand_crossbow", "longsword", "rapier", "shortsword"],
            Monk => &["simple", "shortsword"],
            Druid => &[
                "club",
                "dagger",
                "dart",
                "javelin",
                "mace",
                "quarterstaff",
                "scimitar",
                "sickle",
                "sling",
                "spear",
            ],
            Sorcerer | Wizard => &["dagger", "dart", "sling", "quarterstaff", "light_crossbow"],
        }
    }

    /// Maximum slots per spell level at `level`.
    pub fn spell_slots(self, level: u8) -> [u8; 9] {
        let level = level.clamp(1, 20);
        match self.caster_kind() {
            CasterKind::None => [0; 9],
            CasterKind::Full => FULL_CASTER_SLOTS[level as usize - 1],
            CasterKind::Half => {
                if level < 2 {
                    [0; 9]
                } else {
                    FULL_CASTER_SLOTS[level.div_ceil(2) as usize - 1]
                }
            }
            CasterKind::Pact => {
                let (count, slot_level) = pact_slots(level);
                let mut slots = [0; 9];
                slots[slot_level as usize - 1] = count;
                slots
            }
        }
    }

    /// Features gained on reaching exactly `level`.
    pub fn features_at(self, level: u8) -> Vec<Feature> {
        use CharacterClass::*;
        use Recharge::*;
        let f = Feature::passive;
        let l = Feature::limited;
        match (self, level) {
            (Barbarian, 1) => vec![
                l("rage", "Rage", 1, 2, LongRest),
                f("unarmored_defense", "Unarmored Defense", 1),
            ],
            (Barbarian, 2) => vec![
                f("reckless_attack", "Reckless Attack", 2),
                f("danger_sense", "Danger Sense", 2),
            ],
            (Barbarian, 5) => vec![f("extra_attack", "Extra Attack", 5)],

            (Bard, 1) => vec![
                f("spellcasting", "Spellcasting", 1),
                l("bardic_inspiration", "Bardic Inspiration", 1, 3, LongRest),
            ],
            (Bard, 2) => vec![
                f("jack_of_all_trades", "Jack of All Trades", 2),
                f("song_of_rest", "Song of Rest", 2),
            ],
            (Bard, 5) => vec![f("font_of_inspiration", "Font of Inspiration", 5)],

            (Cleric, 1) => vec![
                f("spellcasting", "Spellcasting", 1),
                f("divine_domain", "Divine Domain", 1),
            ],
            (Cleric, 2) => vec![l("channel_divinity", "Channel Divinity", 2, 1, ShortRest)],
            (Cleric, 5) => vec![f("destroy_undead", "Destroy Undead", 5)],

            (Druid, 1) => vec![
                f("spellcasting", "Spellcasting", 1),
                f("druidic", "Druidic", 1),
            ],
            (Druid, 2) => vec![l("wild_shape", "Wild Shape", 2, 2, ShortRest)],

            (Fighter, 1) => vec![
                f("fighting_style", "Fighting Style", 1),
                l("second_wind", "Second Wind", 1, 1, ShortRest),
            ],
            (Fighter, 2) => vec![l("action_surge", "Action Surge", 2, 1, ShortRest)],
            (Fighter, 3) => vec![f("martial_archetype", "Martial Archetype", 3)],
            (Fighter, 5) => vec![f("extra_attack", "Extra Attack", 5)],
            (Fighter, 9) => vec![l("indomitable", "Indomitable", 9, 1, LongRest)],

            (Monk, 1) => vec![
                f("martial_arts", "Martial Arts", 1),
                f("unarmored_defense", "Unarmored Defense", 1),
            ],
            (Monk, 2) => vec![l("ki", "Ki", 2, 2, ShortRest)],
            (Monk, 5) => vec![
                f("extra_attack", "Extra Attack", 5),
                f("stunning_strike", "Stunning Strike", 5),
            ],

            (Paladin, 1) => vec![
                l("divine_sense", "Divine Sense", 1, 3, LongRest),
                l("lay_on_hands", "Lay on Hands", 1, 1, LongRest),
            ],
            (Paladin, 2) => vec![
                f("spellcasting", "Spellcasting", 2),
                f("divine_smite", "Divine Smite", 2),
                f("fighting_style", "Fighting Style", 2),
            ],
            (Paladin, 3) => vec![f("divine_health", "Divine Health", 3)],
            (Paladin, 5) => vec![f("extra_attack", "Extra Attack", 5)],

            (Ranger, 1) => vec![
                f("favored_enemy", "Favored Enemy", 1),
                f("natural_explorer", "Natural Explorer", 1),
            ],
            (Ranger, 2) => vec![
                f("spellcasting", "Spellcasting", 2),
                f("fighting_style", "Fighting Style", 2),
            ],
            (Ranger, 5) => vec![f("extra_attack", "Extra Attack", 5)],

            (Rogue, 1) => vec![
                f("expertise", "Expertise", 1),
                f("sneak_attack", "Sneak Attack", 1),
                f("thieves_cant", "Thieves' Cant", 1),
            ],
            (Rogue, 2) => vec![f("cunning_action", "Cunning Action", 2)],
            (Rogue, 5) => vec![f("uncanny_dodge", "Uncanny Dodge", 5)],
            (Rogue, 7) => vec![f("evasion", "Evasion", 7)],

            (Sorcerer, 1) => vec![
                f("spellcasting", "Spellcasting", 1),
                f("sorcerous_origin", "Sorcerous Origin", 1),
            ],
            (Sorcerer, 2) => vec![f("font_of_magic", "Font of Magic", 2)],
            (Sorcerer, 3) => vec![f("metamagic", "Metamagic", 3)],

            (Warlock, 1) => vec![
                f("otherworldly_patron", "Otherworldly Patron", 1),
                f("pact_magic", "Pact Magic", 1),
            ],
            (Warlock, 2) => vec![f("eldritch_invocations", "Eldritch Invocations", 2)],
            (Warlock, 3) => vec![f("pact_boon", "Pact Boon", 3)],

            (Wizard, 1) => vec![
                f("spellcasting", "Spellcasting", 1),
                l("arcane_recovery", "Arcane Recovery", 1, 1, LongRest),
            ],
            (Wizard, 2) => vec![f("arcane_tradition", "Arcane Tradition", 2)],

            _ => Vec::new(),
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharacterClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CharacterClass::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown class '{s}'"))
    }
}
