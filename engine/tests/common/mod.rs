#![allow(dead_code)]

use d20_engine::inventory;
use d20_engine::{AbilityScores, Catalog, Character, CharacterClass, Race, Skill};

pub fn catalog() -> &'static Catalog {
    Catalog::builtin()
}

/// Level 1 human fighter, longsword equipped, no armor. HP 12, AC 12.
pub fn fighter() -> Character {
    let mut ch = Character::new(
        "aria",
        "Aria",
        Race::Human,
        CharacterClass::Fighter,
        AbilityScores::new(15, 14, 14, 10, 12, 8),
    )
    .with_skills(&[Skill::Athletics, Skill::Perception])
    .with_item("longsword", 1)
    .with_item("shield", 1)
    .with_item("chain_mail", 1);
    inventory::equip(catalog(), &mut ch, "longsword").unwrap();
    ch
}

/// Level 1 elf wizard. HP 7, save DC 13, spell attack +5.
pub fn wizard() -> Character {
    Character::new(
        "morgan",
        "Morgan",
        Race::Elf,
        CharacterClass::Wizard,
        AbilityScores::new(8, 14, 12, 16, 12, 10),
    )
    .with_spells(&["fire_bolt", "magic_missile", "burning_hands", "fireball", "hold_person"])
}

/// Level 1 dwarf cleric. HP 10, save DC 13.
pub fn cleric() -> Character {
    Character::new(
        "tam",
        "Tam",
        Race::Dwarf,
        CharacterClass::Cleric,
        AbilityScores::new(14, 10, 14, 10, 16, 12),
    )
    .with_spells(&["bless", "cure_wounds", "sacred_flame", "healing_word"])
}

/// Level 1 halfling rogue with a rapier and stealth expertise. HP 9.
pub fn rogue() -> Character {
    let mut ch = Character::new(
        "vex",
        "Vex",
        Race::Halfling,
        CharacterClass::Rogue,
        AbilityScores::new(10, 16, 12, 12, 10, 14),
    )
    .with_skills(&[Skill::Stealth, Skill::Acrobatics])
    .with_expertise(&[Skill::Stealth])
    .with_item("rapier", 1)
    .with_item("shortbow", 1);
    inventory::equip(catalog(), &mut ch, "rapier").unwrap();
    ch
}
