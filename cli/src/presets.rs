//! Ready-made level 1 characters for trying the engine from the command line.

use anyhow::{Context, Result};
use d20_engine::progression;
use d20_engine::{AbilityScores, Catalog, Character, CharacterClass, Race, Skill, inventory};

struct Loadout {
    /// STR, DEX, CON, INT, WIS, CHA
    scores: [i32; 6],
    skills: &'static [Skill],
    gear: &'static [&'static str],
    equip: &'static [&'static str],
    spells: &'static [&'static str],
}

fn loadout(class: CharacterClass) -> Loadout {
    use CharacterClass::*;
    match class {
        Barbarian => Loadout {
            scores: [15, 13, 14, 8, 12, 10],
            skills: &[Skill::Athletics, Skill::Survival],
            gear: &["greataxe", "handaxe"],
            equip: &["greataxe"],
            spells: &[],
        },
        Bard => Loadout {
            scores: [8, 14, 13, 12, 10, 15],
            skills: &[Skill::Performance, Skill::Persuasion, Skill::Deception],
            gear: &["rapier", "leather", "dagger"],
            equip: &["rapier", "leather"],
            spells: &["vicious_mockery", "cure_wounds", "healing_word", "thunderwave"],
        },
        Cleric => Loadout {
            scores: [14, 10, 13, 8, 15, 12],
            skills: &[Skill::Medicine, Skill::Religion],
            gear: &["mace", "scale_mail", "shield"],
            equip: &["mace", "scale_mail", "shield"],
            spells: &["sacred_flame", "bless", "cure_wounds", "guiding_bolt", "healing_word"],
        },
        Druid => Loadout {
            scores: [10, 14, 13, 12, 15, 8],
            skills: &[Skill::Nature, Skill::Survival],
            gear: &["quarterstaff", "leather"],
            equip: &["quarterstaff", "leather"],
            spells: &["thunderwave", "cure_wounds", "healing_word"],
        },
        Fighter => Loadout {
            scores: [15, 13, 14, 10, 12, 8],
            skills: &[Skill::Athletics, Skill::Perception],
            gear: &["longsword", "chain_mail", "shield", "light_crossbow"],
            equip: &["longsword", "chain_mail", "shield"],
            spells: &[],
        },
        Monk => Loadout {
            scores: [12, 15, 13, 8, 14, 10],
            skills: &[Skill::Acrobatics, Skill::Insight],
            gear: &["shortsword", "dart"],
            equip: &["shortsword"],
            spells: &[],
        },
        Paladin => Loadout {
            scores: [15, 10, 13, 8, 12, 14],
            skills: &[Skill::Athletics, Skill::Religion],
            gear: &["longsword", "chain_mail", "shield", "javelin"],
            equip: &["longsword", "chain_mail", "shield"],
            spells: &["bless", "cure_wounds"],
        },
        Ranger => Loadout {
            scores: [12, 15, 13, 8, 14, 10],
            skills: &[Skill::Stealth, Skill::Survival, Skill::Perception],
            gear: &["longbow", "shortsword", "scale_mail"],
            equip: &["longbow", "scale_mail"],
            spells: &["cure_wounds"],
        },
        Rogue => Loadout {
            scores: [8, 15, 13, 12, 10, 14],
            skills: &[Skill::Stealth, Skill::Acrobatics, Skill::SleightOfHand, Skill::Perception],
            gear: &["rapier", "shortbow", "leather", "thieves_tools"],
            equip: &["rapier", "leather"],
            spells: &[],
        },
        Sorcerer => Loadout {
            scores: [8, 13, 14, 10, 12, 15],
            skills: &[Skill::Arcana, Skill::Intimidation],
            gear: &["dagger", "light_crossbow"],
            equip: &["dagger"],
            spells: &["fire_bolt", "ray_of_frost", "magic_missile", "burning_hands"],
        },
        Warlock => Loadout {
            scores: [8, 13, 14, 12, 10, 15],
            skills: &[Skill::Arcana, Skill::Deception],
            gear: &["dagger", "leather"],
            equip: &["dagger", "leather"],
            spells: &["eldritch_blast", "hex", "hold_person"],
        },
        Wizard => Loadout {
            scores: [8, 14, 13, 15, 12, 10],
            skills: &[Skill::Arcana, Skill::History],
            gear: &["quarterstaff"],
            equip: &["quarterstaff"],
            spells: &["fire_bolt", "ray_of_frost", "magic_missile", "burning_hands", "shocking_grasp"],
        },
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// A sample character of `class` with its starting gear equipped,
/// advanced to `level` when that is above 1.
pub fn sample_character(catalog: &Catalog, class: CharacterClass, race: Race, name: &str, level: u8) -> Result<Character> {
    let kit = loadout(class);
    let [s, d, c, i, w, ch] = kit.scores;
    let mut pc = Character::new(slug(name), name, race, class, AbilityScores::new(s, d, c, i, w, ch))
        .with_skills(kit.skills)
        .with_spells(kit.spells)
        .with_gold(10);
    for item in kit.gear {
        pc = pc.with_item(item, 1);
    }
    inventory::add_item(catalog, &mut pc, "potion_of_healing", 1)
        .context("starting potion")?;
    for item in kit.equip {
        inventory::equip(catalog, &mut pc, item).with_context(|| format!("equipping {item}"))?;
    }
    if level > 1 {
        progression::advance_to_level(&mut pc, level);
    }
    Ok(pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CharacterClass; 12] = [
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

    #[test]
    fn every_class_has_a_valid_kit() {
        let catalog = Catalog::builtin();
        for class in ALL {
            let pc = sample_character(catalog, class, Race::Human, "Test Hero", 1).unwrap();
            assert_eq!(pc.id, "test-hero");
            assert!(pc.equipped.weapon.is_some(), "{class} has no weapon");
            for spell in &pc.known_spells {
                assert!(catalog.spell(spell).is_some(), "{class} knows unknown spell {spell}");
            }
        }
    }

    #[test]
    fn fighter_kit_armor_class() {
        let pc = sample_character(Catalog::builtin(), CharacterClass::Fighter, Race::Human, "Aria", 1).unwrap();
        // chain mail 16 + shield 2
        assert_eq!(pc.armor_class, 18);
    }

    #[test]
    fn level_is_applied() {
        let pc = sample_character(Catalog::builtin(), CharacterClass::Wizard, Race::Elf, "Morgan", 3).unwrap();
        assert_eq!(pc.level, 3);
        assert_eq!(pc.spell_slots.available(2), 2);
    }
}
