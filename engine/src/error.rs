use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conditions::Condition;

/// Which bucket a [`RulesError`] falls into. Callers narrate both the same way,
/// but only input errors indicate a bug in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Input,
    ResourceExhausted,
}

/// Expected game-level refusals. None of these are fatal; the state the
/// caller passed in is left untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulesError {
    #[error("unknown item '{id}'")]
    UnknownItem { id: String },
    #[error("unknown spell '{id}'")]
    UnknownSpell { id: String },
    #[error("unknown monster '{id}'")]
    UnknownMonster { id: String },
    #[error("no combatant with id '{id}'")]
    UnknownCombatant { id: String },
    #[error("{name} has no feature '{id}'")]
    UnknownFeature { name: String, id: String },
    #[error("{name} has no attack named '{attack}'")]
    UnknownAttack { name: String, attack: String },
    #[error("combat is not active")]
    CombatNotActive,
    #[error("combat has already started")]
    CombatAlreadyStarted,
    #[error("combat needs at least one participant")]
    NoCombatants,
    #[error("{name} cannot act while {condition}")]
    CannotAct { name: String, condition: Condition },
    #[error("{name} is not dying")]
    NotDying { name: String },
    #[error("{name} is dead")]
    TargetIsDead { name: String },
    #[error("{name} cannot {activity} right now")]
    CannotRest { name: String, activity: String },
    #[error("'{item}' is not a weapon")]
    NotAWeapon { item: String },
    #[error("'{item}' cannot be equipped")]
    NotEquippable { item: String },
    #[error("'{item}' is not a potion")]
    NotAPotion { item: String },
    #[error("{name} is not a spellcaster")]
    NotASpellcaster { name: String },
    #[error("{name} does not know the spell '{spell}'")]
    SpellNotKnown { name: String, spell: String },
    #[error("'{spell}' is a level {spell_level} spell and cannot be cast with a level {slot_level} slot")]
    SlotBelowSpellLevel {
        spell: String,
        spell_level: u8,
        slot_level: u8,
    },
    #[error("spell slot level must be between 1 and 9, got {level}")]
    InvalidSlotLevel { level: u8 },
    #[error("'{spell}' needs a target")]
    MissingTarget { spell: String },
    #[error("{name} needs {needed} XP to reach level {level} (has {current})")]
    InsufficientExperience {
        name: String,
        level: u8,
        needed: u32,
        current: u32,
    },
    #[error("{name} is already at the maximum level")]
    MaxLevel { name: String },
    #[error("no level {level} spell slots remaining")]
    NoSpellSlot { level: u8 },
    #[error("{name} has no uses of '{feature}' left")]
    FeatureExhausted { name: String, feature: String },
    #[error("{name} does not carry {quantity}x '{item}'")]
    ItemNotInInventory {
        name: String,
        item: String,
        quantity: u32,
    },
    #[error("{name} needs {needed} gp but has {available} gp")]
    InsufficientGold {
        name: String,
        needed: u32,
        available: u32,
    },
}

impl RulesError {
    pub fn class(&self) -> ErrorClass {
        use RulesError::*;
        match self {
            NoSpellSlot { .. }
            | FeatureExhausted { .. }
            | ItemNotInInventory { .. }
            | InsufficientGold { .. } => ErrorClass::ResourceExhausted,
            _ => ErrorClass::Input,
        }
    }
}
