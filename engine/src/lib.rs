//! Deterministic d20 rules engine.
//!
//! Every random outcome flows through [`Dice`], so a seeded or scripted
//! source replays the same session exactly. The [`api`] module is the
//! state-in, state-out surface; the other modules hold the rules.

pub mod ability;
pub mod api;
pub mod character;
pub mod checks;
pub mod classes;
pub mod combat;
pub mod conditions;
pub mod content;
pub mod dice;
pub mod enemy;
pub mod error;
pub mod inventory;
pub mod items;
pub mod life;
pub mod progression;
pub mod spells;

pub use ability::{Ability, AbilityScores, Skill, ability_mod, proficiency_bonus};
pub use character::{Character, LifeState, Race};
pub use checks::{CheckKind, CheckOutcome, Creature};
pub use classes::CharacterClass;
pub use combat::CombatState;
pub use conditions::Condition;
pub use content::Catalog;
pub use dice::{AdMode, DamageRoll, Dice, DiceError, DiceExpr, Roll};
pub use enemy::{Enemy, EnemyTemplate};
pub use error::{ErrorClass, RulesError};
pub use items::DamageType;
