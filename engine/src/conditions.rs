use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::dice::AdMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Blinded,
    Charmed,
    Deafened,
    Frightened,
    Grappled,
    Incapacitated,
    Invisible,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

impl Condition {
    pub const ALL: [Condition; 14] = [
        Condition::Blinded,
        Condition::Charmed,
        Condition::Deafened,
        Condition::Frightened,
        Condition::Grappled,
        Condition::Incapacitated,
        Condition::Invisible,
        Condition::Paralyzed,
        Condition::Petrified,
        Condition::Poisoned,
        Condition::Prone,
        Condition::Restrained,
        Condition::Stunned,
        Condition::Unconscious,
    ];

    pub fn name(self) -> &'static str {
        use Condition::*;
        match self {
            Blinded => "blinded",
            Charmed => "charmed",
            Deafened => "deafened",
            Frightened => "frightened",
            Grappled => "grappled",
            Incapacitated => "incapacitated",
            Invisible => "invisible",
            Paralyzed => "paralyzed",
            Petrified => "petrified",
            Poisoned => "poisoned",
            Prone => "prone",
            Restrained => "restrained",
            Stunned => "stunned",
            Unconscious => "unconscious",
        }
    }

    /// The creature can take neither actions nor reactions.
    pub fn prevents_actions(self) -> bool {
        use Condition::*;
        matches!(
            self,
            Incapacitated | Paralyzed | Petrified | Stunned | Unconscious
        )
    }

    /// Gaining this condition ends concentration without a save.
    pub fn breaks_concentration(self) -> bool {
        use Condition::*;
        matches!(self, Incapacitated | Paralyzed | Stunned | Unconscious)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Condition::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown condition '{s}'"))
    }
}

pub type ConditionSet = BTreeSet<Condition>;

/// Accumulates advantage and disadvantage sources. The number of sources
/// never matters: any of each cancels out to a normal roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vantage {
    pub advantage: bool,
    pub disadvantage: bool,
}

impl Vantage {
    pub fn add(&mut self, mode: AdMode) {
        match mode {
            AdMode::Normal => {}
            AdMode::Advantage => self.advantage = true,
            AdMode::Disadvantage => self.disadvantage = true,
        }
    }

    pub fn with(mut self, mode: AdMode) -> Self {
        self.add(mode);
        self
    }

    pub fn resolve(self) -> AdMode {
        match (self.advantage, self.disadvantage) {
            (true, false) => AdMode::Advantage,
            (false, true) => AdMode::Disadvantage,
            _ => AdMode::Normal,
        }
    }
}

/// Whether the attack is melee or ranged (used for prone interactions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStyle {
    Melee,
    Ranged,
}

/// Compute vantage sources from conditions on attacker and target.
pub fn attack_vantage(attacker: &ConditionSet, target: &ConditionSet, style: AttackStyle) -> Vantage {
    use Condition::*;

    let mut v = Vantage::default();

    if attacker
        .iter()
        .any(|c| matches!(c, Blinded | Frightened | Poisoned | Prone | Restrained))
    {
        v.add(AdMode::Disadvantage);
    }
    if attacker.contains(&Invisible) {
        v.add(AdMode::Advantage);
    }

    for c in target {
        match c {
            Blinded | Paralyzed | Petrified | Restrained | Stunned | Unconscious => {
                v.add(AdMode::Advantage)
            }
            Invisible => v.add(AdMode::Disadvantage),
            Prone => match style {
                AttackStyle::Melee => v.add(AdMode::Advantage),
                AttackStyle::Ranged => v.add(AdMode::Disadvantage),
            },
            _ => {}
        }
    }

    v
}

/// Ability and skill checks.
pub fn check_vantage(conditions: &ConditionSet) -> Vantage {
    let mut v = Vantage::default();
    if conditions.contains(&Condition::Poisoned) || conditions.contains(&Condition::Frightened) {
        v.add(AdMode::Disadvantage);
    }
    v
}

pub fn save_vantage(conditions: &ConditionSet, ability: Ability) -> Vantage {
    use Condition::*;
    let mut v = Vantage::default();
    if ability == Ability::Dex && conditions.contains(&Restrained) {
        v.add(AdMode::Disadvantage);
    }
    if matches!(ability, Ability::Str | Ability::Dex)
        && conditions
            .iter()
            .any(|c| matches!(c, Stunned | Paralyzed | Petrified))
    {
        v.add(AdMode::Disadvantage);
    }
    v
}

/// STR and DEX saves fail outright for these conditions; no die is rolled.
pub fn auto_fails_save(conditions: &ConditionSet, ability: Ability) -> bool {
    use Condition::*;
    matches!(ability, Ability::Str | Ability::Dex)
        && conditions
            .iter()
            .any(|c| matches!(c, Paralyzed | Stunned | Petrified | Unconscious))
}

/// First condition (in declaration order) that stops the creature acting.
pub fn blocking_condition(conditions: &ConditionSet) -> Option<Condition> {
    conditions.iter().copied().find(|c| c.prevents_actions())
}

pub fn can_act(conditions: &ConditionSet) -> bool {
    blocking_condition(conditions).is_none()
}
