//! Dice notation, rolling, and the injectable randomness source.
//!
//! Every rule that rolls takes a `&mut Dice`. Production callers seed it per
//! request; tests script the exact faces that come up.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Upper bound on dice in a single term; keeps a typo like `1000d6` from
/// turning into a very long roll.
pub const MAX_DICE_PER_TERM: u32 = 100;

/// Largest flat modifier (either sign) a notation may carry.
pub const MAX_MODIFIER: i32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("empty dice notation")]
    Empty,
    #[error("invalid dice notation '{notation}': {reason}")]
    Invalid { notation: String, reason: String },
    #[error("too many dice in '{notation}' ({count} > {max})")]
    TooManyDice {
        notation: String,
        count: u32,
        max: u32,
    },
    #[error("modifier {modifier} in '{notation}' is out of range (max ±{max})")]
    ModifierOutOfRange {
        notation: String,
        modifier: i64,
        max: i32,
    },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl AdMode {
    /// Combine two sources: advantage cancels disadvantage, identical modes do not stack.
    pub fn combine(self, other: AdMode) -> AdMode {
        use AdMode::*;
        match (self, other) {
            (Disadvantage, Advantage) | (Advantage, Disadvantage) => Normal,
            (Normal, x) => x,
            (x, Normal) => x,
            (Advantage, Advantage) => Advantage,
            (Disadvantage, Disadvantage) => Disadvantage,
        }
    }
}

impl fmt::Display for AdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdMode::Normal => write!(f, "normal"),
            AdMode::Advantage => write!(f, "advantage"),
            AdMode::Disadvantage => write!(f, "disadvantage"),
        }
    }
}

impl FromStr for AdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "" => Ok(AdMode::Normal),
            "advantage" | "adv" => Ok(AdMode::Advantage),
            "disadvantage" | "dis" => Ok(AdMode::Disadvantage),
            other => Err(format!("unknown advantage mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Seeded(ChaCha8Rng),
    Scripted { faces: Vec<u32>, cursor: usize },
}

/// The randomness source threaded through every rules operation.
#[derive(Debug, Clone)]
pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Dice that return `faces` in order, cycling when exhausted. Each face is
    /// clamped into the range of the die being rolled.
    pub fn from_scripted(faces: Vec<u32>) -> Self {
        Self {
            source: Source::Scripted { faces, cursor: 0 },
        }
    }

    /// Roll one die with `sides` faces.
    pub fn die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(1..=sides),
            Source::Scripted { faces, cursor } => {
                if faces.is_empty() {
                    return 1;
                }
                let face = faces[*cursor % faces.len()];
                *cursor += 1;
                face.clamp(1, sides)
            }
        }
    }

    /// Roll a d20 under `mode`. Returns the kept face and, for advantage or
    /// disadvantage, the discarded one.
    pub fn d20(&mut self, mode: AdMode) -> (u32, Option<u32>) {
        match mode {
            AdMode::Normal => (self.die(20), None),
            AdMode::Advantage => {
                let a = self.die(20);
                let b = self.die(20);
                (a.max(b), Some(a.min(b)))
            }
            AdMode::Disadvantage => {
                let a = self.die(20);
                let b = self.die(20);
                (a.min(b), Some(a.max(b)))
            }
        }
    }

    /// Strict roll: malformed notation is an error.
    pub fn try_roll(&mut self, notation: &str, mode: AdMode) -> Result<Roll, DiceError> {
        let expr = DiceExpr::parse(notation)?;
        Ok(self.roll_expr(&expr, mode))
    }

    /// Lenient roll: malformed notation yields a zero roll flagged `malformed`.
    pub fn roll(&mut self, notation: &str, mode: AdMode) -> Roll {
        match self.try_roll(notation, mode) {
            Ok(roll) => roll,
            Err(err) => {
                warn!(%notation, error = %err, "malformed dice notation, rolling zero");
                Roll::malformed(notation)
            }
        }
    }

    pub fn roll_expr(&mut self, expr: &DiceExpr, mode: AdMode) -> Roll {
        if expr.is_single_d20() {
            let (kept, discarded) = self.d20(mode);
            let natural = kept as i32;
            return Roll {
                notation: expr.to_string(),
                dice: vec![kept],
                discarded,
                natural,
                modifier: expr.modifier,
                total: natural.saturating_add(expr.modifier),
                mode,
                critical: kept == 20,
                fumble: kept == 1,
                malformed: false,
            };
        }

        let dice = self.roll_terms(&expr.terms);
        let natural = dice.iter().map(|&d| d as i32).sum::<i32>();
        Roll {
            notation: expr.to_string(),
            dice,
            discarded: None,
            natural,
            modifier: expr.modifier,
            total: natural.saturating_add(expr.modifier),
            mode: AdMode::Normal,
            critical: false,
            fumble: false,
            malformed: false,
        }
    }

    pub fn try_roll_damage(
        &mut self,
        notation: &str,
        critical: bool,
    ) -> Result<DamageRoll, DiceError> {
        let expr = DiceExpr::parse(notation)?;
        Ok(self.roll_damage_expr(&expr, critical))
    }

    pub fn roll_damage(&mut self, notation: &str, critical: bool) -> DamageRoll {
        match self.try_roll_damage(notation, critical) {
            Ok(roll) => roll,
            Err(err) => {
                warn!(%notation, error = %err, "malformed damage notation, rolling zero");
                DamageRoll::malformed(notation, critical)
            }
        }
    }

    /// Roll damage. On a critical hit every dice term is rolled twice as
    /// many times; the flat modifier is added once.
    pub fn roll_damage_expr(&mut self, expr: &DiceExpr, critical: bool) -> DamageRoll {
        let rolled = if critical { expr.doubled() } else { expr.clone() };
        let dice = self.roll_terms(&rolled.terms);
        let sum = dice.iter().map(|&d| d as i32).sum::<i32>();
        DamageRoll {
            notation: expr.to_string(),
            dice,
            modifier: expr.modifier,
            total: sum.saturating_add(expr.modifier).max(0),
            critical,
            malformed: false,
        }
    }

    fn roll_terms(&mut self, terms: &[DiceTerm]) -> Vec<u32> {
        let mut out = Vec::new();
        for term in terms {
            for _ in 0..term.count {
                out.push(self.die(term.sides));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
}

/// Parsed notation: any number of `NdM` terms plus one flat modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpr {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
}

impl DiceExpr {
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let cleaned: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if cleaned.is_empty() {
            return Err(DiceError::Empty);
        }
        let invalid = |reason: &str| DiceError::Invalid {
            notation: notation.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens: Vec<(i32, &str)> = Vec::new();
        let mut sign = 1;
        let mut start = 0;
        for (i, ch) in cleaned.char_indices() {
            if ch != '+' && ch != '-' {
                continue;
            }
            let token = &cleaned[start..i];
            if token.is_empty() {
                // A single leading sign ("-1") is allowed; "1d6++2" is not.
                if i != 0 {
                    return Err(invalid("missing term between operators"));
                }
            } else {
                tokens.push((sign, token));
            }
            sign = if ch == '+' { 1 } else { -1 };
            start = i + 1;
        }
        let last = &cleaned[start..];
        if last.is_empty() {
            return Err(invalid("trailing operator"));
        }
        tokens.push((sign, last));

        let mut terms = Vec::new();
        let mut modifier: i64 = 0;
        for (sign, token) in tokens {
            if let Some((count, sides)) = token.split_once('d') {
                if sign < 0 {
                    return Err(invalid("dice terms cannot be subtracted"));
                }
                let count: u32 = if count.is_empty() {
                    1
                } else {
                    count.parse().map_err(|_| invalid("bad dice count"))?
                };
                let sides: u32 = sides.parse().map_err(|_| invalid("bad die size"))?;
                if sides == 0 {
                    return Err(invalid("dice need at least one side"));
                }
                if count > MAX_DICE_PER_TERM {
                    return Err(DiceError::TooManyDice {
                        notation: notation.to_string(),
                        count,
                        max: MAX_DICE_PER_TERM,
                    });
                }
                terms.push(DiceTerm { count, sides });
            } else {
                let value: i64 = token.parse().map_err(|_| invalid("bad modifier"))?;
                modifier = modifier.saturating_add(i64::from(sign) * value);
            }
        }
        if modifier.unsigned_abs() > MAX_MODIFIER.unsigned_abs() as u64 {
            return Err(DiceError::ModifierOutOfRange {
                notation: notation.to_string(),
                modifier,
                max: MAX_MODIFIER,
            });
        }

        Ok(Self {
            terms,
            modifier: modifier as i32,
        })
    }

    /// `1d20` plus a flat modifier.
    pub fn d20(modifier: i32) -> Self {
        Self {
            terms: vec![DiceTerm { count: 1, sides: 20 }],
            modifier,
        }
    }

    pub fn is_single_d20(&self) -> bool {
        matches!(self.terms.as_slice(), [DiceTerm { count: 1, sides: 20 }])
    }

    pub fn with_modifier(mut self, extra: i32) -> Self {
        self.modifier = self.modifier.saturating_add(extra);
        self
    }

    /// Add `extra` dice to the first term (`3d6` + 2 → `5d6`).
    pub fn with_extra_dice(mut self, extra: u32) -> Self {
        if let Some(first) = self.terms.first_mut() {
            first.count = (first.count + extra).min(MAX_DICE_PER_TERM);
        }
        self
    }

    /// Multiply the first term's dice count (`1d10` × 3 → `3d10`).
    pub fn with_dice_multiplier(mut self, factor: u32) -> Self {
        if let Some(first) = self.terms.first_mut() {
            first.count = (first.count * factor.max(1)).min(MAX_DICE_PER_TERM);
        }
        self
    }

    pub fn doubled(&self) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|t| DiceTerm {
                    count: t.count * 2,
                    sides: t.sides,
                })
                .collect(),
            modifier: self.modifier,
        }
    }

    pub fn dice_count(&self) -> u32 {
        self.terms.iter().map(|t| t.count).sum()
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpr::parse(s)
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for term in &self.terms {
            if wrote {
                write!(f, "+")?;
            }
            write!(f, "{}d{}", term.count, term.sides)?;
            wrote = true;
        }
        match (wrote, self.modifier) {
            (false, m) => write!(f, "{m}"),
            (true, 0) => Ok(()),
            (true, m) if m > 0 => write!(f, "+{m}"),
            (true, m) => write!(f, "-{}", m.abs()),
        }
    }
}

/// Result of a check/attack-style roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    pub notation: String,
    /// Faces that count towards the total.
    pub dice: Vec<u32>,
    /// The d20 thrown away by advantage or disadvantage.
    pub discarded: Option<u32>,
    pub natural: i32,
    pub modifier: i32,
    pub total: i32,
    pub mode: AdMode,
    pub critical: bool,
    pub fumble: bool,
    #[serde(default)]
    pub malformed: bool,
}

impl Roll {
    /// Synthetic roll used for automatic failures.
    pub fn zero(notation: &str) -> Self {
        Self {
            notation: notation.to_string(),
            dice: Vec::new(),
            discarded: None,
            natural: 0,
            modifier: 0,
            total: 0,
            mode: AdMode::Normal,
            critical: false,
            fumble: false,
            malformed: false,
        }
    }

    fn malformed(notation: &str) -> Self {
        Self {
            malformed: true,
            ..Self::zero(notation)
        }
    }

    pub fn meets(&self, dc: i32) -> bool {
        self.total >= dc
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let faces = self
            .dice
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{faces}]")?;
        if let Some(dropped) = self.discarded {
            write!(f, " (dropped {dropped})")?;
        }
        if self.modifier != 0 {
            write!(f, " {:+}", self.modifier)?;
        }
        write!(f, " = {}", self.total)
    }
}

/// Result of a damage (or healing) roll. Totals never go below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub notation: String,
    pub dice: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub critical: bool,
    #[serde(default)]
    pub malformed: bool,
}

impl DamageRoll {
    fn malformed(notation: &str, critical: bool) -> Self {
        Self {
            notation: notation.to_string(),
            dice: Vec::new(),
            modifier: 0,
            total: 0,
            critical,
            malformed: true,
        }
    }
}

impl fmt::Display for DamageRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.critical { "crit " } else { "" };
        let faces = self
            .dice
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{prefix}{} [{faces}]", self.notation)?;
        if self.modifier != 0 {
            write!(f, " {:+}", self.modifier)?;
        }
        write!(f, " = {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_term_with_modifier() {
        let expr = DiceExpr::parse("1d20+5").unwrap();
        assert_eq!(expr.terms, vec![DiceTerm { count: 1, sides: 20 }]);
        assert_eq!(expr.modifier, 5);
        assert!(expr.is_single_d20());

        let expr = DiceExpr::parse("2d6-2").unwrap();
        assert_eq!(expr.modifier, -2);
    }

    #[test]
    fn parses_multi_term_damage() {
        let expr = DiceExpr::parse("1d8 + 1d6 + 4").unwrap();
        assert_eq!(expr.terms.len(), 2);
        assert_eq!(expr.modifier, 4);
        assert_eq!(expr.to_string(), "1d8+1d6+4");
    }

    #[test]
    fn implicit_count_is_one() {
        let expr = DiceExpr::parse("d20").unwrap();
        assert!(expr.is_single_d20());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(DiceExpr::parse(""), Err(DiceError::Empty));
        assert!(DiceExpr::parse("2x6").is_err());
        assert!(DiceExpr::parse("1d").is_err());
        assert!(DiceExpr::parse("1d0").is_err());
        assert!(DiceExpr::parse("1d6++2").is_err());
        assert!(DiceExpr::parse("1d6+").is_err());
        assert!(DiceExpr::parse("3-1d6").is_err());
        assert!(matches!(
            DiceExpr::parse("500d6"),
            Err(DiceError::TooManyDice { count: 500, .. })
        ));
    }

    #[test]
    fn scripted_faces_cycle_and_clamp() {
        let mut dice = Dice::from_scripted(vec![3, 9]);
        assert_eq!(dice.die(6), 3);
        assert_eq!(dice.die(6), 6);
        assert_eq!(dice.die(20), 3);
    }

    #[test]
    fn seeded_dice_repeat() {
        let mut a = Dice::from_seed(7);
        let mut b = Dice::from_seed(7);
        let xs: Vec<u32> = (0..10).map(|_| a.die(20)).collect();
        let ys: Vec<u32> = (0..10).map(|_| b.die(20)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (1..=20).contains(x)));
    }
}
