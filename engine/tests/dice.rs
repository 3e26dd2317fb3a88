use d20_engine::dice::{AdMode, Dice, DiceError, DiceExpr};
use proptest::prelude::*;

#[test]
fn crit_doubles_dice_but_not_the_modifier() {
    let mut dice = Dice::from_scripted(vec![1, 2, 3, 4]);
    let roll = dice.roll_damage("2d6+3", true);
    assert_eq!(roll.dice, vec![1, 2, 3, 4]);
    assert_eq!(roll.modifier, 3);
    assert_eq!(roll.total, 13);
    assert!(roll.critical);
}

#[test]
fn multi_term_damage_doubles_every_term() {
    let mut dice = Dice::from_scripted(vec![5, 6]);
    assert_eq!(dice.roll_damage("1d8+1d6+4", false).total, 15);

    let mut dice = Dice::from_scripted(vec![5, 5, 6, 6]);
    let crit = dice.roll_damage("1d8+1d6+4", true);
    assert_eq!(crit.dice.len(), 4);
    assert_eq!(crit.total, 26);
}

#[test]
fn damage_never_goes_negative() {
    let mut dice = Dice::from_scripted(vec![1]);
    assert_eq!(dice.roll_damage("1d4-3", false).total, 0);
}

#[test]
fn advantage_keeps_the_higher_die() {
    let mut dice = Dice::from_scripted(vec![4, 17]);
    let roll = dice.roll("1d20+5", AdMode::Advantage);
    assert_eq!(roll.natural, 17);
    assert_eq!(roll.discarded, Some(4));
    assert_eq!(roll.total, 22);
    insta::assert_snapshot!(roll.to_string(), @"[17] (dropped 4) +5 = 22");

    let mut dice = Dice::from_scripted(vec![4, 17]);
    let roll = dice.roll("1d20+5", AdMode::Disadvantage);
    assert_eq!(roll.natural, 4);
    assert_eq!(roll.discarded, Some(17));
}

#[test]
fn advantage_only_applies_to_a_single_d20() {
    let mut dice = Dice::from_scripted(vec![3, 5]);
    let roll = dice.roll("2d20", AdMode::Advantage);
    assert_eq!(roll.mode, AdMode::Normal);
    assert_eq!(roll.discarded, None);
    assert_eq!(roll.total, 8);
    assert!(!roll.critical);
}

#[test]
fn natural_20_and_1_are_flagged() {
    let mut dice = Dice::from_scripted(vec![20, 1]);
    let crit = dice.roll("1d20+2", AdMode::Normal);
    assert!(crit.critical && !crit.fumble);
    let fumble = dice.roll("1d20+2", AdMode::Normal);
    assert!(fumble.fumble && !fumble.critical);
    assert_eq!(fumble.total, 3);
}

#[test]
fn malformed_notation_degrades_to_a_flagged_zero() {
    let mut dice = Dice::from_seed(1);
    let roll = dice.roll("banana", AdMode::Normal);
    assert!(roll.malformed);
    assert_eq!(roll.total, 0);
    assert!(dice.try_roll("banana", AdMode::Normal).is_err());

    let dmg = dice.roll_damage("2d", false);
    assert!(dmg.malformed);
    assert_eq!(dmg.total, 0);
}

#[test]
fn oversized_pools_are_rejected() {
    assert!(matches!(
        DiceExpr::parse("101d6"),
        Err(DiceError::TooManyDice { count: 101, .. })
    ));
    assert!(DiceExpr::parse("100d6").is_ok());
}

#[test]
fn huge_modifiers_are_rejected_not_overflowed() {
    let mut dice = Dice::from_scripted(vec![20]);
    assert!(matches!(
        dice.try_roll("1d20+2147483647", AdMode::Normal),
        Err(DiceError::ModifierOutOfRange { max: 1_000, .. })
    ));
    assert!(dice.try_roll_damage("2d6-5000", false).is_err());

    let roll = dice.roll("1d20+2147483647", AdMode::Normal);
    assert!(roll.malformed);
    assert_eq!(roll.total, 0);
    let dmg = dice.roll_damage("1d6+999999", true);
    assert!(dmg.malformed);

    assert_eq!(DiceExpr::parse("1d20+1000").unwrap().modifier, 1_000);
    assert_eq!(DiceExpr::parse("1d20+900+200-150").unwrap().modifier, 950);
    let bumped = DiceExpr::parse("1d20+5").unwrap().with_modifier(i32::MAX);
    assert_eq!(dice.roll_expr(&bumped, AdMode::Normal).total, i32::MAX);
}

#[test]
fn same_seed_same_rolls() {
    let mut a = Dice::from_seed(2024);
    let mut b = Dice::from_seed(2024);
    let xs: Vec<_> = (0..20).map(|_| a.roll("3d6", AdMode::Normal).total).collect();
    let ys: Vec<_> = (0..20).map(|_| b.roll("3d6", AdMode::Normal).total).collect();
    assert_eq!(xs, ys);
}

#[test]
fn mode_combination_cancels_and_does_not_stack() {
    use AdMode::*;
    assert_eq!(Advantage.combine(Disadvantage), Normal);
    assert_eq!(Advantage.combine(Advantage), Advantage);
    for m in [Normal, Advantage, Disadvantage] {
        assert_eq!(Normal.combine(m), m);
        assert_eq!(m.combine(Normal), m);
    }
}

fn notation(count: u32, sides: u32, modifier: i32) -> String {
    if modifier >= 0 {
        format!("{count}d{sides}+{modifier}")
    } else {
        format!("{count}d{sides}{modifier}")
    }
}

proptest! {
    #[test]
    fn damage_stays_within_bounds(
        seed in any::<u64>(),
        count in 1u32..=10,
        sides in prop::sample::select(vec![4u32, 6, 8, 10, 12]),
        modifier in -5i32..=5,
        critical in any::<bool>(),
    ) {
        let mut dice = Dice::from_seed(seed);
        let roll = dice.roll_damage(&notation(count, sides, modifier), critical);
        let n = if critical { count * 2 } else { count };
        prop_assert_eq!(roll.dice.len() as u32, n);
        prop_assert!(roll.dice.iter().all(|&d| (1..=sides).contains(&d)));
        let lo = (n as i32 + modifier).max(0);
        let hi = (n * sides) as i32 + modifier;
        prop_assert!(roll.total >= lo && roll.total <= hi.max(0));
    }

    #[test]
    fn d20_total_is_natural_plus_modifier(seed in any::<u64>(), modifier in -10i32..=15) {
        let mut dice = Dice::from_seed(seed);
        let roll = dice.roll(&notation(1, 20, modifier), AdMode::Normal);
        prop_assert!((1..=20).contains(&roll.natural));
        prop_assert_eq!(roll.total, roll.natural + modifier);
        prop_assert_eq!(roll.critical, roll.natural == 20);
        prop_assert_eq!(roll.fumble, roll.natural == 1);
    }
}
