mod common;

use std::collections::BTreeSet;

use common::{catalog, fighter};
use d20_engine::api;
use d20_engine::enemy::Enemy;
use d20_engine::life::{self, DeathSaveResult};
use d20_engine::{Condition, DamageType, Dice, LifeState, RulesError};
use proptest::prelude::*;

/// Fighter knocked to 0 HP and rolling death saves.
fn dying() -> d20_engine::Character {
    let mut aria = fighter();
    life::apply_damage(&mut aria, 12, false);
    assert!(aria.is_dying());
    aria
}

#[test]
fn damage_reduces_hit_points() {
    let mut aria = fighter();
    let report = life::apply_damage(&mut aria, 5, false);
    assert_eq!(aria.hp.current, 7);
    assert!(!report.dropped_to_zero);
    insta::assert_snapshot!(report.to_string(), @"[DMG][Aria] 12 → 7 (−5)");
}

#[test]
fn dropping_to_zero_knocks_out_and_knocks_down() {
    let mut aria = fighter();
    let report = life::apply_damage(&mut aria, 23, false);
    assert!(report.dropped_to_zero && !report.killed);
    assert_eq!(aria.hp.current, 0);
    assert_eq!(aria.life, LifeState::Unconscious { stable: false });
    assert!(aria.conditions.contains(&Condition::Unconscious));
    assert!(aria.conditions.contains(&Condition::Prone));
}

#[test]
fn massive_damage_kills_outright() {
    let mut aria = fighter();
    let report = life::apply_damage(&mut aria, 24, false);
    assert!(report.killed && report.massive_damage);
    assert!(aria.is_dead());
    insta::assert_snapshot!(report.to_string(), @"[DMG][Aria] 12 → 0 (−24) → DEAD (massive damage)");
}

#[test]
fn temporary_hit_points_soak_first() {
    let mut aria = fighter();
    aria.hp.temp = 5;
    let report = life::apply_damage(&mut aria, 8, false);
    assert_eq!(report.absorbed_by_temp, 5);
    assert_eq!(aria.hp.temp, 0);
    assert_eq!(aria.hp.current, 9);
}

#[test]
fn hits_while_down_are_failed_death_saves() {
    let mut aria = dying();
    let report = life::apply_damage(&mut aria, 3, false);
    assert_eq!(report.death_save_failures, 1);
    assert_eq!(aria.death_saves.failures, 1);

    let report = life::apply_damage(&mut aria, 3, true);
    assert_eq!(report.death_save_failures, 2);
    assert!(aria.is_dead());
}

#[test]
fn damage_reopens_a_stable_character() {
    let mut aria = dying();
    life::stabilize(&mut aria).unwrap();
    assert!(!aria.is_dying());
    life::apply_damage(&mut aria, 1, false);
    assert!(aria.is_dying());
    assert_eq!(aria.death_saves.failures, 1);
}

#[test]
fn natural_20_death_save_wakes_with_one_hp() {
    let aria = dying();
    let mut dice = Dice::from_scripted(vec![20]);
    let step = api::roll_death_save(&mut dice, &aria).unwrap();
    assert_eq!(step.result.result, DeathSaveResult::Revived);
    assert_eq!(step.state.hp.current, 1);
    assert_eq!(step.state.life, LifeState::Conscious);
    assert_eq!(step.state.death_saves.successes, 0);
    assert_eq!(step.state.death_saves.failures, 0);
    assert!(!step.state.conditions.contains(&Condition::Unconscious));
    insta::assert_snapshot!(step.result.to_string(), @"[DEATHSAVE][Aria] roll=20 → NAT20 → regain 1 HP & wake (S=0, F=0)");

    // The input was left alone.
    assert_eq!(aria.hp.current, 0);
}

#[test]
fn natural_1_counts_twice() {
    let aria = dying();
    let mut dice = Dice::from_scripted(vec![1, 1]);
    let step = api::roll_death_save(&mut dice, &aria).unwrap();
    assert_eq!(step.result.result, DeathSaveResult::DoubleFailure);
    assert_eq!(step.state.death_saves.failures, 2);
    let step = api::roll_death_save(&mut dice, &step.state).unwrap();
    assert!(step.result.dead);
    assert!(step.state.is_dead());
}

#[test]
fn three_plain_failures_kill() {
    let mut aria = dying();
    let mut dice = Dice::from_scripted(vec![9, 5, 2]);
    for _ in 0..2 {
        let report = life::roll_death_save(&mut dice, &mut aria).unwrap();
        assert_eq!(report.result, DeathSaveResult::Failure);
        assert!(!report.dead);
    }
    let report = life::roll_death_save(&mut dice, &mut aria).unwrap();
    assert!(report.dead);
    insta::assert_snapshot!(report.to_string(), @"[DEATHSAVE][Aria] roll=2 → DEAD");
}

#[test]
fn three_successes_stabilize_and_stop_the_rolls() {
    let mut aria = dying();
    let mut dice = Dice::from_scripted(vec![10, 15, 19]);
    let mut last = None;
    for _ in 0..3 {
        last = Some(life::roll_death_save(&mut dice, &mut aria).unwrap());
    }
    assert!(last.unwrap().stabilized);
    assert_eq!(aria.life, LifeState::Unconscious { stable: true });
    assert_eq!(aria.hp.current, 0);
    assert_eq!(
        life::roll_death_save(&mut dice, &mut aria),
        Err(RulesError::NotDying { name: "Aria".into() })
    );
}

#[test]
fn reopened_wounds_start_a_fresh_count() {
    let mut aria = dying();
    let mut dice = Dice::from_scripted(vec![12, 14, 16, 5]);
    for _ in 0..3 {
        life::roll_death_save(&mut dice, &mut aria).unwrap();
    }
    assert_eq!(aria.death_saves, Default::default());

    life::apply_damage(&mut aria, 1, false);
    assert!(aria.is_dying());
    assert_eq!(aria.death_saves.successes, 0);
    assert_eq!(aria.death_saves.failures, 1);

    let report = life::roll_death_save(&mut dice, &mut aria).unwrap();
    assert_eq!(report.result, DeathSaveResult::Failure);
    assert!(!report.stabilized);
    assert_eq!(aria.life, LifeState::Unconscious { stable: false });
    insta::assert_snapshot!(report.to_string(), @"[DEATHSAVE][Aria] roll=5 → failure (S=0, F=2)");
}

#[test]
fn stabilizing_clears_the_tally() {
    let mut aria = dying();
    let mut dice = Dice::from_scripted(vec![15, 3]);
    life::roll_death_save(&mut dice, &mut aria).unwrap();
    life::roll_death_save(&mut dice, &mut aria).unwrap();
    life::stabilize(&mut aria).unwrap();
    assert_eq!(aria.death_saves.successes, 0);
    assert_eq!(aria.death_saves.failures, 0);
}

#[test]
fn healing_wakes_and_reports_overheal() {
    let aria = dying();
    let step = api::heal(&aria, 20).unwrap();
    assert_eq!(step.state.hp.current, 12);
    assert_eq!(step.result.amount, 12);
    assert_eq!(step.result.overheal, 8);
    assert!(step.result.regained_consciousness);
    assert_eq!(step.state.life, LifeState::Conscious);
    // Still lying down until they stand.
    assert!(step.state.conditions.contains(&Condition::Prone));
}

#[test]
fn the_dead_stay_dead() {
    let mut aria = fighter();
    life::apply_damage(&mut aria, 100, false);
    assert_eq!(api::heal(&aria, 5), Err(RulesError::TargetIsDead { name: "Aria".into() }));
}

#[test]
fn damage_adjustment_order_is_fixed() {
    let fire: BTreeSet<_> = [DamageType::Fire].into_iter().collect();
    let none = BTreeSet::new();
    // Halve (floor) first, then double.
    assert_eq!(life::adjust_damage(7, DamageType::Fire, &fire, &fire, &none), 6);
    assert_eq!(life::adjust_damage(7, DamageType::Fire, &fire, &none, &none), 3);
    assert_eq!(life::adjust_damage(7, DamageType::Fire, &none, &fire, &none), 14);
    assert_eq!(life::adjust_damage(7, DamageType::Fire, &fire, &fire, &fire), 0);
    assert_eq!(life::adjust_damage(7, DamageType::Cold, &fire, &fire, &fire), 7);
}

#[test]
fn skeletons_shatter_and_shrug_off_poison() {
    let template = catalog().monster("skeleton").unwrap();
    let mut skeleton = Enemy::from_template("skeleton-1", "Skeleton 1", template);
    let poisoned = life::apply_damage_to_enemy(&mut skeleton, 9, DamageType::Poison);
    assert!(poisoned.immune);
    assert_eq!(skeleton.hp, 13);

    let smashed = life::apply_damage_to_enemy(&mut skeleton, 7, DamageType::Bludgeoning);
    assert_eq!(smashed.dealt, 14);
    assert_eq!(skeleton.hp, 0);
    assert!(smashed.defeated);
    insta::assert_snapshot!(smashed.to_string(), @"[DMG][Skeleton 1] 13 → 0 (−14 bludgeoning) vulnerable → DEFEATED");
}

proptest! {
    #[test]
    fn damage_follows_the_threshold_rule(max in 1i32..60, frac in 0.0f64..=1.0, dmg in 0i32..150) {
        let mut aria = fighter();
        aria.hp.max = max;
        let current = ((max as f64 * frac).round() as i32).clamp(1, max);
        aria.hp.current = current;
        life::apply_damage(&mut aria, dmg, false);
        if current - dmg <= -max {
            prop_assert!(aria.is_dead());
        } else if current - dmg <= 0 {
            prop_assert_eq!(aria.hp.current, 0);
            prop_assert!(aria.is_dying());
        } else {
            prop_assert_eq!(aria.hp.current, current - dmg);
            prop_assert_eq!(aria.life, LifeState::Conscious);
        }
    }

    #[test]
    fn immunity_always_zeroes(amount in -20i32..200, resist in any::<bool>(), vuln in any::<bool>()) {
        let acid: BTreeSet<_> = [DamageType::Acid].into_iter().collect();
        let none = BTreeSet::new();
        let r = if resist { &acid } else { &none };
        let v = if vuln { &acid } else { &none };
        prop_assert_eq!(life::adjust_damage(amount, DamageType::Acid, r, v, &acid), 0);
        prop_assert!(life::adjust_damage(amount, DamageType::Acid, r, v, &none) >= 0);
    }
}
