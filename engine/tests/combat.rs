mod common;

use common::{catalog, fighter, rogue};
use d20_engine::api;
use d20_engine::combat::attack::{AttackOptions, AttackTarget, make_attack};
use d20_engine::combat::{CombatOutcome, CombatPhase, ParticipantKind};
use d20_engine::{AdMode, CombatState, DamageType, Dice, RulesError};

/// Aria and Vex against two goblins. Initiative: Vex 18, Goblin 1 14,
/// Aria 12, Goblin 2 5.
fn skirmish() -> CombatState {
    let mut dice = Dice::from_scripted(vec![10, 15, 12, 3]);
    api::start_combat(&mut dice, catalog(), &[fighter(), rogue()], &["goblin", "goblin"], "cave mouth").unwrap()
}

fn order(combat: &CombatState) -> Vec<&str> {
    combat.initiative.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn initiative_sorts_descending() {
    let combat = skirmish();
    assert_eq!(combat.phase, CombatPhase::Active);
    assert_eq!(combat.round, 1);
    assert_eq!(combat.turn_index, 0);
    assert_eq!(order(&combat), vec!["vex", "goblin-1", "aria", "goblin-2"]);
    assert_eq!(combat.enemy("goblin-2").unwrap().name, "Goblin 2");
    insta::assert_snapshot!(combat.log.join("\n"), @r"
    [INIT][Aria] d20=10 +2 = 12
    [INIT][Vex] d20=15 +3 = 18
    [INIT][Goblin 1] d20=12 +2 = 14
    [INIT][Goblin 2] d20=3 +2 = 5
    [ROUND] 1 → Vex
    ");
}

#[test]
fn initiative_ties_keep_players_first() {
    let mut dice = Dice::from_scripted(vec![10, 10]);
    let combat = api::start_combat(&mut dice, catalog(), &[fighter()], &["goblin"], "road").unwrap();
    assert_eq!(combat.initiative[0].initiative, combat.initiative[1].initiative);
    assert_eq!(order(&combat), vec!["aria", "goblin-1"]);
}

#[test]
fn turns_wrap_into_new_rounds() {
    let mut combat = skirmish();
    for expected in ["goblin-1", "aria", "goblin-2"] {
        let step = api::advance_turn(&combat).unwrap();
        assert_eq!(step.result.current.id, expected);
        assert!(!step.result.new_round);
        combat = step.state;
    }
    assert!(combat.initiative[..3].iter().all(|e| e.acted));

    let step = api::advance_turn(&combat).unwrap();
    assert!(step.result.new_round);
    assert_eq!(step.result.round, 2);
    assert_eq!(step.result.current.id, "vex");
    assert!(step.state.initiative.iter().all(|e| !e.acted));
}

#[test]
fn combat_must_be_running() {
    let idle = CombatState::new("camp");
    assert_eq!(api::advance_turn(&idle).unwrap_err(), RulesError::CombatNotActive);
    let mut dice = Dice::from_seed(1);
    let err = api::attack(&mut dice, catalog(), &idle, &fighter(), None, "goblin-1", AttackOptions::default())
        .unwrap_err();
    assert_eq!(err, RulesError::CombatNotActive);

    let mut empty = CombatState::new("void");
    assert_eq!(empty.begin(&mut dice, &[]), Err(RulesError::NoCombatants));
}

#[test]
fn no_spawning_once_started() {
    let mut combat = skirmish();
    let goblin = catalog().monster("goblin").unwrap();
    assert_eq!(combat.spawn_enemy(goblin), Err(RulesError::CombatAlreadyStarted));

    let mut dice = Dice::from_seed(3);
    let err = api::start_combat(&mut dice, catalog(), &[fighter()], &["beholder"], "lair").unwrap_err();
    assert_eq!(err, RulesError::UnknownMonster { id: "beholder".into() });
}

#[test]
fn enemy_ids_count_per_encounter() {
    let goblin = catalog().monster("goblin").unwrap();
    let wolf = catalog().monster("wolf").unwrap();
    let mut a = CombatState::new("a");
    let mut b = CombatState::new("b");
    assert_eq!(a.spawn_enemy(goblin).unwrap(), "goblin-1");
    assert_eq!(a.spawn_enemy(wolf).unwrap(), "wolf-1");
    assert_eq!(a.spawn_enemy(goblin).unwrap(), "goblin-2");
    assert_eq!(b.spawn_enemy(goblin).unwrap(), "goblin-1");
}

#[test]
fn fighter_crits_a_goblin() {
    let combat = skirmish();
    let aria = fighter();
    let mut dice = Dice::from_scripted(vec![20, 6, 3]);
    let step = api::attack(&mut dice, catalog(), &combat, &aria, None, "goblin-1", AttackOptions::default()).unwrap();
    let hit = &step.result;
    assert!(hit.hit && hit.critical);
    assert_eq!(hit.attack_bonus, 4);
    assert_eq!(hit.damage.as_ref().unwrap().dice, vec![6, 3]);
    assert_eq!(hit.total_damage, 11);
    assert_eq!(hit.damage_type, DamageType::Slashing);
    let tail = &step.state.log[step.state.log.len() - 2..];
    insta::assert_snapshot!(tail.join("\n"), @r"
    [ATTACK][Aria] d20=20 → CRIT! to-hit=24 vs AC=15 ✔
    [DMG][Aria] crit: rolled 1d8+2 = 11 [slashing]
    ");

    let step = api::apply_damage_to_enemy(&step.state, "goblin-1", hit.total_damage, hit.damage_type).unwrap();
    assert!(step.result.defeated);
    assert_eq!(order(&step.state), vec!["vex", "aria", "goblin-2"]);
    assert!(step.state.enemy("goblin-1").is_some());
    assert_eq!(
        step.state.log.last().map(String::as_str),
        Some("[REMOVE][Goblin 1] leaves the initiative order")
    );
}

#[test]
fn natural_1_always_misses() {
    let aria = fighter();
    let target = AttackTarget {
        name: "Scarecrow".into(),
        armor_class: 5,
        conditions: Default::default(),
    };
    let mut dice = Dice::from_scripted(vec![1]);
    let out = make_attack(&mut dice, catalog(), &aria, None, &target, AttackOptions::default()).unwrap();
    assert!(!out.hit);
    assert_eq!(out.total_damage, 0);
    insta::assert_snapshot!(out.to_string(), @"[ATTACK][Aria] d20=1 → MISS (NAT1) to-hit=5 vs AC=5 ✖");
}

#[test]
fn versatile_weapons_need_a_free_hand() {
    let mut aria = fighter();
    let target = AttackTarget {
        name: "Dummy".into(),
        armor_class: 10,
        conditions: Default::default(),
    };
    let two_hands = AttackOptions {
        two_handed: true,
        ..AttackOptions::default()
    };
    let mut dice = Dice::from_scripted(vec![15, 10]);
    let out = make_attack(&mut dice, catalog(), &aria, None, &target, two_hands).unwrap();
    assert_eq!(out.damage.unwrap().notation, "1d10+2");

    d20_engine::inventory::equip(catalog(), &mut aria, "shield").unwrap();
    let mut dice = Dice::from_scripted(vec![15, 10]);
    let out = make_attack(&mut dice, catalog(), &aria, None, &target, two_hands).unwrap();
    assert_eq!(out.damage.unwrap().notation, "1d8+2");
}

#[test]
fn sneak_attack_needs_an_ally() {
    let vex = rogue();
    let goblin = catalog().monster("goblin").unwrap();
    let target = AttackTarget {
        name: goblin.name.clone(),
        armor_class: goblin.armor_class,
        conditions: Default::default(),
    };
    let with_ally = AttackOptions {
        party_size: 2,
        ..AttackOptions::default()
    };
    let mut dice = Dice::from_scripted(vec![15, 5, 4]);
    let out = make_attack(&mut dice, catalog(), &vex, None, &target, with_ally).unwrap();
    assert_eq!(out.attack_bonus, 5);
    assert_eq!(out.sneak_attack.as_ref().unwrap().total, 4);
    assert_eq!(out.total_damage, 5 + 3 + 4);

    let mut dice = Dice::from_scripted(vec![15, 5, 4]);
    let alone = make_attack(&mut dice, catalog(), &vex, None, &target, AttackOptions::default()).unwrap();
    assert!(alone.sneak_attack.is_none());
    assert_eq!(alone.total_damage, 8);

    let used = AttackOptions {
        sneak_attack_used: true,
        ..with_ally
    };
    let mut dice = Dice::from_scripted(vec![15, 5, 4]);
    let again = make_attack(&mut dice, catalog(), &vex, None, &target, used).unwrap();
    assert!(again.sneak_attack.is_none());
}

#[test]
fn weapons_must_be_carried() {
    let aria = fighter();
    let target = AttackTarget {
        name: "Dummy".into(),
        armor_class: 10,
        conditions: Default::default(),
    };
    let mut dice = Dice::from_seed(9);
    let err = make_attack(&mut dice, catalog(), &aria, Some("greataxe"), &target, AttackOptions::default()).unwrap_err();
    assert!(matches!(err, RulesError::ItemNotInInventory { .. }));
    let err = make_attack(&mut dice, catalog(), &aria, Some("rope"), &target, AttackOptions::default()).unwrap_err();
    assert_eq!(err, RulesError::NotAWeapon { item: "rope".into() });
}

#[test]
fn goblin_slashes_back() {
    let combat = skirmish();
    let aria = fighter();
    let mut dice = Dice::from_scripted(vec![8, 4]);
    let step = api::enemy_attack(&mut dice, &combat, "goblin-1", Some("Scimitar"), &aria, AdMode::Normal).unwrap();
    assert!(step.result.hit);
    assert_eq!(step.result.total_damage, 6);

    let mut dice = Dice::from_seed(0);
    let hurt = api::apply_damage(&mut dice, &aria, step.result.total_damage, step.result.critical);
    assert_eq!(hurt.state.hp.current, 6);
    assert!(hurt.result.concentration.is_none());

    let err = api::enemy_attack(&mut dice, &combat, "goblin-1", Some("Bite"), &aria, AdMode::Normal).unwrap_err();
    assert!(matches!(err, RulesError::UnknownAttack { .. }));
}

#[test]
fn victory_splits_experience() {
    let mut combat = skirmish();
    for id in ["goblin-1", "goblin-2"] {
        combat = api::apply_damage_to_enemy(&combat, id, 50, DamageType::Fire).unwrap().state;
    }
    assert_eq!(combat.should_end(), Some(CombatOutcome::Victory));

    let party = [fighter(), rogue()];
    let step = api::end_combat(&combat, &party, None).unwrap();
    let (ended, party) = step.state;
    let summary = &step.result.summary;
    assert_eq!(summary.outcome, CombatOutcome::Victory);
    assert_eq!(summary.xp_total, 100);
    assert_eq!(summary.xp_each, 50);
    assert!(party.iter().all(|c| c.experience == 50));
    assert_eq!(ended.phase, CombatPhase::Ended);
    assert!(ended.enemies.is_empty());
    insta::assert_snapshot!(summary.to_string(), @"[END] Victory after 1 round(s): 100 XP (50 each)");

    assert_eq!(api::end_combat(&ended, &party, None).unwrap_err(), RulesError::CombatNotActive);
}

#[test]
fn losing_every_player_is_defeat() {
    let mut combat = skirmish();
    for id in ["aria", "vex"] {
        combat = api::remove_combatant(&combat, id).unwrap().state;
    }
    assert!(combat.initiative.iter().all(|e| e.kind == ParticipantKind::Enemy));
    assert_eq!(combat.should_end(), Some(CombatOutcome::Defeat));
    let step = api::end_combat(&combat, &[], None).unwrap();
    assert_eq!(step.result.summary.outcome, CombatOutcome::Defeat);
    assert_eq!(step.result.summary.xp_each, 0);
}
