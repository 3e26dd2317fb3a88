#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn d20() -> Command {
    Command::cargo_bin("d20").unwrap()
}

/// Write a sample character into `dir` and return its path.
fn sample(dir: &TempDir, class: &str, name: &str) -> PathBuf {
    let path = dir.path().join(format!("{}.json", name.to_lowercase()));
    d20()
        .args(["sample", "--class", class, "--name", name, "--out"])
        .arg(&path)
        .assert()
        .success();
    path
}

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// dice
// ---------------------------------------------------------------------------

#[test]
fn roll_prints_one_line_per_roll() {
    d20()
        .args(["roll", "2d6+3", "--rolls", "3", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^(\[\d+, \d+\] \+3 = \d+\n){3}$").unwrap());
}

#[test]
fn roll_is_repeatable_for_a_seed() {
    let first = d20().args(["roll", "4d6", "--seed", "99"]).output().unwrap();
    let second = d20().args(["roll", "4d6", "--seed", "99"]).output().unwrap();
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn malformed_notation_is_an_error() {
    d20()
        .args(["roll", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn damage_json_marks_crit() {
    d20()
        .args(["--json", "damage", "1d8+2", "--crit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"critical\":true"));
}

// ---------------------------------------------------------------------------
// characters
// ---------------------------------------------------------------------------

#[test]
fn sample_prints_character_json() {
    d20()
        .args(["sample", "--class", "wizard", "--race", "elf", "--name", "Morgan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"morgan\""))
        .stdout(predicate::str::contains("\"class\": \"wizard\""));
}

#[test]
fn easy_check_succeeds() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["check", "--ability", "str", "--dc", "1", "--file"])
        .arg(&aria)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[CHECK][Aria] STR check DC 1"))
        .stdout(predicate::str::contains("SUCCESS"));
}

#[test]
fn save_as_json() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    let out = d20()
        .args(["--json", "save", "--ability", "con", "--dc", "30", "--file"])
        .arg(&aria)
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["success"], false);
    assert_eq!(v["proficient"], true);
}

#[test]
fn hurt_then_heal_updates_the_file() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["hurt", "--amount", "5", "--file"])
        .arg(&aria)
        .assert()
        .success()
        .stdout("[DMG][Aria] 12 → 7 (−5)\n");
    assert_eq!(read(&aria)["hp"]["current"], 7);

    d20()
        .args(["heal", "--amount", "3", "--file"])
        .arg(&aria)
        .assert()
        .success()
        .stdout("[HEAL][Aria] +3 HP (7 → 10)\n");
    assert_eq!(read(&aria)["hp"]["current"], 10);
}

#[test]
fn dry_run_leaves_state_alone() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["--dry-run", "hurt", "--amount", "5", "--file"])
        .arg(&aria)
        .assert()
        .success();
    assert_eq!(read(&aria)["hp"]["current"], 12);
}

#[test]
fn level_up_needs_experience() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["level-up", "--file"])
        .arg(&aria)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Aria needs 300 XP to reach level 2 (has 0)"));
}

#[test]
fn long_rest_at_full_health() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["rest", "--long", "--file"])
        .arg(&aria)
        .assert()
        .success()
        .stdout("[REST][Aria] long rest: +0 HP, recovered 0 hit dice\n");
}

#[test]
fn second_wind_runs_out() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["use-feature", "--feature", "second_wind", "--file"])
        .arg(&aria)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 use(s) left"));
    d20()
        .args(["use-feature", "--feature", "second_wind", "--file"])
        .arg(&aria)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no uses of 'second_wind' left"));
}

// ---------------------------------------------------------------------------
// spells
// ---------------------------------------------------------------------------

#[test]
fn cast_unknown_to_caster_is_refused() {
    let dir = TempDir::new().unwrap();
    let morgan = sample(&dir, "wizard", "Morgan");
    d20()
        .args(["cast", "--spell", "cure_wounds", "--file"])
        .arg(&morgan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Morgan does not know the spell 'cure_wounds'"));
}

#[test]
fn healing_word_spends_a_slot() {
    let dir = TempDir::new().unwrap();
    let tam = sample(&dir, "cleric", "Tam");
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["hurt", "--amount", "6", "--file"])
        .arg(&aria)
        .assert()
        .success();
    d20()
        .args(["cast", "--spell", "healing_word", "--file"])
        .arg(&tam)
        .arg("--target")
        .arg(&aria)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[CAST][Tam] healing_word (slot 1) → heals"));
    assert_eq!(read(&tam)["spell_slots"][0]["current"], 1);
    assert!(read(&aria)["hp"]["current"].as_i64().unwrap() > 6);
}

// ---------------------------------------------------------------------------
// encounters
// ---------------------------------------------------------------------------

#[test]
fn encounter_round_trip() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    let combat = dir.path().join("combat.json");

    d20()
        .args(["encounter", "--monster", "goblin", "--environment", "cave", "--party"])
        .arg(&aria)
        .arg("--out")
        .arg(&combat)
        .assert()
        .success()
        .stdout(predicate::str::contains("[INIT][Aria]"))
        .stdout(predicate::str::contains("[INIT][Goblin 1]"))
        .stdout(predicate::str::contains("[ROUND] 1 →"));
    let state = read(&combat);
    assert_eq!(state["enemies"][0]["id"], "goblin-1");
    assert_eq!(state["environment"], "cave");

    d20()
        .args(["attack", "--target", "goblin-1", "--combat"])
        .arg(&combat)
        .arg("--file")
        .arg(&aria)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[ATTACK][Aria]"));

    d20()
        .args(["next-turn", "--combat"])
        .arg(&combat)
        .assert()
        .success();

    d20()
        .args(["end-combat", "--combat"])
        .arg(&combat)
        .arg("--party")
        .arg(&aria)
        .assert()
        .success()
        .stdout(predicate::str::contains("[END]"));
    assert_eq!(read(&combat)["phase"], "ended");
}

#[test]
fn attacking_a_missing_enemy_fails() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    let combat = dir.path().join("combat.json");
    d20()
        .args(["encounter", "--monster", "goblin", "--party"])
        .arg(&aria)
        .arg("--out")
        .arg(&combat)
        .assert()
        .success();
    d20()
        .args(["attack", "--target", "orc-1", "--combat"])
        .arg(&combat)
        .arg("--file")
        .arg(&aria)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no combatant with id 'orc-1'"));
}

#[test]
fn unknown_monster_is_rejected() {
    let dir = TempDir::new().unwrap();
    let aria = sample(&dir, "fighter", "Aria");
    d20()
        .args(["encounter", "--monster", "tarrasque", "--party"])
        .arg(&aria)
        .arg("--out")
        .arg(dir.path().join("combat.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown monster 'tarrasque'"));
}

// ---------------------------------------------------------------------------
// simulate-vs
// ---------------------------------------------------------------------------

#[test]
fn simulate_vs_reports_rates() {
    Command::cargo_bin("simulate-vs")
        .unwrap()
        .args(["--trials", "25", "--monster", "goblin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trials:             25"))
        .stdout(predicate::str::contains("win rate:"))
        .stdout(predicate::str::contains("opponents:          goblin"));
}
