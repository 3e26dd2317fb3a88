//! Encounter state machine: initiative, turns and rounds, the enemy roster,
//! and the end-of-combat summary.

pub mod attack;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ability::Ability;
use crate::character::Character;
use crate::dice::{AdMode, Dice};
use crate::enemy::{Enemy, EnemyTemplate};
use crate::error::RulesError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    NotStarted,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    /// Ended by the caller before either side fell.
    Withdrawn,
}

impl fmt::Display for CombatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatOutcome::Victory => write!(f, "Victory"),
            CombatOutcome::Defeat => write!(f, "Defeat"),
            CombatOutcome::Withdrawn => write!(f, "Withdrawn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Player,
    Enemy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub id: String,
    pub name: String,
    pub kind: ParticipantKind,
    pub initiative: i32,
    #[serde(default)]
    pub acted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub round: u32,
    pub turn_index: usize,
    pub current: InitiativeEntry,
    pub new_round: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSummary {
    pub outcome: CombatOutcome,
    pub rounds: u32,
    pub xp_total: u32,
    pub xp_each: u32,
    /// Ids of the players the XP is split between.
    pub recipients: Vec<String>,
}

impl fmt::Display for CombatSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[END] {} after {} round(s): {} XP ({} each)",
            self.outcome, self.rounds, self.xp_total, self.xp_each
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    #[serde(default)]
    pub phase: CombatPhase,
    pub round: u32,
    pub turn_index: usize,
    #[serde(default)]
    pub initiative: Vec<InitiativeEntry>,
    #[serde(default)]
    pub enemies: Vec<Enemy>,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub log: Vec<String>,
    /// Per-template counters for enemy ids (`goblin-1`, `goblin-2`, ...).
    #[serde(default)]
    pub enemy_counters: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CombatOutcome>,
}

impl CombatState {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == CombatPhase::Active
    }

    pub fn record(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// Add a fresh enemy from a bestiary template. Returns its id.
    pub fn spawn_enemy(&mut self, template: &EnemyTemplate) -> Result<String, RulesError> {
        if self.phase != CombatPhase::NotStarted {
            return Err(RulesError::CombatAlreadyStarted);
        }
        let n = self.enemy_counters.entry(template.id.clone()).or_insert(0);
        *n += 1;
        let id = format!("{}-{}", template.id, n);
        let name = format!("{} {}", template.name, n);
        debug!(%id, template = %template.id, "enemy spawned");
        self.enemies.push(Enemy::from_template(id.clone(), name, template));
        Ok(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn enemy_mut(&mut self, id: &str) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    pub fn current(&self) -> Option<&InitiativeEntry> {
        if self.is_active() {
            self.initiative.get(self.turn_index)
        } else {
            None
        }
    }

    /// Roll initiative (d20 + DEX) for every player, then every enemy, and
    /// start round 1. Ties keep that input order.
    pub fn begin(&mut self, dice: &mut Dice, players: &[Character]) -> Result<(), RulesError> {
        if self.phase != CombatPhase::NotStarted {
            return Err(RulesError::CombatAlreadyStarted);
        }
        if players.is_empty() && self.enemies.is_empty() {
            return Err(RulesError::NoCombatants);
        }

        let mut entries = Vec::with_capacity(players.len() + self.enemies.len());
        let mut lines = Vec::new();
        let contenders = players
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str(), ParticipantKind::Player, p.abilities.mod_of(Ability::Dex)))
            .chain(
                self.enemies
                    .iter()
                    .filter(|e| !e.is_defeated())
                    .map(|e| (e.id.as_str(), e.name.as_str(), ParticipantKind::Enemy, e.abilities.mod_of(Ability::Dex))),
            );
        for (id, name, kind, dex) in contenders {
            let (d20, _) = dice.d20(AdMode::Normal);
            let initiative = d20 as i32 + dex;
            lines.push(format!("[INIT][{name}] d20={d20} {dex:+} = {initiative}"));
            entries.push(InitiativeEntry {
                id: id.to_string(),
                name: name.to_string(),
                kind,
                initiative,
                acted: false,
            });
        }
        // Stable: equal initiatives keep players-then-roster order.
        entries.sort_by(|a, b| b.initiative.cmp(&a.initiative));

        self.initiative = entries;
        self.log.extend(lines);
        self.phase = CombatPhase::Active;
        self.round = 1;
        self.turn_index = 0;
        self.outcome = None;
        info!(
            combatants = self.initiative.len(),
            environment = %self.environment,
            "combat started"
        );
        if let Some(first) = self.initiative.first() {
            let line = format!("[ROUND] 1 → {}", first.name);
            self.record(line);
        }
        Ok(())
    }

    /// Mark the current combatant as having acted and move to the next.
    pub fn advance_turn(&mut self) -> Result<TurnReport, RulesError> {
        if !self.is_active() {
            return Err(RulesError::CombatNotActive);
        }
        if self.initiative.is_empty() {
            return Err(RulesError::NoCombatants);
        }
        self.initiative[self.turn_index].acted = true;
        self.turn_index = (self.turn_index + 1) % self.initiative.len();
        let new_round = self.turn_index == 0;
        if new_round {
            self.start_new_round();
        }
        let current = self.initiative[self.turn_index].clone();
        self.record(format!("[TURN] round {} → {}", self.round, current.name));
        Ok(TurnReport {
            round: self.round,
            turn_index: self.turn_index,
            current,
            new_round,
        })
    }

    fn start_new_round(&mut self) {
        self.round += 1;
        for entry in &mut self.initiative {
            entry.acted = false;
        }
        debug!(round = self.round, "new round");
    }

    /// Drop a combatant from the initiative order, keeping the turn pointer
    /// on the same creature (or the one that now follows).
    pub fn remove_combatant(&mut self, id: &str) -> Result<InitiativeEntry, RulesError> {
        if !self.is_active() {
            return Err(RulesError::CombatNotActive);
        }
        let pos = self
            .initiative
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| RulesError::UnknownCombatant { id: id.into() })?;
        let removed = self.initiative.remove(pos);

        if self.initiative.is_empty() {
            self.turn_index = 0;
        } else if pos < self.turn_index {
            self.turn_index -= 1;
        } else if self.turn_index >= self.initiative.len() {
            // The last entry was current; the pointer wraps.
            self.turn_index = 0;
            self.start_new_round();
        }
        self.record(format!("[REMOVE][{}] leaves the initiative order", removed.name));
        Ok(removed)
    }

    fn remaining(&self, kind: ParticipantKind) -> usize {
        self.initiative
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| match kind {
                ParticipantKind::Player => true,
                ParticipantKind::Enemy => self.enemy(&e.id).map(|en| !en.is_defeated()).unwrap_or(false),
            })
            .count()
    }

    /// Defeat when no players remain, victory when no enemies do.
    pub fn should_end(&self) -> Option<CombatOutcome> {
        if !self.is_active() {
            return None;
        }
        if self.remaining(ParticipantKind::Player) == 0 {
            Some(CombatOutcome::Defeat)
        } else if self.remaining(ParticipantKind::Enemy) == 0 {
            Some(CombatOutcome::Victory)
        } else {
            None
        }
    }

    /// Close the encounter. XP from defeated enemies is split evenly
    /// (rounded down) between the players still in the initiative order.
    pub fn end(&mut self, outcome: Option<CombatOutcome>) -> Result<CombatSummary, RulesError> {
        if !self.is_active() {
            return Err(RulesError::CombatNotActive);
        }
        let outcome = outcome
            .or_else(|| self.should_end())
            .unwrap_or(CombatOutcome::Withdrawn);
        let xp_total: u32 = self
            .enemies
            .iter()
            .filter(|e| e.is_defeated())
            .map(|e| e.xp)
            .sum();
        let recipients: Vec<String> = self
            .initiative
            .iter()
            .filter(|e| e.kind == ParticipantKind::Player)
            .map(|e| e.id.clone())
            .collect();
        let xp_each = if recipients.is_empty() {
            0
        } else {
            xp_total / recipients.len() as u32
        };
        let summary = CombatSummary {
            outcome,
            rounds: self.round,
            xp_total,
            xp_each,
            recipients,
        };

        self.phase = CombatPhase::Ended;
        self.outcome = Some(outcome);
        self.enemies.clear();
        self.initiative.clear();
        self.turn_index = 0;
        self.record(summary.to_string());
        info!(%outcome, rounds = summary.rounds, xp = xp_total, "combat ended");
        Ok(summary)
    }
}
