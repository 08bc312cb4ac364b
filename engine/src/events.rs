//! Append-only battle event log, the only channel between simulation and presentation.

use serde::{Deserialize, Serialize};

use crate::combat::actions::{Action, ActionKind};
use crate::combat::resolver::ResolutionOutcome;
use crate::combatant::{Combatant, CombatantId};
use crate::effects::EffectKind;
use crate::session::EndReason;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    RoundStarted {
        round: u32,
        queue: Vec<CombatantId>,
    },
    TurnStarted {
        actor: CombatantId,
        /// Poison/regen change actually applied at turn start.
        hp_delta: i32,
        expired: Vec<EffectKind>,
        stunned: bool,
    },
    ActionDeclared {
        action: Action,
    },
    OutcomeApplied {
        outcome: ResolutionOutcome,
    },
    UnitDefeated {
        unit: CombatantId,
    },
    UnitRevived {
        unit: CombatantId,
        hp: i32,
    },
    BattleEnded {
        reason: EndReason,
        rounds: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<BattleEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: EventKind) -> &BattleEvent {
        let seq = self.events.len() as u64;
        self.events.push(BattleEvent { seq, kind });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&BattleEvent> {
        self.events.last()
    }
}

/// Applies one event to a roster the same way the session did.
pub fn apply_event(roster: &mut [Combatant], event: &BattleEvent) {
    match &event.kind {
        EventKind::RoundStarted { .. } => {
            for unit in roster.iter_mut() {
                unit.purge_expired();
            }
        }
        EventKind::TurnStarted {
            actor, hp_delta, ..
        } => {
            if let Some(unit) = roster.get_mut(actor.index()) {
                unit.tick_effects();
                unit.apply_delta(*hp_delta, &[]);
            }
        }
        EventKind::OutcomeApplied { outcome } => {
            for result in &outcome.results {
                if let Some(unit) = roster.get_mut(result.target.index()) {
                    unit.apply_delta(result.hp_delta, &result.effects);
                }
            }
        }
        EventKind::UnitDefeated { unit } => {
            if let Some(unit) = roster.get_mut(unit.index()) {
                unit.clear_effects();
            }
        }
        EventKind::ActionDeclared { .. }
        | EventKind::UnitRevived { .. }
        | EventKind::BattleEnded { .. } => {}
    }
}

/// Rebuilds the final board from the initial roster snapshot and the full log.
pub fn replay(initial: &[Combatant], events: &[BattleEvent]) -> Vec<Combatant> {
    let mut roster = initial.to_vec();
    for event in events {
        apply_event(&mut roster, event);
    }
    roster
}

fn name_of(roster: &[Combatant], id: CombatantId) -> String {
    roster
        .get(id.index())
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// One-line human readable rendering of an event.
pub fn describe(event: &BattleEvent, roster: &[Combatant]) -> String {
    match &event.kind {
        EventKind::RoundStarted { round, queue } => {
            let order = queue
                .iter()
                .map(|id| name_of(roster, *id))
                .collect::<Vec<_>>()
                .join(" → ");
            format!("[ROUND] {} order: {}", round, order)
        }
        EventKind::TurnStarted {
            actor,
            hp_delta,
            expired,
            stunned,
        } => {
            let mut line = format!("[TURN][{}]", name_of(roster, *actor));
            if *hp_delta != 0 {
                line.push_str(&format!(" periodic {:+}", hp_delta));
            }
            if !expired.is_empty() {
                line.push_str(&format!(" expired {:?}", expired));
            }
            if *stunned {
                line.push_str(" is stunned");
            }
            line
        }
        EventKind::ActionDeclared { action } => {
            let what = match &action.kind {
                ActionKind::BasicAttack => "attack".to_string(),
                ActionKind::Skill(id) => format!("skill {}", id),
                ActionKind::Defend => "defend".to_string(),
                ActionKind::Flee => "flee".to_string(),
                ActionKind::Item(id) => format!("item {}", id),
            };
            let targets = action
                .targets
                .iter()
                .map(|id| name_of(roster, *id))
                .collect::<Vec<_>>();
            if targets.is_empty() {
                format!("[ACTION][{}] {}", name_of(roster, action.actor), what)
            } else {
                format!(
                    "[ACTION][{}] {} → {}",
                    name_of(roster, action.actor),
                    what,
                    targets.join(", ")
                )
            }
        }
        EventKind::OutcomeApplied { outcome } => {
            let actor = name_of(roster, outcome.actor);
            if let Some(fled) = outcome.fled {
                return format!(
                    "[FLEE][{}] {}",
                    actor,
                    if fled { "escaped" } else { "failed" }
                );
            }
            let parts = outcome
                .results
                .iter()
                .map(|r| {
                    let name = name_of(roster, r.target);
                    if r.missed {
                        format!("{} MISS", name)
                    } else {
                        let mut s = format!("{} {:+}", name, r.hp_delta);
                        if r.critical {
                            s.push_str(" CRIT!");
                        }
                        for e in &r.effects {
                            s.push_str(&format!(" +{:?}({})", e.kind, e.remaining));
                        }
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("[HIT][{}] {}", actor, parts)
        }
        EventKind::UnitDefeated { unit } => format!("[DEFEAT][{}] is defeated", name_of(roster, *unit)),
        EventKind::UnitRevived { unit, hp } => {
            format!("[REVIVE][{}] returns with {} HP", name_of(roster, *unit), hp)
        }
        EventKind::BattleEnded { reason, rounds } => {
            format!("[END] {} after {} rounds", reason, rounds)
        }
    }
}
