use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, CombatantId, Stat};

/// Per-round turn order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TurnQueue {
    order: VecDeque<CombatantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextActor {
    Actor(CombatantId),
    EndOfRound,
}

impl TurnQueue {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn remaining(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.order.iter().copied()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

/// Orders every living combatant by effective speed, fastest first. Ties go to allies, then to
/// the lower roster index, so the same roster always yields the same queue.
pub fn build_queue(roster: &[Combatant]) -> TurnQueue {
    let mut living: Vec<&Combatant> = roster.iter().filter(|c| c.is_alive()).collect();
    living.sort_by(|a, b| {
        b.stat(Stat::Speed)
            .total_cmp(&a.stat(Stat::Speed))
            .then(a.faction.cmp(&b.faction))
            .then(a.id.cmp(&b.id))
    });
    TurnQueue {
        order: living.into_iter().map(|c| c.id).collect(),
    }
}

/// Pops the next combatant still alive; units defeated earlier in the round are skipped.
pub fn next_actor(queue: &mut TurnQueue, roster: &[Combatant]) -> NextActor {
    while let Some(id) = queue.order.pop_front() {
        if roster.get(id.index()).is_some_and(|c| c.is_alive()) {
            return NextActor::Actor(id);
        }
    }
    NextActor::EndOfRound
}
