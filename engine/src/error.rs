//! Error types surfaced by the battle engine.

use crate::combatant::{CombatantId, Faction};
use crate::session::Phase;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BattleError {
    /// Malformed combatant input. Fatal to session start.
    #[error("invalid definition `{id}`: {reason}")]
    InvalidDefinition { id: String, reason: String },

    /// Fatal to session start.
    #[error("{faction} roster has no living combatants")]
    EmptyFaction { faction: Faction },

    /// Rejected submission; the session continues and the caller must resubmit.
    #[error("invalid action: {0}")]
    InvalidAction(ActionRejection),

    /// Rejected target; the session continues.
    #[error("invalid target {target}: {reason}")]
    InvalidTarget {
        target: CombatantId,
        reason: TargetRejection,
    },

    #[error("a battle session is already active")]
    SessionAlreadyActive,
}

impl BattleError {
    /// Recoverable errors leave the session usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BattleError::InvalidAction(_) | BattleError::InvalidTarget { .. }
        )
    }
}

impl From<ActionRejection> for BattleError {
    fn from(value: ActionRejection) -> Self {
        BattleError::InvalidAction(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("session is in phase {phase:?}, not awaiting an action")]
    WrongPhase { phase: Phase },

    #[error("it is not {actor}'s turn (current actor: {current:?})")]
    NotYourTurn {
        actor: CombatantId,
        current: Option<CombatantId>,
    },

    #[error("{actor} is not player-controlled")]
    NotPlayerControlled { actor: CombatantId },

    #[error("unknown skill `{0}`")]
    UnknownSkill(String),

    #[error("{actor} has not learned skill `{skill}`")]
    SkillNotLearned { actor: CombatantId, skill: String },

    #[error("unknown item `{0}`")]
    UnknownItem(String),

    #[error("no `{0}` left in the inventory")]
    ItemExhausted(String),

    #[error("{faction} side carries no inventory")]
    NoInventory { faction: Faction },

    #[error("player input already queued for this turn")]
    InputPending,

    #[error("no battle session is active")]
    NoActiveSession,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetRejection {
    #[error("no such combatant")]
    Unknown,
    #[error("combatant is defeated")]
    Defeated,
    #[error("combatant is on the wrong side for this action")]
    WrongFaction,
    #[error("action needs a target")]
    Missing,
    #[error("action takes a single target")]
    TooMany,
}
