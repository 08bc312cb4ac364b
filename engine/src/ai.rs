//! Where actions come from. AI strategies and player input are both [`ActionSource`]s and the
//! session resolves their choices identically.

use crate::combat::actions::Action;
use crate::combatant::{Combatant, CombatantId};
use crate::content::TargetRule;
use crate::session::BattleSession;
use crate::{Dice, RngSource};

pub trait ActionSource {
    /// The action `actor` takes now, or `None` if the source is still waiting for input.
    fn choose(&mut self, session: &BattleSession, actor: CombatantId) -> Option<Action>;

    fn is_player_controlled(&self) -> bool {
        false
    }

    /// Hands an externally submitted action to the source. Sources that do not accept input
    /// give it back.
    fn offer(&mut self, action: Action) -> Result<(), Action> {
        Err(action)
    }

    fn has_pending_input(&self) -> bool {
        false
    }
}

/// Returns whatever the player submitted for the current turn.
#[derive(Debug, Default)]
pub struct PlayerInput {
    pending: Option<Action>,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionSource for PlayerInput {
    fn choose(&mut self, _session: &BattleSession, actor: CombatantId) -> Option<Action> {
        match self.pending.take() {
            Some(action) if action.actor == actor => Some(action),
            Some(stale) => {
                tracing::warn!(?stale, %actor, "discarding input submitted for another turn");
                None
            }
            None => None,
        }
    }

    fn is_player_controlled(&self) -> bool {
        true
    }

    fn offer(&mut self, action: Action) -> Result<(), Action> {
        if self.pending.is_some() {
            return Err(action);
        }
        self.pending = Some(action);
        Ok(())
    }

    fn has_pending_input(&self) -> bool {
        self.pending.is_some()
    }
}

/// Living opponent with the least hp, ties going to the lower roster index.
pub fn lowest_hp_enemy(session: &BattleSession, actor: CombatantId) -> Option<CombatantId> {
    let faction = session.combatant(actor)?.faction;
    session
        .living(faction.opponent())
        .min_by_key(|c| (c.hp(), c.id))
        .map(|c| c.id)
}

/// Basic attack on the weakest enemy; also what a timed-out player turn falls back to.
pub fn default_action(session: &BattleSession, actor: CombatantId) -> Action {
    match lowest_hp_enemy(session, actor) {
        Some(target) => Action::attack(actor, target),
        None => Action::defend(actor),
    }
}

const HEAL_BELOW: f64 = 0.35;

/// Priority AI: revive, then heal, then maybe an offensive skill, then basic attack.
#[derive(Debug)]
pub struct DefaultAi {
    dice: Dice,
}

impl DefaultAi {
    pub fn new(seed: u64) -> Self {
        Self {
            dice: Dice::from_seed(seed),
        }
    }

    pub fn with_dice(dice: Dice) -> Self {
        Self { dice }
    }
}

impl ActionSource for DefaultAi {
    fn choose(&mut self, session: &BattleSession, actor: CombatantId) -> Option<Action> {
        let me = session.combatant(actor)?;
        let catalog = session.catalog();
        let known: Vec<_> = me
            .skills()
            .iter()
            .filter_map(|id| catalog.skill(id))
            .collect();

        if let Some(skill) = known.iter().find(|s| s.revive && s.target == TargetRule::SingleAlly) {
            let fallen = session
                .roster()
                .iter()
                .find(|c| c.faction == me.faction && !c.is_alive());
            if let Some(fallen) = fallen {
                return Some(Action::skill(actor, skill.id.clone(), vec![fallen.id]));
            }
        }

        let heal = known.iter().find(|s| {
            !s.target.is_hostile() && s.target != TargetRule::SelfOnly && s.power > 0.0 && !s.revive
        });
        if let Some(skill) = heal {
            let wounded = session
                .living(me.faction)
                .filter(|c| c.hp_fraction() < HEAL_BELOW)
                .min_by(|a, b| a.hp_fraction().total_cmp(&b.hp_fraction()).then(a.id.cmp(&b.id)));
            if let Some(wounded) = wounded {
                let targets = if skill.target.is_single() {
                    vec![wounded.id]
                } else {
                    Vec::new()
                };
                return Some(Action::skill(actor, skill.id.clone(), targets));
            }
        }

        let offensive: Vec<_> = known
            .iter()
            .filter(|s| s.target.is_hostile() || s.target == TargetRule::SelfOnly)
            .collect();
        let target = lowest_hp_enemy(session, actor)?;
        if !offensive.is_empty() && self.dice.unit() < session.rules().ai_skill_chance {
            let skill = offensive[self.dice.pick(offensive.len())];
            let targets = match skill.target {
                TargetRule::SingleEnemy => vec![target],
                _ => Vec::new(),
            };
            return Some(Action::skill(actor, skill.id.clone(), targets));
        }
        Some(Action::attack(actor, target))
    }
}

/// The side a combatant fights for decides its default source in auto mode.
pub fn default_source_for(unit: &Combatant, auto_mode: bool, seed: u64) -> Box<dyn ActionSource> {
    use crate::combatant::Faction;
    match unit.faction {
        Faction::Ally if !auto_mode => Box::new(PlayerInput::new()),
        _ => Box::new(DefaultAi::new(seed ^ ((u64::from(unit.id.0) << 32) | 0x5eed))),
    }
}
