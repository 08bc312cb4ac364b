//! The battle state machine: sole owner and mutator of combat state.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::ai::ActionSource;
use crate::combat::actions::{select_targets, Action, ActionKind, ActionShape};
use crate::combat::resolver::Resolver;
use crate::combatant::{Combatant, CombatantId, Faction, UnitDefinition};
use crate::config::{BattleOptions, CombatRules};
use crate::content::Catalog;
use crate::effects::EffectKind;
use crate::error::{ActionRejection, BattleError};
use crate::events::{BattleEvent, EventKind, EventLog};
use crate::scheduler::{build_queue, next_actor, NextActor, TurnQueue};
use crate::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Victory,
    Defeat,
    Fled,
    Aborted,
    /// The configured round cap ran out.
    Draw,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EndReason::Victory => "victory",
            EndReason::Defeat => "defeat",
            EndReason::Fled => "fled",
            EndReason::Aborted => "aborted",
            EndReason::Draw => "draw",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    RoundStart,
    AwaitingAction,
    Resolving,
    CheckingTerminal,
    Ended(EndReason),
}

impl Phase {
    pub fn is_ended(self) -> bool {
        matches!(self, Phase::Ended(_))
    }

    /// Legal edges of the state machine. `Ended` is reachable from every live phase and
    /// leaves nowhere. `RoundStart → RoundStart` covers a round in which every turn was skipped.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (Ended(_), _) => false,
            (_, Ended(_)) => true,
            (Initializing, RoundStart) => true,
            (RoundStart, AwaitingAction | RoundStart | CheckingTerminal) => true,
            (AwaitingAction, Resolving) => true,
            (Resolving, CheckingTerminal) => true,
            (CheckingTerminal, AwaitingAction | RoundStart) => true,
            _ => false,
        }
    }
}

/// Everything a session needs besides the two rosters.
pub struct SessionSetup {
    pub rules: CombatRules,
    pub catalog: Catalog,
    pub dice: Dice,
    pub max_rounds: Option<u32>,
    /// Ally-side consumables.
    pub inventory: IndexMap<String, u32>,
}

impl SessionSetup {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            rules: CombatRules::default(),
            catalog,
            dice: Dice::from_seed(0),
            max_rounds: Some(100),
            inventory: IndexMap::new(),
        }
    }

    pub fn from_options(options: &BattleOptions, catalog: Catalog) -> Self {
        Self {
            rules: options.rules.clone(),
            catalog,
            dice: Dice::from_seed(options.seed),
            max_rounds: options.max_rounds,
            inventory: options.inventory.clone(),
        }
    }

    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_inventory(mut self, inventory: IndexMap<String, u32>) -> Self {
        self.inventory = inventory;
        self
    }
}

#[derive(Debug)]
pub struct BattleSession {
    phase: Phase,
    round: u32,
    /// Incremented each time a combatant's turn starts.
    turn: u64,
    queue: TurnQueue,
    current: Option<CombatantId>,
    roster: Vec<Combatant>,
    initial: Vec<Combatant>,
    log: EventLog,
    rules: CombatRules,
    catalog: Catalog,
    dice: Dice,
    max_rounds: Option<u32>,
    inventory: IndexMap<String, u32>,
}

impl BattleSession {
    /// Builds the roster (allies first, then enemies) and validates it. The session stays in
    /// `Initializing` until [`BattleSession::start`].
    pub fn new(
        allies: &[UnitDefinition],
        enemies: &[UnitDefinition],
        setup: SessionSetup,
    ) -> Result<Self, BattleError> {
        let sides = allies
            .iter()
            .map(|d| (Faction::Ally, d))
            .chain(enemies.iter().map(|d| (Faction::Enemy, d)));

        let mut roster = Vec::with_capacity(allies.len() + enemies.len());
        for (idx, (faction, def)) in sides.enumerate() {
            if let Some(missing) = def.skills.iter().find(|s| setup.catalog.skill(s).is_none()) {
                return Err(BattleError::InvalidDefinition {
                    id: def.id.clone(),
                    reason: format!("unknown skill `{}`", missing),
                });
            }
            roster.push(Combatant::initialize(CombatantId(idx as u32), faction, def)?);
        }

        for faction in [Faction::Ally, Faction::Enemy] {
            if !roster.iter().any(|c| c.faction == faction && c.is_alive()) {
                return Err(BattleError::EmptyFaction { faction });
            }
        }

        Ok(Self {
            phase: Phase::Initializing,
            round: 0,
            turn: 0,
            queue: TurnQueue::default(),
            current: None,
            initial: roster.clone(),
            roster,
            log: EventLog::new(),
            rules: setup.rules,
            catalog: setup.catalog,
            dice: setup.dice,
            max_rounds: setup.max_rounds,
            inventory: setup.inventory,
        })
    }

    /// Leaves `Initializing`: opens round one and runs until the first actor is awaited.
    pub fn start(&mut self) -> Result<(), BattleError> {
        if self.phase != Phase::Initializing {
            return Err(ActionRejection::WrongPhase { phase: self.phase }.into());
        }
        info!(
            allies = self.living(Faction::Ally).count(),
            enemies = self.living(Faction::Enemy).count(),
            "battle started"
        );
        self.transition(Phase::RoundStart);
        if self.open_round() {
            self.advance_turn();
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase.is_ended()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self.phase {
            Phase::Ended(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_serial(&self) -> u64 {
        self.turn
    }

    pub fn current_actor(&self) -> Option<CombatantId> {
        self.current
    }

    pub fn roster(&self) -> &[Combatant] {
        &self.roster
    }

    /// Roster as it was before the first round, for replays.
    pub fn initial_roster(&self) -> &[Combatant] {
        &self.initial
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.roster.get(id.index())
    }

    pub fn living(&self, faction: Faction) -> impl Iterator<Item = &Combatant> + '_ {
        self.roster
            .iter()
            .filter(move |c| c.faction == faction && c.is_alive())
    }

    pub fn events(&self) -> &[BattleEvent] {
        self.log.events()
    }

    pub fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    pub fn inventory(&self) -> &IndexMap<String, u32> {
        &self.inventory
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Checks an action against the current state without changing anything.
    pub fn validate(&self, action: &Action) -> Result<(), BattleError> {
        if self.phase != Phase::AwaitingAction {
            return Err(ActionRejection::WrongPhase { phase: self.phase }.into());
        }
        if self.current != Some(action.actor) {
            return Err(ActionRejection::NotYourTurn {
                actor: action.actor,
                current: self.current,
            }
            .into());
        }
        let actor = self
            .combatant(action.actor)
            .ok_or(ActionRejection::NotYourTurn {
                actor: action.actor,
                current: self.current,
            })?;

        let shape = action.kind.shape(actor, &self.catalog)?;
        if let ActionKind::Item(id) = &action.kind {
            if actor.faction != Faction::Ally {
                return Err(ActionRejection::NoInventory {
                    faction: actor.faction,
                }
                .into());
            }
            if self.inventory.get(id).copied().unwrap_or(0) == 0 {
                return Err(ActionRejection::ItemExhausted(id.clone()).into());
            }
        }
        if let ActionShape::Effect(profile) = shape {
            select_targets(actor, &profile, &action.targets, &self.roster)?;
        }
        Ok(())
    }

    /// Resolves and applies the current actor's action, then runs the machine forward until
    /// the next actor is awaited or the battle ends. Returns how many events were appended.
    ///
    /// A rejected action changes nothing: no event, no draw, same phase.
    pub fn submit(&mut self, action: Action) -> Result<usize, BattleError> {
        self.validate(&action)?;
        let start = self.log.len();

        let actor = &self.roster[action.actor.index()];
        let outcome = Resolver::new(&self.rules, &self.catalog).resolve(
            actor,
            &action,
            &self.roster,
            &mut self.dice,
        )?;

        self.transition(Phase::Resolving);
        if let ActionKind::Item(id) = &action.kind {
            if let Some(count) = self.inventory.get_mut(id) {
                *count = count.saturating_sub(1);
            }
        }
        self.log.push(EventKind::ActionDeclared { action });

        let mut defeated = Vec::new();
        let mut revived = Vec::new();
        for result in &outcome.results {
            let unit = &mut self.roster[result.target.index()];
            let was_alive = unit.is_alive();
            unit.apply_delta(result.hp_delta, &result.effects);
            match (was_alive, unit.is_alive()) {
                (true, false) => defeated.push(unit.id),
                (false, true) => revived.push((unit.id, unit.hp())),
                _ => {}
            }
        }
        let fled = outcome.fled();
        self.log.push(EventKind::OutcomeApplied { outcome });
        for unit in defeated {
            self.defeat(unit);
        }
        for (unit, hp) in revived {
            debug!(%unit, hp, "unit revived");
            self.log.push(EventKind::UnitRevived { unit, hp });
        }

        self.transition(Phase::CheckingTerminal);
        if fled {
            self.end(EndReason::Fled);
        } else if !self.check_terminal() {
            self.advance_turn();
        }
        Ok(self.log.len() - start)
    }

    /// Lets `source` act for the current actor.
    ///
    /// A rejected choice is a defect in the source: it is logged and the source gets exactly
    /// one reselection, after which the actor defends. Returns 0 when the source has no
    /// action yet (player input still pending).
    pub fn auto_act(&mut self, source: &mut dyn ActionSource) -> Result<usize, BattleError> {
        let actor = self
            .current
            .ok_or(ActionRejection::WrongPhase { phase: self.phase })?;

        let Some(first) = source.choose(self, actor) else {
            return Ok(0);
        };
        let err = match self.submit(first) {
            Ok(n) => return Ok(n),
            Err(e) if e.is_recoverable() => e,
            Err(e) => return Err(e),
        };
        error!(%actor, error = %err, "action source chose an invalid action; reselecting once");

        if let Some(second) = source.choose(self, actor) {
            match self.submit(second) {
                Ok(n) => return Ok(n),
                Err(e) if e.is_recoverable() => {
                    error!(%actor, error = %e, "reselection also invalid; defending instead");
                }
                Err(e) => return Err(e),
            }
        }
        self.submit(Action::defend(actor))
    }

    /// Forfeit or exit: ends the battle immediately with `Aborted`.
    pub fn abort(&mut self) -> bool {
        if self.is_ended() {
            return false;
        }
        self.end(EndReason::Aborted);
        true
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, round = self.round, "phase transition");
        self.phase = next;
    }

    /// Returns false when the battle ended instead of opening a round.
    fn open_round(&mut self) -> bool {
        if self.max_rounds.is_some_and(|max| self.round >= max) {
            self.end(EndReason::Draw);
            return false;
        }
        self.round += 1;
        for unit in &mut self.roster {
            unit.purge_expired();
        }
        self.queue = build_queue(&self.roster);
        let queue = self.queue.remaining().collect();
        self.log.push(EventKind::RoundStarted {
            round: self.round,
            queue,
        });
        if self.queue.is_empty() {
            self.transition(Phase::CheckingTerminal);
            if !self.check_terminal() {
                self.end(EndReason::Draw);
            }
            return false;
        }
        true
    }

    fn advance_turn(&mut self) {
        self.current = None;
        while !self.is_ended() {
            match next_actor(&mut self.queue, &self.roster) {
                NextActor::EndOfRound => {
                    self.transition(Phase::RoundStart);
                    if !self.open_round() {
                        return;
                    }
                }
                NextActor::Actor(id) => {
                    if self.start_turn(id) {
                        self.current = Some(id);
                        self.transition(Phase::AwaitingAction);
                        return;
                    }
                }
            }
        }
    }

    /// Runs turn-start effect processing. Returns whether the actor gets to act.
    fn start_turn(&mut self, id: CombatantId) -> bool {
        self.turn += 1;
        let unit = &mut self.roster[id.index()];
        let stunned = unit.is_stunned();
        let periodic = unit.periodic_delta();
        let expired: Vec<EffectKind> = unit.tick_effects().into_iter().map(|e| e.kind).collect();
        let hp_delta = unit.apply_delta(periodic, &[]);
        let alive = unit.is_alive();

        self.log.push(EventKind::TurnStarted {
            actor: id,
            hp_delta,
            expired,
            stunned,
        });
        if !alive {
            self.defeat(id);
            self.check_terminal();
            return false;
        }
        !stunned
    }

    fn defeat(&mut self, id: CombatantId) {
        self.roster[id.index()].clear_effects();
        debug!(unit = %id, "unit defeated");
        self.log.push(EventKind::UnitDefeated { unit: id });
    }

    /// Ends the battle if a faction has been wiped out.
    fn check_terminal(&mut self) -> bool {
        if self.living(Faction::Ally).next().is_none() {
            self.end(EndReason::Defeat);
            true
        } else if self.living(Faction::Enemy).next().is_none() {
            self.end(EndReason::Victory);
            true
        } else {
            false
        }
    }

    fn end(&mut self, reason: EndReason) {
        self.current = None;
        self.queue.clear();
        self.transition(Phase::Ended(reason));
        info!(%reason, rounds = self.round, "battle ended");
        self.log.push(EventKind::BattleEnded {
            reason,
            rounds: self.round,
        });
    }
}
