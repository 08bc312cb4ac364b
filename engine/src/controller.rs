//! Facade used by the rest of the game: start/stop an encounter, feed player input, pump
//! playback and read snapshots.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{default_action, default_source_for, ActionSource};
use crate::combat::actions::Action;
use crate::combatant::{CombatantId, Faction, UnitDefinition};
use crate::config::{BattleOptions, TimeoutPolicy};
use crate::content::Catalog;
use crate::effects::StatusEffect;
use crate::error::{ActionRejection, BattleError};
use crate::events::BattleEvent;
use crate::rewards::{summarize, BattleSummary, BountyRewards, RewardCalculator};
use crate::session::{BattleSession, Phase, SessionSetup};
use crate::sync::{AnimationSync, Presenter, SyncTick, Teardown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatantView {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub effects: Vec<StatusEffect>,
}

/// Read-only board state for one render tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub handle: SessionHandle,
    pub phase: Phase,
    pub round: u32,
    pub current_actor: Option<CombatantId>,
    pub awaiting_player: bool,
    pub combatants: Vec<CombatantView>,
    pub last_event: Option<BattleEvent>,
    /// Events already handed to the presenter.
    pub displayed: usize,
}

type EndedCallback = Box<dyn FnOnce(&BattleSummary)>;

struct ActiveBattle {
    handle: SessionHandle,
    session: BattleSession,
    sources: Vec<Box<dyn ActionSource>>,
    sync: AnimationSync,
    options: BattleOptions,
    waited: Duration,
    watched_turn: u64,
    summary: Option<BattleSummary>,
    on_ended: Option<EndedCallback>,
    reported: bool,
}

impl ActiveBattle {
    fn playback_caught_up(&self) -> bool {
        !self.sync.is_in_flight() && self.sync.backlog(self.session.events()) == 0
    }

    fn may_advance(&self) -> bool {
        !self.sync.is_in_flight()
            && self.sync.backlog(self.session.events()) <= self.options.max_lookahead
    }

    fn awaiting_player(&self) -> Option<CombatantId> {
        if self.session.phase() != Phase::AwaitingAction {
            return None;
        }
        let actor = self.session.current_actor()?;
        let source = self.sources.get(actor.index())?;
        (source.is_player_controlled() && !source.has_pending_input()).then_some(actor)
    }
}

pub struct BattleController {
    catalog: Catalog,
    rewards: Box<dyn RewardCalculator>,
    active: Option<ActiveBattle>,
    next_handle: u64,
}

impl BattleController {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            rewards: Box::new(BountyRewards),
            active: None,
            next_handle: 1,
        }
    }

    pub fn with_rewards(mut self, rewards: impl RewardCalculator + 'static) -> Self {
        self.rewards = Box::new(rewards);
        self
    }

    /// Starts an encounter. Fails with `SessionAlreadyActive` while another one is still
    /// running; an ended session is replaced.
    pub fn start(
        &mut self,
        allies: &[UnitDefinition],
        enemies: &[UnitDefinition],
        options: BattleOptions,
    ) -> Result<SessionHandle, BattleError> {
        if self.active.as_ref().is_some_and(|a| !a.session.is_ended()) {
            return Err(BattleError::SessionAlreadyActive);
        }

        let setup = SessionSetup::from_options(&options, self.catalog.clone());
        let mut session = BattleSession::new(allies, enemies, setup)?;
        let sources = session
            .roster()
            .iter()
            .map(|c| default_source_for(c, options.auto_mode, options.seed))
            .collect();
        session.start()?;

        let handle = SessionHandle(self.next_handle);
        self.next_handle += 1;
        info!(handle = handle.0, auto = options.auto_mode, "encounter started");
        self.active = Some(ActiveBattle {
            handle,
            sync: AnimationSync::new(options.animation_cadence()),
            watched_turn: session.turn_serial(),
            session,
            sources,
            options,
            waited: Duration::ZERO,
            summary: None,
            on_ended: None,
            reported: false,
        });
        self.pump()?;
        Ok(handle)
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    pub fn session(&self) -> Option<&BattleSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn summary(&self) -> Option<&BattleSummary> {
        self.active.as_ref().and_then(|a| a.summary.as_ref())
    }

    /// Actor whose player input is being waited on, if any.
    pub fn awaiting_player(&self) -> Option<CombatantId> {
        self.active.as_ref().and_then(|a| a.awaiting_player())
    }

    /// Replaces the action source of one combatant.
    pub fn set_source(
        &mut self,
        unit: CombatantId,
        source: Box<dyn ActionSource>,
    ) -> Result<(), BattleError> {
        let active = self.active_mut()?;
        let slot = active
            .sources
            .get_mut(unit.index())
            .ok_or(BattleError::InvalidTarget {
                target: unit,
                reason: crate::error::TargetRejection::Unknown,
            })?;
        *slot = source;
        self.pump()
    }

    /// Player input for the current actor. Valid only while the session awaits an action from
    /// a player-controlled combatant; otherwise nothing changes.
    pub fn submit_action(&mut self, action: Action) -> Result<(), BattleError> {
        let active = self.active_mut()?;
        let phase = active.session.phase();
        if phase != Phase::AwaitingAction {
            return Err(ActionRejection::WrongPhase { phase }.into());
        }
        let controlled = active
            .sources
            .get(action.actor.index())
            .is_some_and(|s| s.is_player_controlled());
        if !controlled {
            return Err(ActionRejection::NotPlayerControlled {
                actor: action.actor,
            }
            .into());
        }
        if let Err(e) = active.session.validate(&action) {
            warn!(error = %e, "rejected player action");
            return Err(e);
        }
        active.sources[action.actor.index()]
            .offer(action)
            .map_err(|_| ActionRejection::InputPending)?;
        self.pump()
    }

    /// One presentation tick: advances playback by `dt`, enforces the turn deadline and lets
    /// the session move on once playback allows it.
    pub fn tick(
        &mut self,
        dt: Duration,
        presenter: &mut dyn Presenter,
    ) -> Result<SyncTick, BattleError> {
        let active = self.active_mut()?;
        let status = active.sync.tick(dt, active.session.events(), presenter);

        if active.session.turn_serial() != active.watched_turn {
            active.watched_turn = active.session.turn_serial();
            active.waited = Duration::ZERO;
        }
        if let Some(actor) = active.awaiting_player() {
            if active.playback_caught_up() {
                active.waited = active.waited.saturating_add(dt);
            }
            let expired = active
                .options
                .turn_deadline()
                .is_some_and(|deadline| active.waited >= deadline);
            if expired && active.options.timeout_policy == TimeoutPolicy::AutoAttack {
                let action = default_action(&active.session, actor);
                warn!(%actor, waited_ms = active.waited.as_millis() as u64, "turn deadline passed; substituting default action");
                if let Err(action) = active.sources[actor.index()].offer(action) {
                    warn!(%actor, "source refused the substitute; submitting it directly");
                    active.session.submit(action)?;
                }
            }
        }

        self.pump()?;
        Ok(status)
    }

    /// Presenter reports the in-flight animation as finished.
    pub fn animation_complete(&mut self) -> Result<bool, BattleError> {
        let done = self.active_mut()?.sync.complete();
        self.pump()?;
        Ok(done)
    }

    /// Skip/fast-forward: every queued event is applied immediately, in order, and the
    /// simulation runs on until a player decision is needed or the battle ends.
    pub fn skip(&mut self, presenter: &mut dyn Presenter) -> Result<usize, BattleError> {
        let mut applied = 0;
        loop {
            let active = self.active_mut()?;
            applied += active.sync.fast_forward(active.session.events(), presenter);
            self.pump()?;
            let active = self.active_mut()?;
            if active.sync.backlog(active.session.events()) == 0 {
                return Ok(applied);
            }
        }
    }

    /// Forfeit: ends the battle with `Aborted`, skipping the rest of the queue.
    pub fn forfeit(&mut self) -> Result<(), BattleError> {
        self.active_mut()?.session.abort();
        self.report_if_ended();
        Ok(())
    }

    /// Player exit: a live battle ends as `Aborted` and is reported, then playback is torn
    /// down and the session released. The teardown itself never touches the session.
    pub fn stop(
        &mut self,
        mode: Teardown,
        presenter: &mut dyn Presenter,
    ) -> Option<BattleSummary> {
        if self.active.as_mut()?.session.abort() {
            info!("live encounter abandoned");
        }
        self.report_if_ended();
        let mut active = self.active.take()?;
        let handled = active.sync.teardown(active.session.events(), mode, presenter);
        info!(handle = active.handle.0, ?mode, handled, "encounter stopped");
        active.summary
    }

    /// Registers the end-of-battle callback for the active session. It is invoked exactly
    /// once, immediately if the battle is already over. Later registrations replace an unfired
    /// callback; once the session has been reported they are dropped.
    pub fn on_ended(
        &mut self,
        callback: impl FnOnce(&BattleSummary) + 'static,
    ) -> Result<(), BattleError> {
        let active = self.active_mut()?;
        if active.reported {
            debug!(handle = active.handle.0, "session already reported; callback dropped");
            return Ok(());
        }
        active.on_ended = Some(Box::new(callback));
        self.report_if_ended();
        Ok(())
    }

    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        let active = self.active.as_ref()?;
        let session = &active.session;
        Some(BoardSnapshot {
            handle: active.handle,
            phase: session.phase(),
            round: session.round(),
            current_actor: session.current_actor(),
            awaiting_player: active.awaiting_player().is_some(),
            combatants: session
                .roster()
                .iter()
                .map(|c| CombatantView {
                    id: c.id,
                    name: c.name.clone(),
                    faction: c.faction,
                    hp: c.hp(),
                    max_hp: c.max_hp(),
                    alive: c.is_alive(),
                    effects: c.effects().to_vec(),
                })
                .collect(),
            last_event: session.events().last().cloned(),
            displayed: active.sync.cursor(),
        })
    }

    fn active_mut(&mut self) -> Result<&mut ActiveBattle, BattleError> {
        self.active
            .as_mut()
            .ok_or(BattleError::InvalidAction(ActionRejection::NoActiveSession))
    }

    /// Drives the session while playback allows. Stops at a player decision.
    fn pump(&mut self) -> Result<(), BattleError> {
        if let Some(active) = self.active.as_mut() {
            while !active.session.is_ended() && active.may_advance() {
                let Some(actor) = active.session.current_actor() else {
                    break;
                };
                let source = active.sources[actor.index()].as_mut();
                if active.session.auto_act(source)? == 0 {
                    break;
                }
            }
        }
        self.report_if_ended();
        Ok(())
    }

    fn report_if_ended(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(reason) = active.session.end_reason() else {
            return;
        };
        if active.summary.is_none() {
            active.summary = Some(summarize(
                reason,
                active.session.round(),
                active.session.roster(),
                self.rewards.as_ref(),
            ));
        }
        if active.reported {
            return;
        }
        if let (Some(summary), Some(callback)) = (active.summary.as_ref(), active.on_ended.take()) {
            active.reported = true;
            callback(summary);
        }
    }
}
