//! Cooperative playback of the event log, decoupled from logical advancement.
//!
//! The synchronizer only ever reads the log. It keeps a cursor, starts at most one event per
//! cadence interval and holds a single in-flight flag until the presenter reports completion.
//! The controller refuses to advance the session while that flag is set.

use std::time::Duration;

use tracing::debug;

use crate::events::BattleEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Presentation finished synchronously.
    Finished,
    /// Presentation runs until [`AnimationSync::complete`] is called.
    InFlight,
}

/// Presentation side of the boundary.
pub trait Presenter {
    fn play(&mut self, event: &BattleEvent) -> Playback;

    /// Apply an event with no delay, used by skip and drain.
    fn apply_immediately(&mut self, event: &BattleEvent) {
        // nothing waits on completion here, so an in-flight result is irrelevant
        self.play(event);
    }
}

/// Presenter that shows nothing and finishes instantly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn play(&mut self, _event: &BattleEvent) -> Playback {
        Playback::Finished
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTick {
    /// Nothing left to play.
    CaughtUp,
    /// An animation is still running.
    Busy,
    /// Cadence interval not yet elapsed.
    Waiting,
    /// Started playback of the event with this sequence number.
    Started(u64),
}

/// How a teardown treats events not yet shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Drain,
    Discard,
}

#[derive(Debug, Clone)]
pub struct AnimationSync {
    cursor: usize,
    cadence: Duration,
    elapsed: Duration,
    in_flight: Option<u64>,
    torn_down: bool,
}

impl AnimationSync {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cursor: 0,
            cadence,
            // the first event may start on the first tick
            elapsed: cadence,
            in_flight: None,
            torn_down: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Events appended to the log but not yet started.
    pub fn backlog(&self, events: &[BattleEvent]) -> usize {
        events.len().saturating_sub(self.cursor)
    }

    /// Advances the playback clock by `dt` and starts the next event when due.
    pub fn tick(
        &mut self,
        dt: Duration,
        events: &[BattleEvent],
        presenter: &mut dyn Presenter,
    ) -> SyncTick {
        if self.torn_down {
            return SyncTick::CaughtUp;
        }
        if self.in_flight.is_some() {
            return SyncTick::Busy;
        }
        if self.cursor >= events.len() {
            self.elapsed = self.elapsed.saturating_add(dt).min(self.cadence);
            return SyncTick::CaughtUp;
        }
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed < self.cadence {
            return SyncTick::Waiting;
        }

        self.elapsed = Duration::ZERO;
        let event = &events[self.cursor];
        self.cursor += 1;
        debug!(seq = event.seq, "playing event");
        if presenter.play(event) == Playback::InFlight {
            self.in_flight = Some(event.seq);
        }
        SyncTick::Started(event.seq)
    }

    /// Completion signal from the presenter. Returns false if nothing was in flight.
    pub fn complete(&mut self) -> bool {
        self.in_flight.take().is_some()
    }

    /// Skip: applies every queued event immediately, in order. Returns how many were applied.
    pub fn fast_forward(&mut self, events: &[BattleEvent], presenter: &mut dyn Presenter) -> usize {
        self.in_flight = None;
        if self.torn_down {
            return 0;
        }
        let pending = &events[self.cursor.min(events.len())..];
        for event in pending {
            presenter.apply_immediately(event);
        }
        self.cursor = events.len();
        self.elapsed = self.cadence;
        pending.len()
    }

    /// Stops playback for good. Remaining events are either flushed to the presenter or
    /// dropped; either way nothing further is played. Returns how many events were handled.
    pub fn teardown(
        &mut self,
        events: &[BattleEvent],
        mode: Teardown,
        presenter: &mut dyn Presenter,
    ) -> usize {
        let handled = match mode {
            Teardown::Drain => self.fast_forward(events, presenter),
            Teardown::Discard => {
                let dropped = self.backlog(events);
                self.cursor = events.len();
                self.in_flight = None;
                dropped
            }
        };
        self.torn_down = true;
        handled
    }
}
