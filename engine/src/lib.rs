use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod ai;
pub mod api;
pub mod combat;
pub mod combatant;
pub mod config;
pub mod content;
pub mod controller;
pub mod effects;
pub mod error;
pub mod events;
pub mod rewards;
pub mod scheduler;
pub mod session;
pub mod sync;

pub use ai::{ActionSource, DefaultAi, PlayerInput};
pub use combat::actions::{Action, ActionKind};
pub use combat::resolver::{ResolutionOutcome, Resolver, TargetResult};
pub use combatant::{Bounty, Combatant, CombatantId, Faction, Stat, StatBlock, UnitDefinition};
pub use config::{BattleOptions, CombatRules, TimeoutPolicy};
pub use content::{Catalog, EncounterDef, ItemDef, SkillDef, TargetRule};
pub use controller::{BattleController, BoardSnapshot, SessionHandle};
pub use effects::{EffectKind, StatusEffect};
pub use error::{ActionRejection, BattleError, TargetRejection};
pub use events::{BattleEvent, EventKind};
pub use rewards::{BattleSummary, BountyRewards, RewardCalculator, Rewards};
pub use session::{BattleSession, EndReason, Phase};
pub use sync::{AnimationSync, Playback, Presenter};

/// A source of uniform draws in `[0, 1)`.
///
/// Everything random in a battle (hit, crit, flee, AI choices) goes through this trait, so a
/// fixed draw sequence replays a fight exactly.
pub trait RngSource {
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.unit() * len as f64) as usize).min(len - 1)
    }
}

enum DiceSource {
    Seeded(ChaCha8Rng),
    Scripted { values: Vec<f64>, cursor: usize },
}

pub struct Dice {
    source: DiceSource,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: DiceSource::Seeded(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Replays `values` in order, cycling when exhausted. An empty script always yields 0.0.
    pub fn from_scripted(values: Vec<f64>) -> Self {
        Self {
            source: DiceSource::Scripted { values, cursor: 0 },
        }
    }

    /// Draws that always land and never crit under the default rules.
    pub fn always_hit() -> Self {
        Self::from_scripted(vec![0.99])
    }
}

impl RngSource for Dice {
    fn unit(&mut self) -> f64 {
        match &mut self.source {
            DiceSource::Seeded(rng) => rng.gen_range(0.0..1.0),
            DiceSource::Scripted { values, cursor } => {
                if values.is_empty() {
                    return 0.0;
                }
                let v = values[*cursor % values.len()];
                *cursor += 1;
                v.clamp(0.0, 0.999_999)
            }
        }
    }
}

impl std::fmt::Debug for Dice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            DiceSource::Seeded(_) => f.write_str("Dice::Seeded"),
            DiceSource::Scripted { values, cursor } => f
                .debug_struct("Dice::Scripted")
                .field("values", values)
                .field("cursor", cursor)
                .finish(),
        }
    }
}
