use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::actions::{select_targets, Action, ActionProfile, ActionShape, Potency};
use crate::combatant::{Combatant, CombatantId, Stat};
use crate::config::CombatRules;
use crate::content::Catalog;
use crate::effects::{EffectKind, StatusEffect};
use crate::error::BattleError;
use crate::RngSource;

/// Effect of one action on one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: CombatantId,
    pub hp_delta: i32,
    #[serde(default)]
    pub effects: Vec<StatusEffect>,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub missed: bool,
}

impl TargetResult {
    fn miss(target: CombatantId) -> Self {
        Self {
            target,
            hp_delta: 0,
            effects: Vec::new(),
            critical: false,
            missed: true,
        }
    }
}

/// Result of applying one action. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub actor: CombatantId,
    pub results: Vec<TargetResult>,
    /// `Some` only for flee attempts.
    #[serde(default)]
    pub fled: Option<bool>,
}

impl ResolutionOutcome {
    pub fn fled(&self) -> bool {
        self.fled == Some(true)
    }
}

pub fn hit_chance(rules: &CombatRules, accuracy: f64, evasion: f64) -> f64 {
    (rules.base_hit_chance + (accuracy - evasion) * rules.hit_per_point)
        .clamp(rules.min_hit_chance, 1.0)
}

/// Multiplicative defense reduction, floored at `min_damage_fraction` of `base`.
pub fn mitigate(rules: &CombatRules, base: f64, defense: f64) -> f64 {
    if rules.defense_scale <= 0.0 {
        return base;
    }
    let scaled = base * rules.defense_scale / (rules.defense_scale + defense.max(0.0));
    scaled.max(base * rules.min_damage_fraction)
}

pub fn flee_chance(rules: &CombatRules, speed: f64, fastest_opponent: f64) -> f64 {
    (rules.flee_base_chance + (speed - fastest_opponent) * rules.flee_per_speed)
        .clamp(rules.flee_min_chance, rules.flee_max_chance)
}

pub struct Resolver<'a> {
    rules: &'a CombatRules,
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(rules: &'a CombatRules, catalog: &'a Catalog) -> Self {
        Self { rules, catalog }
    }

    /// Computes the outcome of `action` without touching the roster.
    ///
    /// Every target is validated before the first draw, so a rejected action consumes no
    /// randomness. Multi-target actions roll independently per target in declared order.
    pub fn resolve<R: RngSource + ?Sized>(
        &self,
        actor: &Combatant,
        action: &Action,
        roster: &[Combatant],
        rng: &mut R,
    ) -> Result<ResolutionOutcome, BattleError> {
        let shape = action.kind.shape(actor, self.catalog)?;
        let outcome = match shape {
            ActionShape::Defend => ResolutionOutcome {
                actor: actor.id,
                results: vec![TargetResult {
                    target: actor.id,
                    hp_delta: 0,
                    effects: vec![StatusEffect::new(
                        EffectKind::DefenseUp,
                        self.rules.defend_bonus,
                        1,
                    )],
                    critical: false,
                    missed: false,
                }],
                fled: None,
            },
            ActionShape::Flee => {
                let fastest = roster
                    .iter()
                    .filter(|c| c.faction != actor.faction && c.is_alive())
                    .map(|c| c.stat(Stat::Speed))
                    .fold(f64::NEG_INFINITY, f64::max);
                let fastest = if fastest.is_finite() { fastest } else { 0.0 };
                let chance = flee_chance(self.rules, actor.stat(Stat::Speed), fastest);
                let roll = rng.unit();
                debug!(actor = %actor.id, chance, roll, "flee attempt");
                ResolutionOutcome {
                    actor: actor.id,
                    results: Vec::new(),
                    fled: Some(roll < chance),
                }
            }
            ActionShape::Effect(profile) => {
                let targets = select_targets(actor, &profile, &action.targets, roster)?;
                let results = targets
                    .iter()
                    .map(|id| {
                        let target = &roster[id.index()];
                        if profile.target.is_hostile() {
                            self.strike(actor, target, &profile, rng)
                        } else {
                            self.support(actor, target, &profile)
                        }
                    })
                    .collect();
                ResolutionOutcome {
                    actor: actor.id,
                    results,
                    fled: None,
                }
            }
        };
        debug!(actor = %actor.id, kind = ?action.kind, ?outcome, "resolved action");
        Ok(outcome)
    }

    fn strike<R: RngSource + ?Sized>(
        &self,
        actor: &Combatant,
        target: &Combatant,
        profile: &ActionProfile,
        rng: &mut R,
    ) -> TargetResult {
        let miss_below = 1.0
            - hit_chance(
                self.rules,
                actor.stat(Stat::Accuracy),
                target.stat(Stat::Evasion),
            );
        if rng.unit() < miss_below {
            return TargetResult::miss(target.id);
        }

        let base = match profile.potency {
            Potency::Scaled(power) => actor.stat(Stat::Attack).max(0.0) * power,
            Potency::Flat(amount) => amount as f64,
        };
        let mut magnitude = mitigate(self.rules, base, target.stat(Stat::Defense));

        let crit_chance = actor
            .base_stats()
            .get_opt(Stat::CritChance)
            .unwrap_or(self.rules.base_crit_chance);
        let critical = rng.unit() < crit_chance;
        if critical {
            magnitude *= self.rules.crit_multiplier;
        }

        let damage = if base > 0.0 {
            (magnitude.round() as i32).max(1)
        } else {
            0
        };

        TargetResult {
            target: target.id,
            hp_delta: -damage,
            effects: profile.effect.map(|p| p.to_effect()).into_iter().collect(),
            critical,
            missed: false,
        }
    }

    fn support(&self, actor: &Combatant, target: &Combatant, profile: &ActionProfile) -> TargetResult {
        let mut heal = match profile.potency {
            Potency::Scaled(power) => (actor.stat(Stat::Attack).max(0.0) * power).round() as i32,
            Potency::Flat(amount) => amount,
        }
        .max(0);
        if profile.revive && !target.is_alive() {
            heal = heal.max(1);
        }
        TargetResult {
            target: target.id,
            hp_delta: heal,
            effects: profile.effect.map(|p| p.to_effect()).into_iter().collect(),
            critical: false,
            missed: false,
        }
    }
}
