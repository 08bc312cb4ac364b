use serde::{Deserialize, Serialize};

use crate::combatant::Stat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Poison,
    Regen,
    Stun,
    AttackUp,
    AttackDown,
    DefenseUp,
    DefenseDown,
    SpeedUp,
    SpeedDown,
}

impl EffectKind {
    /// Debuffs are only applied to hostile targets on a hit.
    pub fn is_harmful(self) -> bool {
        matches!(
            self,
            EffectKind::Poison
                | EffectKind::Stun
                | EffectKind::AttackDown
                | EffectKind::DefenseDown
                | EffectKind::SpeedDown
        )
    }
}

/// An effect currently held by a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: EffectKind,
    /// Flat stat points for modifiers, hp per turn for poison/regen. Unused by stun.
    pub magnitude: f64,
    /// Remaining duration in the holder's turns.
    pub remaining: i32,
}

impl StatusEffect {
    pub fn new(kind: EffectKind, magnitude: f64, remaining: i32) -> Self {
        Self {
            kind,
            magnitude,
            remaining,
        }
    }

    pub fn stat_modifier(&self) -> Option<(Stat, f64)> {
        use EffectKind::*;
        match self.kind {
            AttackUp => Some((Stat::Attack, self.magnitude)),
            AttackDown => Some((Stat::Attack, -self.magnitude)),
            DefenseUp => Some((Stat::Defense, self.magnitude)),
            DefenseDown => Some((Stat::Defense, -self.magnitude)),
            SpeedUp => Some((Stat::Speed, self.magnitude)),
            SpeedDown => Some((Stat::Speed, -self.magnitude)),
            Poison | Regen | Stun => None,
        }
    }

    pub fn periodic_hp(&self) -> i32 {
        match self.kind {
            EffectKind::Poison => -(self.magnitude.round() as i32).max(0),
            EffectKind::Regen => (self.magnitude.round() as i32).max(0),
            _ => 0,
        }
    }
}

/// Status payload carried by a skill or item definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectPayload {
    pub kind: EffectKind,
    #[serde(default)]
    pub magnitude: f64,
    pub duration: i32,
}

impl EffectPayload {
    pub fn to_effect(self) -> StatusEffect {
        StatusEffect::new(self.kind, self.magnitude, self.duration)
    }
}

/// Notification that an effect ran out at the start of its holder's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredEffect {
    pub kind: EffectKind,
}

/// Same-kind effects refresh instead of stacking: the longer duration and the larger
/// magnitude win.
pub fn merge_effect(effects: &mut Vec<StatusEffect>, incoming: StatusEffect) {
    match effects.iter_mut().find(|e| e.kind == incoming.kind) {
        Some(existing) => {
            existing.remaining = existing.remaining.max(incoming.remaining);
            existing.magnitude = existing.magnitude.max(incoming.magnitude);
        }
        None => effects.push(incoming),
    }
}
