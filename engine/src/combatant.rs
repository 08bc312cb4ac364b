use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::effects::{merge_effect, EffectKind, ExpiredEffect, StatusEffect};
use crate::error::BattleError;

/// Position of a combatant in the session roster. Stable for the whole encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub u32);

impl CombatantId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allies sort before enemies when speeds tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Ally,
    Enemy,
}

impl Faction {
    pub fn opponent(self) -> Faction {
        match self {
            Faction::Ally => Faction::Enemy,
            Faction::Enemy => Faction::Ally,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Ally => f.write_str("ally"),
            Faction::Enemy => f.write_str("enemy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Attack,
    Defense,
    Speed,
    Accuracy,
    Evasion,
    CritChance,
}

/// Effective stats as aggregated by the roster, equipment and skill-tree subsystems.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatBlock(pub IndexMap<Stat, f64>);

impl StatBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stat: Stat, value: f64) -> Self {
        self.0.insert(stat, value);
        self
    }

    /// Missing stats read as zero.
    pub fn get(&self, stat: Stat) -> f64 {
        self.0.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn get_opt(&self, stat: Stat) -> Option<f64> {
        self.0.get(&stat).copied()
    }
}

/// What defeating this unit is worth, handed to the reward subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounty {
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub materials: IndexMap<String, u32>,
}

/// External definition of a hero or enemy with its stats already aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub id: String,
    pub name: String,
    pub max_hp: i32,
    /// Starting hp if the unit enters wounded; defaults to `max_hp`.
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub stats: StatBlock,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub bounty: Bounty,
}

impl UnitDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_hp: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_hp,
            hp: None,
            stats: StatBlock::new(),
            skills: Vec::new(),
            bounty: Bounty::default(),
        }
    }

    pub fn with_stat(mut self, stat: Stat, value: f64) -> Self {
        self.stats.0.insert(stat, value);
        self
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.push(skill.into());
        self
    }
}

/// One participant for the duration of one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    /// Id of the owning hero/enemy definition.
    pub definition: String,
    pub name: String,
    pub faction: Faction,
    hp: i32,
    max_hp: i32,
    stats: StatBlock,
    effects: Vec<StatusEffect>,
    skills: Vec<String>,
    bounty: Bounty,
}

impl Combatant {
    pub fn initialize(
        id: CombatantId,
        faction: Faction,
        definition: &UnitDefinition,
    ) -> Result<Self, BattleError> {
        let invalid = |reason: String| BattleError::InvalidDefinition {
            id: definition.id.clone(),
            reason,
        };
        if definition.max_hp <= 0 {
            return Err(invalid(format!(
                "max hp must be positive (got {})",
                definition.max_hp
            )));
        }
        let hp = definition.hp.unwrap_or(definition.max_hp);
        if hp <= 0 || hp > definition.max_hp {
            return Err(invalid(format!(
                "starting hp {} outside 1..={}",
                hp, definition.max_hp
            )));
        }
        if let Some((stat, value)) = definition.stats.0.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("stat {:?} is not finite ({})", stat, value)));
        }

        Ok(Self {
            id,
            definition: definition.id.clone(),
            name: definition.name.clone(),
            faction,
            hp,
            max_hp: definition.max_hp,
            stats: definition.stats.clone(),
            effects: Vec::new(),
            skills: definition.skills.clone(),
            bounty: definition.bounty.clone(),
        })
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_fraction(&self) -> f64 {
        self.hp as f64 / self.max_hp as f64
    }

    pub fn effects(&self) -> &[StatusEffect] {
        &self.effects
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn knows_skill(&self, id: &str) -> bool {
        self.skills.iter().any(|s| s == id)
    }

    pub fn bounty(&self) -> &Bounty {
        &self.bounty
    }

    pub fn base_stats(&self) -> &StatBlock {
        &self.stats
    }

    /// Base stat plus every active modifier for it.
    pub fn stat(&self, stat: Stat) -> f64 {
        let base = self.stats.get(stat);
        self.effects
            .iter()
            .filter(|e| e.remaining > 0)
            .filter_map(|e| e.stat_modifier())
            .filter(|(s, _)| *s == stat)
            .fold(base, |acc, (_, delta)| acc + delta)
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind && e.remaining > 0)
    }

    pub fn is_stunned(&self) -> bool {
        self.has_effect(EffectKind::Stun)
    }

    /// Applies an hp change clamped to `[0, max]` and merges `new_effects`.
    /// Returns the hp change that actually happened.
    pub fn apply_delta(&mut self, hp_delta: i32, new_effects: &[StatusEffect]) -> i32 {
        let before = self.hp;
        self.hp = (self.hp.saturating_add(hp_delta)).clamp(0, self.max_hp);
        for effect in new_effects {
            merge_effect(&mut self.effects, *effect);
        }
        self.hp - before
    }

    /// Net hp change from poison and regen for the turn that is starting.
    pub fn periodic_delta(&self) -> i32 {
        self.effects
            .iter()
            .filter(|e| e.remaining > 0)
            .map(|e| e.periodic_hp())
            .sum()
    }

    /// Decrements every duration by one turn and purges what reached zero.
    pub fn tick_effects(&mut self) -> Vec<ExpiredEffect> {
        for effect in &mut self.effects {
            effect.remaining -= 1;
        }
        self.purge_expired()
    }

    /// Removes effects whose duration is already at or below zero, without ticking.
    pub fn purge_expired(&mut self) -> Vec<ExpiredEffect> {
        let mut expired = Vec::new();
        self.effects.retain(|e| {
            if e.remaining <= 0 {
                expired.push(ExpiredEffect { kind: e.kind });
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knight() -> Combatant {
        let def = UnitDefinition::new("knight", "Knight", 40).with_stat(Stat::Defense, 10.0);
        Combatant::initialize(CombatantId(0), Faction::Ally, &def).unwrap()
    }

    #[test]
    fn rejects_non_positive_max_hp() {
        let def = UnitDefinition::new("ghost", "Ghost", 0);
        let err = Combatant::initialize(CombatantId(0), Faction::Enemy, &def).unwrap_err();
        assert!(matches!(err, BattleError::InvalidDefinition { .. }));
    }

    #[test]
    fn rejects_wounded_start_at_zero() {
        let mut def = UnitDefinition::new("ghost", "Ghost", 10);
        def.hp = Some(0);
        assert!(Combatant::initialize(CombatantId(0), Faction::Enemy, &def).is_err());
    }

    #[test]
    fn delta_clamps_both_ends() {
        let mut k = knight();
        assert_eq!(k.apply_delta(-100, &[]), -40);
        assert_eq!(k.hp(), 0);
        assert!(!k.is_alive());
        assert_eq!(k.apply_delta(500, &[]), 40);
        assert_eq!(k.hp(), 40);
    }

    #[test]
    fn modifiers_are_added_to_base_stat() {
        let mut k = knight();
        k.apply_delta(0, &[StatusEffect::new(EffectKind::DefenseUp, 5.0, 1)]);
        assert_eq!(k.stat(Stat::Defense), 15.0);
        k.tick_effects();
        assert_eq!(k.stat(Stat::Defense), 10.0);
    }
}
