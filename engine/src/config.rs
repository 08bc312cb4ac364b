use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Numeric knobs of the action resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CombatRules {
    pub base_hit_chance: f64,
    /// Hit chance gained per point of accuracy over the target's evasion.
    pub hit_per_point: f64,
    pub min_hit_chance: f64,
    /// Used when a combatant has no `crit_chance` stat.
    pub base_crit_chance: f64,
    pub crit_multiplier: f64,
    /// Defense `d` scales damage by `scale / (scale + d)`.
    pub defense_scale: f64,
    /// Damage never drops below this fraction of the pre-defense magnitude.
    pub min_damage_fraction: f64,
    /// Flat defense granted by `defend` for one turn.
    pub defend_bonus: f64,
    pub flee_base_chance: f64,
    pub flee_per_speed: f64,
    pub flee_min_chance: f64,
    pub flee_max_chance: f64,
    /// Chance that the default AI picks an offensive skill over a basic attack.
    pub ai_skill_chance: f64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            base_hit_chance: 0.95,
            hit_per_point: 0.01,
            min_hit_chance: 0.05,
            base_crit_chance: 0.05,
            crit_multiplier: 1.5,
            defense_scale: 100.0,
            min_damage_fraction: 0.1,
            defend_bonus: 50.0,
            flee_base_chance: 0.5,
            flee_per_speed: 0.05,
            flee_min_chance: 0.05,
            flee_max_chance: 0.95,
            ai_skill_chance: 0.35,
        }
    }
}

/// What the controller does when a player-controlled turn outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Keep waiting for input.
    #[default]
    Stall,
    /// Basic-attack the lowest-hp living enemy.
    AutoAttack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BattleOptions {
    pub seed: u64,
    /// Allies are driven by the default AI instead of player input.
    pub auto_mode: bool,
    pub turn_deadline_ms: Option<u64>,
    pub timeout_policy: TimeoutPolicy,
    /// Minimum time between two animation events.
    pub animation_cadence_ms: u64,
    /// Unplayed events the simulation may run ahead of presentation before it pauses.
    pub max_lookahead: usize,
    /// Rounds after which the battle ends in a draw.
    pub max_rounds: Option<u32>,
    /// Consumables available to the ally side.
    pub inventory: IndexMap<String, u32>,
    pub rules: CombatRules,
}

impl Default for BattleOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            auto_mode: false,
            turn_deadline_ms: None,
            timeout_policy: TimeoutPolicy::default(),
            animation_cadence_ms: 250,
            max_lookahead: 0,
            max_rounds: Some(100),
            inventory: IndexMap::new(),
            rules: CombatRules::default(),
        }
    }
}

impl BattleOptions {
    pub fn turn_deadline(&self) -> Option<Duration> {
        self.turn_deadline_ms.map(Duration::from_millis)
    }

    pub fn animation_cadence(&self) -> Duration {
        Duration::from_millis(self.animation_cadence_ms)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("failed to parse battle options YAML")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse battle options JSON")
    }

    /// Loads options from a `.json` file, or YAML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read battle options: {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        parsed.with_context(|| format!("in {}", path.display()))
    }
}
