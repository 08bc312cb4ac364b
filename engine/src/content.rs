use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::UnitDefinition;
use crate::effects::EffectPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    #[default]
    SingleEnemy,
    AllEnemies,
    #[serde(rename = "self")]
    SelfOnly,
    SingleAlly,
    AllAllies,
}

impl TargetRule {
    /// Hostile actions roll to hit and crit; support actions always land.
    pub fn is_hostile(self) -> bool {
        matches!(self, TargetRule::SingleEnemy | TargetRule::AllEnemies)
    }

    pub fn is_single(self) -> bool {
        matches!(self, TargetRule::SingleEnemy | TargetRule::SingleAlly)
    }
}

fn default_power() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    /// Multiplier on the user's attack: damage for hostile skills, healing for support ones.
    #[serde(default = "default_power")]
    pub power: f64,
    #[serde(default)]
    pub target: TargetRule,
    #[serde(default)]
    pub effect: Option<EffectPayload>,
    /// May target a defeated ally.
    #[serde(default)]
    pub revive: bool,
}

fn default_item_target() -> TargetRule {
    TargetRule::SingleAlly
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    /// Flat healing, independent of the user's stats.
    #[serde(default)]
    pub heal: i32,
    #[serde(default = "default_item_target")]
    pub target: TargetRule,
    #[serde(default)]
    pub effect: Option<EffectPayload>,
    #[serde(default)]
    pub revive: bool,
}

/// Skill and item definitions the resolver looks actions up in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub skills: IndexMap<String, SkillDef>,
    pub items: IndexMap<String, ItemDef>,
}

impl Catalog {
    pub fn from_defs(skills: Vec<SkillDef>, items: Vec<ItemDef>) -> Self {
        Self {
            skills: skills.into_iter().map(|s| (s.id.clone(), s)).collect(),
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    pub fn from_json(skills: &str, items: &str) -> Result<Self> {
        let skills: Vec<SkillDef> =
            serde_json::from_str(skills).context("failed to parse skills JSON")?;
        let items: Vec<ItemDef> =
            serde_json::from_str(items).context("failed to parse items JSON")?;
        Ok(Self::from_defs(skills, items))
    }

    /// The skills and items bundled with the engine.
    pub fn builtin() -> Result<Self> {
        Self::from_json(
            include_str!("../content/skills.json"),
            include_str!("../content/items.json"),
        )
    }

    /// Loads `skills.json` and `items.json` from a content directory.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read catalog file: {}", path.display()))
        };
        Self::from_json(&read("skills.json")?, &read("items.json")?)
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDef {
    pub id: String,
    pub name: String,
    pub allies: Vec<UnitDefinition>,
    pub enemies: Vec<UnitDefinition>,
    #[serde(default)]
    pub inventory: IndexMap<String, u32>,
}

impl EncounterDef {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse encounter JSON")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read encounter JSON: {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn builtin(id: &str) -> Result<Self> {
        let text = builtin_encounters()
            .get(id)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no built-in encounter '{}'", id))?;
        Self::from_json(text)
    }
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        (
            "slime_den",
            include_str!("../content/encounters/slime_den.json"),
        ),
        (
            "goblin_ambush",
            include_str!("../content/encounters/goblin_ambush.json"),
        ),
    ])
}
