use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::default_source_for;
use crate::combatant::{Combatant, Faction};
use crate::config::BattleOptions;
use crate::content::{Catalog, EncounterDef};
use crate::events::describe;
use crate::rewards::{summarize, BattleSummary, BountyRewards};
use crate::session::{BattleSession, EndReason, SessionSetup};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterConfig {
    /// Already loaded encounter; takes precedence over path and id.
    #[serde(skip)]
    pub encounter: Option<EncounterDef>,
    /// Built-in encounter id, used when no path is given.
    #[serde(default)]
    pub encounter_id: Option<String>,
    #[serde(default)]
    pub encounter_path: Option<String>,
    /// Directory holding `skills.json` and `items.json`; the bundled catalog otherwise.
    #[serde(default)]
    pub content_dir: Option<String>,
    #[serde(default)]
    pub options_path: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterResult {
    /// `allies`, `enemies` or `none`.
    pub winner: String,
    pub outcome: EndReason,
    pub rounds: u32,
    pub ally_hp_end: Vec<i32>,
    pub enemy_hp_end: Vec<i32>,
    pub log: Vec<String>,
    pub summary: BattleSummary,
}

/// Runs one battle with every combatant on the default AI, start to finish.
pub fn simulate_encounter(cfg: EncounterConfig) -> Result<EncounterResult> {
    let encounter = load_encounter(&cfg)?;
    let catalog = match &cfg.content_dir {
        Some(dir) => Catalog::load_dir(dir)?,
        None => Catalog::builtin()?,
    };
    let mut options = match &cfg.options_path {
        Some(path) => BattleOptions::load(path)?,
        None => BattleOptions::default(),
    };
    options.seed = cfg.seed;
    options.auto_mode = true;
    if cfg.max_rounds.is_some() {
        options.max_rounds = cfg.max_rounds;
    }
    for (item, qty) in &encounter.inventory {
        options.inventory.entry(item.clone()).or_insert(*qty);
    }

    let setup = SessionSetup::from_options(&options, catalog);
    let mut session = BattleSession::new(&encounter.allies, &encounter.enemies, setup)
        .with_context(|| format!("failed to set up encounter '{}'", encounter.id))?;
    let mut sources: Vec<_> = session
        .roster()
        .iter()
        .map(|c| default_source_for(c, true, options.seed))
        .collect();
    session.start()?;

    while !session.is_ended() {
        let actor = session
            .current_actor()
            .ok_or_else(|| anyhow!("battle stalled in {:?}", session.phase()))?;
        if session.auto_act(sources[actor.index()].as_mut())? == 0 {
            bail!("no action chosen for {}", actor);
        }
    }

    let outcome = session
        .end_reason()
        .ok_or_else(|| anyhow!("battle did not end"))?;
    let roster = session.roster();
    let log = session
        .events()
        .iter()
        .map(|e| describe(e, roster))
        .collect();
    let winner = match outcome {
        EndReason::Victory => "allies",
        EndReason::Defeat => "enemies",
        _ => "none",
    };

    Ok(EncounterResult {
        winner: winner.to_string(),
        outcome,
        rounds: session.round(),
        ally_hp_end: hp_of(roster, Faction::Ally),
        enemy_hp_end: hp_of(roster, Faction::Enemy),
        log,
        summary: summarize(outcome, session.round(), roster, &BountyRewards),
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimStats {
    pub samples: u32,
    pub victories: u32,
    pub defeats: u32,
    pub draws: u32,
    /// Fled or aborted.
    pub other: u32,
    pub avg_rounds: f64,
}

/// Monte Carlo over `trials` battles; trial `i` uses `seed + i`.
pub fn simulate_many(cfg: EncounterConfig, trials: u32) -> Result<SimStats> {
    let mut stats = SimStats::default();
    let mut total_rounds = 0u64;
    for i in 0..trials {
        let trial = EncounterConfig {
            seed: cfg.seed.wrapping_add(u64::from(i)),
            ..cfg.clone()
        };
        let res = simulate_encounter(trial)?;
        stats.samples += 1;
        total_rounds += u64::from(res.rounds);
        match res.outcome {
            EndReason::Victory => stats.victories += 1,
            EndReason::Defeat => stats.defeats += 1,
            EndReason::Draw => stats.draws += 1,
            EndReason::Fled | EndReason::Aborted => stats.other += 1,
        }
    }
    if stats.samples > 0 {
        stats.avg_rounds = total_rounds as f64 / f64::from(stats.samples);
    }
    Ok(stats)
}

fn load_encounter(cfg: &EncounterConfig) -> Result<EncounterDef> {
    if let Some(encounter) = &cfg.encounter {
        return Ok(encounter.clone());
    }
    match (&cfg.encounter_path, &cfg.encounter_id) {
        (Some(path), _) => EncounterDef::load(path),
        (None, Some(id)) => EncounterDef::builtin(id),
        (None, None) => bail!("either encounter_path or encounter_id is required"),
    }
}

fn hp_of(roster: &[Combatant], faction: Faction) -> Vec<i32> {
    roster
        .iter()
        .filter(|c| c.faction == faction)
        .map(|c| c.hp())
        .collect()
}
