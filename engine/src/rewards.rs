use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, Faction};
use crate::session::EndReason;

/// Plain-data rewards handed to the gacha, forge and garden subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rewards {
    pub gold: u64,
    pub experience: u64,
    pub materials: IndexMap<String, u32>,
}

impl Rewards {
    pub fn is_empty(&self) -> bool {
        self.gold == 0 && self.experience == 0 && self.materials.is_empty()
    }
}

/// End-of-battle record for the save/load subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
    pub outcome: EndReason,
    pub rounds: u32,
    pub rewards: Rewards,
    /// Definition ids of every combatant down at the end, in roster order.
    pub defeated: Vec<String>,
}

/// Boundary to the subsystems that decide what a battle is worth.
pub trait RewardCalculator {
    fn compute(&self, outcome: EndReason, roster: &[Combatant]) -> Rewards;
}

/// Sums the bounties of defeated enemies. Only a victory pays out.
#[derive(Debug, Clone, Copy, Default)]
pub struct BountyRewards;

impl RewardCalculator for BountyRewards {
    fn compute(&self, outcome: EndReason, roster: &[Combatant]) -> Rewards {
        let mut rewards = Rewards::default();
        if outcome != EndReason::Victory {
            return rewards;
        }
        for unit in roster
            .iter()
            .filter(|c| c.faction == Faction::Enemy && !c.is_alive())
        {
            let bounty = unit.bounty();
            rewards.gold += bounty.gold;
            rewards.experience += bounty.experience;
            for (material, qty) in &bounty.materials {
                *rewards.materials.entry(material.clone()).or_insert(0) += qty;
            }
        }
        rewards
    }
}

pub fn summarize(
    outcome: EndReason,
    rounds: u32,
    roster: &[Combatant],
    calculator: &dyn RewardCalculator,
) -> BattleSummary {
    BattleSummary {
        outcome,
        rounds,
        rewards: calculator.compute(outcome, roster),
        defeated: roster
            .iter()
            .filter(|c| !c.is_alive())
            .map(|c| c.definition.clone())
            .collect(),
    }
}
