use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, CombatantId};
use crate::content::{Catalog, TargetRule};
use crate::effects::EffectPayload;
use crate::error::{ActionRejection, BattleError, TargetRejection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActionKind {
    BasicAttack,
    Skill(String),
    Defend,
    Flee,
    Item(String),
}

/// What a combatant does on its turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub actor: CombatantId,
    pub kind: ActionKind,
    /// Declared targets. Multi-target actions may leave this empty to hit every eligible unit.
    #[serde(default)]
    pub targets: Vec<CombatantId>,
}

impl Action {
    pub fn attack(actor: CombatantId, target: CombatantId) -> Self {
        Self {
            actor,
            kind: ActionKind::BasicAttack,
            targets: vec![target],
        }
    }

    pub fn skill(actor: CombatantId, skill: impl Into<String>, targets: Vec<CombatantId>) -> Self {
        Self {
            actor,
            kind: ActionKind::Skill(skill.into()),
            targets,
        }
    }

    pub fn item(actor: CombatantId, item: impl Into<String>, target: CombatantId) -> Self {
        Self {
            actor,
            kind: ActionKind::Item(item.into()),
            targets: vec![target],
        }
    }

    pub fn defend(actor: CombatantId) -> Self {
        Self {
            actor,
            kind: ActionKind::Defend,
            targets: Vec::new(),
        }
    }

    pub fn flee(actor: CombatantId) -> Self {
        Self {
            actor,
            kind: ActionKind::Flee,
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Potency {
    /// Multiplier on the actor's attack.
    Scaled(f64),
    Flat(i32),
}

/// Catalog-independent shape of a damaging or supporting action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionProfile {
    pub target: TargetRule,
    pub potency: Potency,
    pub effect: Option<EffectPayload>,
    pub revive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionShape {
    Effect(ActionProfile),
    Defend,
    Flee,
}

impl ActionKind {
    /// Looks the action up in the catalog and checks the actor may use it.
    pub fn shape(&self, actor: &Combatant, catalog: &Catalog) -> Result<ActionShape, ActionRejection> {
        match self {
            ActionKind::BasicAttack => Ok(ActionShape::Effect(ActionProfile {
                target: TargetRule::SingleEnemy,
                potency: Potency::Scaled(1.0),
                effect: None,
                revive: false,
            })),
            ActionKind::Skill(id) => {
                let skill = catalog
                    .skill(id)
                    .ok_or_else(|| ActionRejection::UnknownSkill(id.clone()))?;
                if !actor.knows_skill(id) {
                    return Err(ActionRejection::SkillNotLearned {
                        actor: actor.id,
                        skill: id.clone(),
                    });
                }
                Ok(ActionShape::Effect(ActionProfile {
                    target: skill.target,
                    potency: Potency::Scaled(skill.power),
                    effect: skill.effect,
                    revive: skill.revive,
                }))
            }
            ActionKind::Item(id) => {
                let item = catalog
                    .item(id)
                    .ok_or_else(|| ActionRejection::UnknownItem(id.clone()))?;
                Ok(ActionShape::Effect(ActionProfile {
                    target: item.target,
                    potency: Potency::Flat(item.heal),
                    effect: item.effect,
                    revive: item.revive,
                }))
            }
            ActionKind::Defend => Ok(ActionShape::Defend),
            ActionKind::Flee => Ok(ActionShape::Flee),
        }
    }
}

fn lookup(roster: &[Combatant], id: CombatantId) -> Result<&Combatant, BattleError> {
    roster.get(id.index()).ok_or(BattleError::InvalidTarget {
        target: id,
        reason: TargetRejection::Unknown,
    })
}

fn check_target(
    actor: &Combatant,
    target: &Combatant,
    hostile: bool,
    allow_defeated: bool,
) -> Result<(), BattleError> {
    let wanted = if hostile {
        actor.faction.opponent()
    } else {
        actor.faction
    };
    let reject = |reason| BattleError::InvalidTarget {
        target: target.id,
        reason,
    };
    if target.faction != wanted {
        return Err(reject(TargetRejection::WrongFaction));
    }
    if !target.is_alive() && !allow_defeated {
        return Err(reject(TargetRejection::Defeated));
    }
    Ok(())
}

/// Resolves the declared targets of an action in declaration order.
pub fn select_targets(
    actor: &Combatant,
    profile: &ActionProfile,
    declared: &[CombatantId],
    roster: &[Combatant],
) -> Result<Vec<CombatantId>, BattleError> {
    let hostile = profile.target.is_hostile();
    match profile.target {
        TargetRule::SelfOnly => match declared {
            [] => Ok(vec![actor.id]),
            [only] if *only == actor.id => Ok(vec![actor.id]),
            [other, ..] => Err(BattleError::InvalidTarget {
                target: *other,
                reason: TargetRejection::WrongFaction,
            }),
        },
        TargetRule::SingleEnemy | TargetRule::SingleAlly => match declared {
            [] => Err(BattleError::InvalidTarget {
                target: actor.id,
                reason: TargetRejection::Missing,
            }),
            [one] => {
                let target = lookup(roster, *one)?;
                check_target(actor, target, hostile, profile.revive)?;
                Ok(vec![*one])
            }
            [_, extra, ..] => Err(BattleError::InvalidTarget {
                target: *extra,
                reason: TargetRejection::TooMany,
            }),
        },
        TargetRule::AllEnemies | TargetRule::AllAllies => {
            if declared.is_empty() {
                let side = if hostile {
                    actor.faction.opponent()
                } else {
                    actor.faction
                };
                return Ok(roster
                    .iter()
                    .filter(|c| c.faction == side && c.is_alive())
                    .map(|c| c.id)
                    .collect());
            }
            let mut out = Vec::with_capacity(declared.len());
            for id in declared {
                let target = lookup(roster, *id)?;
                check_target(actor, target, hostile, false)?;
                if !out.contains(id) {
                    out.push(*id);
                }
            }
            Ok(out)
        }
    }
}
