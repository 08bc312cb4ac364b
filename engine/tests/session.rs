use skirmish_engine::session::SessionSetup;
use skirmish_engine::{
    Action, ActionRejection, BattleError, BattleSession, Catalog, CombatantId, Dice, EndReason,
    EventKind, Faction, Phase, Stat, TargetRejection, UnitDefinition,
};

const KNIGHT: CombatantId = CombatantId(0);
const SLIME: CombatantId = CombatantId(1);

fn knight() -> UnitDefinition {
    UnitDefinition::new("hero_knight", "Knight", 100)
        .with_stat(Stat::Attack, 20.0)
        .with_stat(Stat::Speed, 10.0)
}

fn slime(hp: i32) -> UnitDefinition {
    UnitDefinition::new("slime", "Slime", hp)
        .with_stat(Stat::Attack, 5.0)
        .with_stat(Stat::Speed, 5.0)
}

fn session_with(dice: Dice, enemies: &[UnitDefinition]) -> BattleSession {
    let setup = SessionSetup::new(Catalog::default()).with_dice(dice);
    BattleSession::new(&[knight()], enemies, setup).unwrap()
}

#[test]
fn forced_flee_ends_the_battle_with_everyone_standing() {
    let mut s = session_with(Dice::from_scripted(vec![0.0]), &[slime(50)]);
    s.start().unwrap();
    assert_eq!(s.current_actor(), Some(KNIGHT));

    s.submit(Action::flee(KNIGHT)).unwrap();

    assert_eq!(s.phase(), Phase::Ended(EndReason::Fled));
    assert_eq!(s.living(Faction::Ally).count(), 1);
    assert_eq!(s.living(Faction::Enemy).count(), 1);
    assert!(matches!(
        s.events().last().map(|e| &e.kind),
        Some(EventKind::BattleEnded {
            reason: EndReason::Fled,
            ..
        })
    ));
}

#[test]
fn failed_flee_passes_the_turn() {
    let mut s = session_with(Dice::from_scripted(vec![0.999]), &[slime(50)]);
    s.start().unwrap();
    s.submit(Action::flee(KNIGHT)).unwrap();
    assert_eq!(s.phase(), Phase::AwaitingAction);
    assert_eq!(s.current_actor(), Some(SLIME));
}

#[test]
fn submit_before_start_is_rejected_without_side_effects() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    let err = s.submit(Action::attack(KNIGHT, SLIME)).unwrap_err();
    assert_eq!(
        err,
        BattleError::InvalidAction(ActionRejection::WrongPhase {
            phase: Phase::Initializing
        })
    );
    assert_eq!(s.phase(), Phase::Initializing);
    assert!(s.events().is_empty());
}

#[test]
fn submit_after_end_is_rejected_without_side_effects() {
    let mut s = session_with(Dice::from_scripted(vec![0.0]), &[slime(50)]);
    s.start().unwrap();
    s.submit(Action::flee(KNIGHT)).unwrap();
    let before = s.events().len();
    let roster = s.roster().to_vec();

    let err = s.submit(Action::attack(KNIGHT, SLIME)).unwrap_err();
    assert!(matches!(
        err,
        BattleError::InvalidAction(ActionRejection::WrongPhase {
            phase: Phase::Ended(EndReason::Fled)
        })
    ));
    assert_eq!(s.events().len(), before);
    assert_eq!(s.roster(), roster.as_slice());
}

#[test]
fn starting_twice_is_rejected() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    s.start().unwrap();
    let before = s.events().len();
    assert!(s.start().is_err());
    assert_eq!(s.events().len(), before);
    assert_eq!(s.phase(), Phase::AwaitingAction);
}

#[test]
fn acting_out_of_turn_is_rejected() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    s.start().unwrap();
    let err = s.submit(Action::attack(SLIME, KNIGHT)).unwrap_err();
    assert!(matches!(
        err,
        BattleError::InvalidAction(ActionRejection::NotYourTurn { .. })
    ));
    assert_eq!(s.current_actor(), Some(KNIGHT));
}

#[test]
fn attacking_a_defeated_enemy_is_an_invalid_target() {
    let mut s = session_with(Dice::always_hit(), &[slime(10), slime(50)]);
    let other = CombatantId(2);
    s.start().unwrap();
    s.submit(Action::attack(KNIGHT, SLIME)).unwrap();
    assert!(!s.combatant(SLIME).unwrap().is_alive());

    // the downed slime's turn is skipped
    assert_eq!(s.current_actor(), Some(other));
    s.submit(Action::attack(other, KNIGHT)).unwrap();
    assert_eq!(s.current_actor(), Some(KNIGHT));

    let before = s.events().len();
    let err = s.submit(Action::attack(KNIGHT, SLIME)).unwrap_err();
    assert_eq!(
        err,
        BattleError::InvalidTarget {
            target: SLIME,
            reason: TargetRejection::Defeated
        }
    );
    assert_eq!(s.events().len(), before);
    assert_eq!(s.phase(), Phase::AwaitingAction);
    assert_eq!(s.current_actor(), Some(KNIGHT));
}

#[test]
fn attacking_an_ally_is_an_invalid_target() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    s.start().unwrap();
    let err = s.submit(Action::attack(KNIGHT, KNIGHT)).unwrap_err();
    assert!(matches!(
        err,
        BattleError::InvalidTarget {
            reason: TargetRejection::WrongFaction,
            ..
        }
    ));
}

#[test]
fn unknown_target_id_is_rejected() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    s.start().unwrap();
    let err = s.submit(Action::attack(KNIGHT, CombatantId(42))).unwrap_err();
    assert!(matches!(
        err,
        BattleError::InvalidTarget {
            reason: TargetRejection::Unknown,
            ..
        }
    ));
}

#[test]
fn empty_enemy_roster_is_fatal() {
    let setup = SessionSetup::new(Catalog::default());
    let err = BattleSession::new(&[knight()], &[], setup).unwrap_err();
    assert_eq!(
        err,
        BattleError::EmptyFaction {
            faction: Faction::Enemy
        }
    );
}

#[test]
fn zero_max_hp_is_an_invalid_definition() {
    let setup = SessionSetup::new(Catalog::default());
    let err = BattleSession::new(&[knight()], &[slime(0)], setup).unwrap_err();
    assert!(matches!(err, BattleError::InvalidDefinition { id, .. } if id == "slime"));
}

#[test]
fn unknown_skill_is_an_invalid_definition() {
    let setup = SessionSetup::new(Catalog::default());
    let err = BattleSession::new(&[knight().with_skill("meteor")], &[slime(50)], setup)
        .unwrap_err();
    assert!(matches!(err, BattleError::InvalidDefinition { id, .. } if id == "hero_knight"));
}

#[test]
fn round_cap_ends_in_a_draw() {
    let setup = SessionSetup::new(Catalog::default())
        .with_dice(Dice::always_hit())
        .with_max_rounds(Some(2));
    let mut s = BattleSession::new(&[knight()], &[slime(50)], setup).unwrap();
    s.start().unwrap();
    for _ in 0..2 {
        s.submit(Action::defend(KNIGHT)).unwrap();
        s.submit(Action::defend(SLIME)).unwrap();
    }
    assert_eq!(s.phase(), Phase::Ended(EndReason::Draw));
    assert_eq!(s.round(), 2);
}

#[test]
fn abort_skips_the_rest_of_the_queue() {
    let mut s = session_with(Dice::always_hit(), &[slime(50)]);
    s.start().unwrap();
    assert!(s.abort());
    assert_eq!(s.phase(), Phase::Ended(EndReason::Aborted));
    assert_eq!(s.current_actor(), None);
    assert!(s.queue().is_empty());
    assert!(!s.abort());
}

#[test]
fn missed_attack_changes_nothing_but_the_log() {
    // draws below 1 - 0.95 miss
    let mut s = session_with(Dice::from_scripted(vec![0.01]), &[slime(50)]);
    s.start().unwrap();
    s.submit(Action::attack(KNIGHT, SLIME)).unwrap();
    assert_eq!(s.combatant(SLIME).unwrap().hp(), 50);
    let missed = s.events().iter().any(|e| match &e.kind {
        EventKind::OutcomeApplied { outcome } => outcome.results.iter().all(|r| r.missed),
        _ => false,
    });
    assert!(missed);
}

#[test]
fn critical_hit_multiplies_damage() {
    // hit with 0.5, crit with 0.0
    let mut s = session_with(Dice::from_scripted(vec![0.5, 0.0]), &[slime(50)]);
    s.start().unwrap();
    s.submit(Action::attack(KNIGHT, SLIME)).unwrap();
    assert_eq!(s.combatant(SLIME).unwrap().hp(), 20);
}
