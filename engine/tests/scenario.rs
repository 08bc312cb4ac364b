use skirmish_engine::ai::{ActionSource, DefaultAi};
use skirmish_engine::events::{describe, replay};
use skirmish_engine::session::SessionSetup;
use skirmish_engine::{
    BattleSession, Catalog, CombatantId, Dice, EndReason, EventKind, Faction, Phase, Stat,
    UnitDefinition,
};

fn knight() -> UnitDefinition {
    UnitDefinition::new("hero_knight", "Knight", 100)
        .with_stat(Stat::Attack, 20.0)
        .with_stat(Stat::Speed, 10.0)
}

fn slime() -> UnitDefinition {
    UnitDefinition::new("slime", "Slime", 50)
        .with_stat(Stat::Attack, 5.0)
        .with_stat(Stat::Speed, 5.0)
}

fn run_to_end(session: &mut BattleSession) {
    let mut sources: Vec<Box<dyn ActionSource>> = session
        .roster()
        .iter()
        .map(|c| Box::new(DefaultAi::new(u64::from(c.id.0))) as Box<dyn ActionSource>)
        .collect();
    session.start().unwrap();
    while !session.is_ended() {
        let actor = session.current_actor().unwrap();
        let appended = session.auto_act(sources[actor.index()].as_mut()).unwrap();
        assert!(appended > 0);
    }
}

fn forced_hits() -> BattleSession {
    let setup = SessionSetup::new(Catalog::default()).with_dice(Dice::always_hit());
    BattleSession::new(&[knight()], &[slime()], setup).unwrap()
}

#[test]
fn knight_beats_slime_in_three_actions() {
    let mut session = forced_hits();
    run_to_end(&mut session);

    assert_eq!(session.phase(), Phase::Ended(EndReason::Victory));
    assert_eq!(session.round(), 3);

    let knight_outcomes = session
        .events()
        .iter()
        .filter(|e| matches!(&e.kind, EventKind::OutcomeApplied { outcome } if outcome.actor == CombatantId(0)))
        .count();
    assert_eq!(knight_outcomes, 3);

    let tail: Vec<_> = session.events().iter().rev().take(3).rev().collect();
    assert!(matches!(&tail[0].kind, EventKind::OutcomeApplied { outcome } if outcome.actor == CombatantId(0)));
    assert_eq!(tail[1].kind, EventKind::UnitDefeated { unit: CombatantId(1) });
    assert_eq!(
        tail[2].kind,
        EventKind::BattleEnded {
            reason: EndReason::Victory,
            rounds: 3
        }
    );

    let knight = session.combatant(CombatantId(0)).unwrap();
    assert_eq!(knight.hp(), 90);
    assert_eq!(session.living(Faction::Enemy).count(), 0);
}

#[test]
fn scenario_log_reads_like_a_fight() {
    let mut session = forced_hits();
    run_to_end(&mut session);
    let log: Vec<String> = session
        .events()
        .iter()
        .map(|e| describe(e, session.roster()))
        .collect();

    insta::assert_snapshot!(log.join("\n"), @r###"
    [ROUND] 1 order: Knight → Slime
    [TURN][Knight]
    [ACTION][Knight] attack → Slime
    [HIT][Knight] Slime -20
    [TURN][Slime]
    [ACTION][Slime] attack → Knight
    [HIT][Slime] Knight -5
    [ROUND] 2 order: Knight → Slime
    [TURN][Knight]
    [ACTION][Knight] attack → Slime
    [HIT][Knight] Slime -20
    [TURN][Slime]
    [ACTION][Slime] attack → Knight
    [HIT][Slime] Knight -5
    [ROUND] 3 order: Knight → Slime
    [TURN][Knight]
    [ACTION][Knight] attack → Slime
    [HIT][Knight] Slime -20
    [DEFEAT][Slime] is defeated
    [END] victory after 3 rounds
    "###);
}

#[test]
fn sequence_numbers_are_dense_and_ordered() {
    let mut session = forced_hits();
    run_to_end(&mut session);
    for (i, event) in session.events().iter().enumerate() {
        assert_eq!(event.seq, i as u64);
    }
}

#[test]
fn replay_rebuilds_final_board() {
    let mut session = forced_hits();
    run_to_end(&mut session);
    let rebuilt = replay(session.initial_roster(), session.events());
    assert_eq!(rebuilt.as_slice(), session.roster());
}

#[test]
fn events_serialize_for_the_presentation_layer() {
    let mut session = forced_hits();
    run_to_end(&mut session);
    let json = serde_json::to_value(session.events().last().unwrap()).unwrap();
    assert_eq!(json["kind"], "battle_ended");
    assert_eq!(json["reason"], "victory");
    assert_eq!(json["rounds"], 3);
}
