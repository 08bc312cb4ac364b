use skirmish_engine::api::{simulate_encounter, simulate_many, EncounterConfig};
use skirmish_engine::EndReason;

fn builtin(id: &str, seed: u64) -> EncounterConfig {
    EncounterConfig {
        encounter_id: Some(id.into()),
        seed,
        ..Default::default()
    }
}

#[test]
fn slime_den_runs_to_completion() {
    let res = simulate_encounter(builtin("slime_den", 2025)).unwrap();
    assert!(res.rounds > 0);
    assert_eq!(res.outcome, EndReason::Victory);
    assert_eq!(res.winner, "allies");
    assert_eq!(res.enemy_hp_end, vec![0]);
    assert_eq!(res.summary.rewards.gold, 10);
    assert!(res.log.first().unwrap().starts_with("[ROUND] 1"));
    assert!(res.log.last().unwrap().starts_with("[END] victory"));
}

#[test]
fn same_seed_same_battle() {
    let a = simulate_encounter(builtin("goblin_ambush", 7)).unwrap();
    let b = simulate_encounter(builtin("goblin_ambush", 7)).unwrap();
    assert_eq!(a.log, b.log);
    assert_eq!(a.rounds, b.rounds);
}

#[test]
fn round_cap_is_honoured() {
    let cfg = EncounterConfig {
        max_rounds: Some(1),
        ..builtin("goblin_ambush", 3)
    };
    let res = simulate_encounter(cfg).unwrap();
    assert!(res.rounds <= 1);
    if res.outcome == EndReason::Draw {
        assert_eq!(res.winner, "none");
        assert!(res.summary.rewards.is_empty());
    }
}

#[test]
fn many_trials_add_up() {
    let stats = simulate_many(builtin("goblin_ambush", 1), 20).unwrap();
    assert_eq!(stats.samples, 20);
    assert_eq!(
        stats.victories + stats.defeats + stats.draws + stats.other,
        20
    );
    assert!(stats.avg_rounds >= 1.0);
}

#[test]
fn unknown_encounter_is_an_error() {
    let err = simulate_encounter(builtin("dragon_lair", 1)).unwrap_err();
    assert!(err.to_string().contains("dragon_lair"));
}

#[test]
fn missing_encounter_source_is_an_error() {
    assert!(simulate_encounter(EncounterConfig::default()).is_err());
}
