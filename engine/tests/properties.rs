use proptest::prelude::*;
use skirmish_engine::ai::{ActionSource, DefaultAi};
use skirmish_engine::events::replay;
use skirmish_engine::scheduler::build_queue;
use skirmish_engine::session::SessionSetup;
use skirmish_engine::{BattleSession, Catalog, Dice, EventKind, Stat, UnitDefinition};

fn unit_strategy(prefix: &'static str) -> impl Strategy<Value = UnitDefinition> {
    (1..200i32, 1.0..40.0f64, 0.0..60.0f64, 0.0..20.0f64, 0.0..20.0f64).prop_map(
        move |(hp, atk, def, spd, acc)| {
            UnitDefinition::new(prefix, prefix, hp)
                .with_stat(Stat::Attack, atk)
                .with_stat(Stat::Defense, def)
                .with_stat(Stat::Speed, spd.floor())
                .with_stat(Stat::Accuracy, acc)
        },
    )
}

fn battle(allies: &[UnitDefinition], enemies: &[UnitDefinition], seed: u64) -> BattleSession {
    let setup = SessionSetup::new(Catalog::default())
        .with_dice(Dice::from_seed(seed))
        .with_max_rounds(None);
    BattleSession::new(allies, enemies, setup).unwrap()
}

/// Runs the battle with every unit on the default AI, checking hp bounds after each action.
/// Returns how many actions it took.
fn run_checked(session: &mut BattleSession, seed: u64) -> usize {
    let mut sources: Vec<Box<dyn ActionSource>> = session
        .roster()
        .iter()
        .map(|c| Box::new(DefaultAi::new(seed ^ u64::from(c.id.0))) as Box<dyn ActionSource>)
        .collect();
    session.start().unwrap();
    let mut steps = 0;
    while !session.is_ended() && steps < 20_000 {
        let actor = session.current_actor().unwrap();
        session.auto_act(sources[actor.index()].as_mut()).unwrap();
        for c in session.roster() {
            assert!(c.hp() >= 0 && c.hp() <= c.max_hp(), "{} has {} hp", c.name, c.hp());
        }
        steps += 1;
    }
    steps
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn battles_end_with_hp_in_bounds(
        allies in prop::collection::vec(unit_strategy("ally"), 1..4),
        enemies in prop::collection::vec(unit_strategy("enemy"), 1..4),
        seed in any::<u64>(),
    ) {
        let mut session = battle(&allies, &enemies, seed);
        run_checked(&mut session, seed);
        prop_assert!(session.is_ended());
    }

    #[test]
    fn replay_reproduces_the_final_roster(
        allies in prop::collection::vec(unit_strategy("ally"), 1..4),
        enemies in prop::collection::vec(unit_strategy("enemy"), 1..4),
        seed in any::<u64>(),
    ) {
        let mut session = battle(&allies, &enemies, seed);
        run_checked(&mut session, seed);
        let rebuilt = replay(session.initial_roster(), session.events());
        prop_assert_eq!(rebuilt.as_slice(), session.roster());
    }

    #[test]
    fn every_round_queues_exactly_the_living_fastest_first(
        allies in prop::collection::vec(unit_strategy("ally"), 1..4),
        enemies in prop::collection::vec(unit_strategy("enemy"), 1..4),
        seed in any::<u64>(),
    ) {
        let mut session = battle(&allies, &enemies, seed);
        run_checked(&mut session, seed);

        let mut board = session.initial_roster().to_vec();
        for event in session.events() {
            if let EventKind::RoundStarted { queue, .. } = &event.kind {
                // board as it stood when the round opened
                let mut at_start = board.clone();
                for c in at_start.iter_mut() {
                    c.purge_expired();
                }
                let rebuilt: Vec<_> = build_queue(&at_start).remaining().collect();
                prop_assert_eq!(&rebuilt, queue);
                let again: Vec<_> = build_queue(&at_start).remaining().collect();
                prop_assert_eq!(&again, queue);

                let living = at_start.iter().filter(|c| c.is_alive()).count();
                prop_assert_eq!(queue.len(), living);
                for pair in queue.windows(2) {
                    let a = &at_start[pair[0].index()];
                    let b = &at_start[pair[1].index()];
                    prop_assert!(a.stat(Stat::Speed) >= b.stat(Stat::Speed));
                }
            }
            skirmish_engine::events::apply_event(&mut board, event);
        }
    }
}
