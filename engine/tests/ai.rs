use skirmish_engine::ai::{default_action, ActionSource, DefaultAi, PlayerInput};
use skirmish_engine::session::SessionSetup;
use skirmish_engine::{
    Action, ActionKind, BattleSession, Catalog, CombatantId, Dice, EventKind, Faction, Stat,
    UnitDefinition,
};

/// Hands out a fixed list of choices, then nothing.
struct Scripted {
    choices: Vec<Action>,
    calls: usize,
}

impl Scripted {
    fn new(choices: Vec<Action>) -> Self {
        Self { choices, calls: 0 }
    }
}

impl ActionSource for Scripted {
    fn choose(&mut self, _session: &BattleSession, _actor: CombatantId) -> Option<Action> {
        self.calls += 1;
        if self.choices.is_empty() {
            None
        } else {
            Some(self.choices.remove(0))
        }
    }
}

fn duel() -> BattleSession {
    let knight = UnitDefinition::new("hero_knight", "Knight", 100)
        .with_stat(Stat::Attack, 20.0)
        .with_stat(Stat::Speed, 10.0)
        .with_skill("power_strike")
        .with_skill("war_cry");
    let slime = UnitDefinition::new("slime", "Slime", 50).with_stat(Stat::Speed, 5.0);
    let setup = SessionSetup::new(Catalog::builtin().unwrap()).with_dice(Dice::always_hit());
    let mut s = BattleSession::new(&[knight], &[slime], setup).unwrap();
    s.start().unwrap();
    s
}

fn declared(s: &BattleSession) -> Vec<Action> {
    s.events()
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::ActionDeclared { action } => Some(action.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn invalid_choice_gets_one_reselection() {
    let me = CombatantId(0);
    let mut s = duel();
    let mut source = Scripted::new(vec![
        Action::attack(me, me),
        Action::attack(me, CombatantId(1)),
    ]);
    s.auto_act(&mut source).unwrap();
    assert_eq!(source.calls, 2);
    assert_eq!(declared(&s), vec![Action::attack(me, CombatantId(1))]);
}

#[test]
fn second_invalid_choice_falls_back_to_defend() {
    let me = CombatantId(0);
    let mut s = duel();
    let mut source = Scripted::new(vec![
        Action::attack(me, me),
        Action::attack(me, me),
        Action::attack(me, me),
    ]);
    s.auto_act(&mut source).unwrap();
    assert_eq!(source.calls, 2);
    assert_eq!(declared(&s), vec![Action::defend(me)]);
}

#[test]
fn no_choice_means_waiting() {
    let mut s = duel();
    let before = s.events().len();
    assert_eq!(s.auto_act(&mut PlayerInput::new()).unwrap(), 0);
    assert_eq!(s.events().len(), before);
}

#[test]
fn player_input_is_consumed_once() {
    let me = CombatantId(0);
    let mut s = duel();
    let mut input = PlayerInput::new();
    input.offer(Action::defend(me)).unwrap();
    assert!(input.has_pending_input());
    assert!(input.offer(Action::defend(me)).is_err());

    assert!(s.auto_act(&mut input).unwrap() > 0);
    assert!(!input.has_pending_input());
}

#[test]
fn default_ai_heals_a_badly_hurt_ally() {
    let mut wounded = UnitDefinition::new("hero_knight", "Knight", 100).with_stat(Stat::Speed, 10.0);
    wounded.hp = Some(20);
    let cleric = UnitDefinition::new("hero_cleric", "Cleric", 60)
        .with_stat(Stat::Attack, 10.0)
        .with_stat(Stat::Speed, 20.0)
        .with_skill("heal");
    let slime = UnitDefinition::new("slime", "Slime", 50);
    let setup = SessionSetup::new(Catalog::builtin().unwrap());
    let mut s = BattleSession::new(&[cleric, wounded], &[slime], setup).unwrap();
    s.start().unwrap();

    let cleric = CombatantId(0);
    assert_eq!(s.current_actor(), Some(cleric));
    let choice = DefaultAi::new(7).choose(&s, cleric).unwrap();
    assert_eq!(choice, Action::skill(cleric, "heal", vec![CombatantId(1)]));

    s.submit(choice).unwrap();
    // 10 * 1.2
    assert_eq!(s.combatant(CombatantId(1)).unwrap().hp(), 32);
}

#[test]
fn default_ai_without_skills_hits_the_weakest_enemy() {
    let knight = UnitDefinition::new("hero_knight", "Knight", 100).with_stat(Stat::Speed, 10.0);
    let mut hurt = UnitDefinition::new("slime_b", "Slime B", 50);
    hurt.hp = Some(5);
    let healthy = UnitDefinition::new("slime_a", "Slime A", 50);
    let s = {
        let mut s = BattleSession::new(
            &[knight],
            &[healthy, hurt],
            SessionSetup::new(Catalog::default()),
        )
        .unwrap();
        s.start().unwrap();
        s
    };
    let me = CombatantId(0);
    let choice = DefaultAi::new(1).choose(&s, me).unwrap();
    assert_eq!(choice.kind, ActionKind::BasicAttack);
    assert_eq!(choice.targets, vec![CombatantId(2)]);
    assert_eq!(default_action(&s, me), choice);
}

#[test]
fn default_ai_only_uses_known_skills() {
    let mut s = duel();
    let mut ai = DefaultAi::new(99);
    for _ in 0..20 {
        let Some(actor) = s.current_actor() else {
            break;
        };
        if let Some(action) = ai.choose(&s, actor) {
            if let ActionKind::Skill(id) = &action.kind {
                assert!(s.combatant(actor).unwrap().knows_skill(id));
            }
            s.submit(action).unwrap();
        }
    }
    assert!(s.is_ended() || s.living(Faction::Ally).count() == 1);
}
