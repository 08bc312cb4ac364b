use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use encoding_rs::Encoding;
use skirmish_engine::events::describe;
use skirmish_engine::sync::Teardown;
use skirmish_engine::{
    Action, BattleController, BattleEvent, BattleOptions, BattleSummary, Catalog, Combatant,
    CombatantId, EncounterDef, Playback, Presenter,
};
use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    thread,
};
use tracing::Level;

#[derive(clap::Args)]
struct EncounterArgs {
    /// Built-in encounter id
    #[arg(long, default_value = "slime_den")]
    encounter: String,
    /// Encounter JSON file (overrides --encounter)
    #[arg(long)]
    file: Option<PathBuf>,
    /// Battle options file (YAML, or JSON by extension)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Directory with skills.json and items.json
    #[arg(long)]
    content: Option<PathBuf>,
    /// RNG seed for determinism
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Auto battle: every combatant on the default AI, shown through the playback loop
    Run {
        #[command(flatten)]
        enc: EncounterArgs,
        /// Sleep between playback ticks instead of running flat out
        #[arg(long, default_value_t = false)]
        realtime: bool,
        /// Print the end-of-battle summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Interactive battle: allies take commands from stdin
    Play {
        #[command(flatten)]
        enc: EncounterArgs,
    },
    /// Print an encounter definition as JSON
    DumpEncounter {
        /// Built-in encounter id
        #[arg(long, default_value = "slime_den")]
        encounter: String,
        /// Pretty-print JSON
        #[arg(long, default_value_t = true)]
        pretty: bool,
    },
}

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Skirmish battle engine CLI harness")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

struct Loaded {
    encounter: EncounterDef,
    catalog: Catalog,
    options: BattleOptions,
}

fn load(args: &EncounterArgs) -> anyhow::Result<Loaded> {
    let encounter = match &args.file {
        Some(path) => EncounterDef::from_json(&read_text_auto(path)?)
            .with_context(|| format!("in {}", path.display()))?,
        None => EncounterDef::builtin(&args.encounter)?,
    };
    let catalog = match &args.content {
        Some(dir) => Catalog::load_dir(dir)?,
        None => Catalog::builtin()?,
    };
    let mut options = match &args.options {
        Some(path) => BattleOptions::load(path)?,
        None => BattleOptions::default(),
    };
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    for (item, qty) in &encounter.inventory {
        options.inventory.entry(item.clone()).or_insert(*qty);
    }
    Ok(Loaded {
        encounter,
        catalog,
        options,
    })
}

/// Prints each event as one log line.
struct ConsolePresenter {
    roster: Vec<Combatant>,
}

impl Presenter for ConsolePresenter {
    fn play(&mut self, event: &BattleEvent) -> Playback {
        println!("{}", describe(event, &self.roster));
        Playback::Finished
    }
}

fn presenter_for(ctl: &BattleController) -> ConsolePresenter {
    ConsolePresenter {
        roster: ctl
            .session()
            .map(|s| s.roster().to_vec())
            .unwrap_or_default(),
    }
}

/// Ticks playback until the battle is over or a player decision is due, with every event shown.
fn settle(
    ctl: &mut BattleController,
    presenter: &mut ConsolePresenter,
    options: &BattleOptions,
    realtime: bool,
) -> anyhow::Result<()> {
    let dt = options.animation_cadence();
    for _ in 0..1_000_000 {
        let Some(snap) = ctl.snapshot() else {
            return Ok(());
        };
        let caught_up = ctl
            .session()
            .is_some_and(|s| s.events().len() == snap.displayed);
        if caught_up && (snap.phase.is_ended() || snap.awaiting_player) {
            return Ok(());
        }
        ctl.tick(dt, presenter)?;
        if realtime {
            thread::sleep(dt);
        }
    }
    bail!("playback did not settle")
}

fn print_summary(summary: &BattleSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!(
        "[SUMMARY] outcome={} rounds={} gold={} xp={}",
        summary.outcome, summary.rounds, summary.rewards.gold, summary.rewards.experience
    );
    for (material, qty) in &summary.rewards.materials {
        println!("[LOOT] {} x{}", material, qty);
    }
    Ok(())
}

fn run(enc: &EncounterArgs, realtime: bool, json: bool) -> anyhow::Result<()> {
    let Loaded {
        encounter,
        catalog,
        mut options,
    } = load(enc)?;
    options.auto_mode = true;

    let mut ctl = BattleController::new(catalog);
    ctl.start(&encounter.allies, &encounter.enemies, options.clone())?;
    let mut presenter = presenter_for(&ctl);
    if !json {
        println!("[START] {}", encounter.name);
    }
    settle(&mut ctl, &mut presenter, &options, realtime)?;
    match ctl.summary() {
        Some(summary) => print_summary(summary, json),
        None => bail!("battle did not end"),
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Act(Action),
    Skip,
    Status,
    Help,
    Quit,
}

fn parse_id(token: Option<&str>) -> Result<Option<CombatantId>, String> {
    token
        .map(|t| {
            t.trim_start_matches('#')
                .parse::<u32>()
                .map(CombatantId)
                .map_err(|_| format!("'{}' is not a combatant number", t))
        })
        .transpose()
}

fn parse_command(line: &str, actor: CombatantId) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err("empty command".to_string());
    };
    let cmd = match verb.to_lowercase().as_str() {
        "attack" | "a" => {
            let target = parse_id(parts.next())?.ok_or("attack needs a target number")?;
            Command::Act(Action::attack(actor, target))
        }
        "skill" | "s" => {
            let id = parts.next().ok_or("skill needs an id")?;
            let targets = parts
                .map(|t| parse_id(Some(t)))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();
            Command::Act(Action::skill(actor, id, targets))
        }
        "item" | "i" => {
            let id = parts.next().ok_or("item needs an id")?;
            let target = parse_id(parts.next())?.unwrap_or(actor);
            Command::Act(Action::item(actor, id, target))
        }
        "defend" | "d" => Command::Act(Action::defend(actor)),
        "flee" | "f" => Command::Act(Action::flee(actor)),
        "skip" => Command::Skip,
        "status" | "board" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(cmd)
}

const HELP: &str = "commands: attack N | skill ID [N..] | item ID [N] | defend | flee | skip | status | quit";

fn print_board(ctl: &BattleController) {
    let Some(snap) = ctl.snapshot() else {
        return;
    };
    println!("[BOARD] round {}", snap.round);
    for c in &snap.combatants {
        let marker = if Some(c.id) == snap.current_actor { ">" } else { " " };
        let effects = c
            .effects
            .iter()
            .map(|e| format!("{:?}({})", e.kind, e.remaining))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{} {} {:<14} {:>4}/{:<4} {} {}",
            marker, c.id, c.name, c.hp, c.max_hp, c.faction, effects
        );
    }
}

fn play(enc: &EncounterArgs) -> anyhow::Result<()> {
    let Loaded {
        encounter,
        catalog,
        mut options,
    } = load(enc)?;
    options.auto_mode = false;

    let mut ctl = BattleController::new(catalog);
    ctl.start(&encounter.allies, &encounter.enemies, options.clone())?;
    let mut presenter = presenter_for(&ctl);
    println!("[START] {}  ({})", encounter.name, HELP);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        settle(&mut ctl, &mut presenter, &options, false)?;
        let Some(actor) = ctl.awaiting_player() else {
            break;
        };
        print_board(&ctl);
        let name = presenter
            .roster
            .get(actor.index())
            .map(|c| c.name.clone())
            .unwrap_or_default();
        print!("{} > ", name);
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            ctl.forfeit()?;
            break;
        };
        match parse_command(&line?, actor) {
            Ok(Command::Act(action)) => {
                if let Err(e) = ctl.submit_action(action) {
                    println!("[REJECTED] {}", e);
                }
            }
            Ok(Command::Skip) => {
                ctl.skip(&mut presenter)?;
            }
            Ok(Command::Status) => print_board(&ctl),
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Quit) => {
                ctl.forfeit()?;
                break;
            }
            Err(msg) => println!("[ERROR] {}", msg),
        }
    }

    settle(&mut ctl, &mut presenter, &options, false)?;
    if let Some(summary) = ctl.summary() {
        print_summary(summary, false)?;
    }
    ctl.stop(Teardown::Discard, &mut presenter);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    match cli.cmd {
        Cmd::Run {
            enc,
            realtime,
            json,
        } => run(&enc, realtime, json)?,
        Cmd::Play { enc } => play(&enc)?,
        Cmd::DumpEncounter { encounter, pretty } => {
            let enc = EncounterDef::builtin(&encounter)?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&enc)?);
            } else {
                println!("{}", serde_json::to_string(&enc)?);
            }
        }
    }
    Ok(())
}
