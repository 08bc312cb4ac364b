use clap::Parser;
use encoding_rs::Encoding;
use skirmish_engine::api::{simulate_many, EncounterConfig};
use skirmish_engine::EncounterDef;
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(name = "simulate-many")]
#[command(about = "Monte Carlo sim: many all-AI runs of one encounter")]
struct Args {
    /// Built-in encounter id
    #[arg(long, default_value = "slime_den")]
    encounter: String,

    /// Encounter JSON file (overrides --encounter)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Number of trials
    #[arg(long, default_value_t = 1000)]
    trials: u32,

    /// Safety cap on rounds per trial
    #[arg(long)]
    max_rounds: Option<u32>,

    /// RNG base seed (trial i uses seed+i)
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Print the stats as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn read_text_auto(path: &std::path::Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let encounter = match &args.file {
        Some(path) => EncounterDef::from_json(&read_text_auto(path)?)?,
        None => EncounterDef::builtin(&args.encounter)?,
    };
    let name = encounter.name.clone();
    let cfg = EncounterConfig {
        encounter: Some(encounter),
        seed: args.seed,
        max_rounds: args.max_rounds,
        ..Default::default()
    };
    let stats = simulate_many(cfg, args.trials)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let pct = |n: u32| {
        if stats.samples == 0 {
            0.0
        } else {
            f64::from(n) * 100.0 / f64::from(stats.samples)
        }
    };
    println!("simulate-many results");
    println!("---------------------");
    println!("encounter:          {}", name);
    println!("trials:             {}", stats.samples);
    println!();
    println!("victory rate:       {:.1}%", pct(stats.victories));
    println!("defeat rate:        {:.1}%", pct(stats.defeats));
    println!("draw rate:          {:.1}%", pct(stats.draws));
    println!("avg rounds:         {:.2}", stats.avg_rounds);

    Ok(())
}
