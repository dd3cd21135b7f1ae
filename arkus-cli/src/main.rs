use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

use arkus_core::{run, GeneratorSettings};

#[derive(Debug, Parser)]
#[command(
    name = "arkus-randomiser",
    version,
    about = "Skylanders Giants world generator"
)]
struct Args {
    #[arg(long)]
    seed: u64,

    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value = "Player")]
    player: String,

    /// Directory holding game/items/locations/regions JSON tables;
    /// the bundled tables are used when omitted.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Play the chapters as one ordered chain instead of from the hub.
    #[arg(long, default_value_t = false)]
    linear_mode: bool,

    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=20))]
    chapters_in_pool: u32,

    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..=20))]
    chapters_to_beat: u32,

    #[arg(long, default_value_t = false)]
    include_empire: bool,

    #[arg(long, default_value_t = false)]
    include_ship: bool,

    #[arg(long, default_value_t = false)]
    include_crypt: bool,

    #[arg(long, default_value_t = false)]
    include_peak: bool,

    /// Repeatable. With --whitelist-characters these are the characters
    /// to keep; otherwise they are dropped.
    #[arg(long = "exclude-character", value_name = "NAME")]
    exclude_characters: Vec<String>,

    #[arg(long, default_value_t = false)]
    whitelist_characters: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    challenges_as_locations: bool,

    /// Percentage of top-up items drawn as traps.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=100))]
    filler_traps: u32,

    /// Repeatable weight for one trap, e.g. --trap-weight chompy_swarm=4
    #[arg(long = "trap-weight", value_name = "NAME=WEIGHT", value_parser = parse_trap_weight)]
    trap_weights: Vec<(String, u32)>,
}

fn parse_trap_weight(raw: &str) -> Result<(String, u32), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=WEIGHT, got \"{raw}\""))?;
    let weight: u32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight in \"{raw}\""))?;
    let mut key = name.trim().to_lowercase().replace(' ', "_");
    if !key.ends_with("_weight") {
        key.push_str("_weight");
    }
    Ok((key, weight))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let settings = GeneratorSettings {
        seed: args.seed,
        player_name: args.player,
        linear_mode: args.linear_mode,
        chapters_in_pool: args.chapters_in_pool,
        chapters_to_beat: args.chapters_to_beat,
        include_empire: args.include_empire,
        include_ship: args.include_ship,
        include_crypt: args.include_crypt,
        include_peak: args.include_peak,
        characters_to_exclude: args.exclude_characters,
        whitelist_characters: args.whitelist_characters,
        challenges_as_locations: args.challenges_as_locations,
        filler_traps: args.filler_traps,
        trap_weights: args.trap_weights.into_iter().collect::<HashMap<_, _>>(),
        output_path: args.output,
        data_path: args.data,
    };

    if let Err(err) = run(settings) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
