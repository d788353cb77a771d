//! Inspect a route file offline.
//!
//! Runs the geometric detectors and the coverage sampler locally; no
//! provider is contacted.

use clap::Parser;
use hazard_cli::{inspect_offline, load_route_file, summarize};
use hazard_core::{HazardRules, SimulatedCoverage};
use std::path::PathBuf;

/// Run offline hazard detectors on a JSON route file
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Route file (waypoint array or object with waypoints)
    path: PathBuf,

    /// Seed for simulated network coverage, for repeatable output
    #[arg(long)]
    seed: Option<u64>,

    /// Sharp-turn threshold in degrees
    #[arg(long, default_value_t = 60.0)]
    sharp_turn_threshold: f64,

    /// Print the full analysis as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let route = load_route_file(&args.path)?.into_route()?;
    let rules = HazardRules {
        sharp_turn_threshold_deg: args.sharp_turn_threshold,
        ..HazardRules::default()
    };
    let coverage = match args.seed {
        Some(seed) => SimulatedCoverage::seeded(seed),
        None => SimulatedCoverage::new(),
    };

    let analysis = inspect_offline(route, &rules, &coverage);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", summarize(&analysis));
    }
    Ok(())
}
