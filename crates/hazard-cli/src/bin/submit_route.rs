//! Submit a route file to the hazard server and print the analysis.

use clap::Parser;
use hazard_cli::{load_route_file, summarize, HazardClient};
use std::path::PathBuf;
use std::time::Duration;

/// Send a route to the hazard server for analysis
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Route file (waypoint array or object with waypoints)
    path: PathBuf,

    /// Hazard server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Request enrichment (POIs, weather, traffic, addresses)
    #[arg(long)]
    enhanced: bool,

    /// Force a fresh analysis even if the server has one cached
    #[arg(long)]
    no_cache: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let route = load_route_file(&args.path)?;

    println!("Submitting {} to {}...", args.path.display(), args.url);
    let client = HazardClient::new(&args.url, Duration::from_secs(args.timeout))?;
    let analysis = client.analyze(&route, args.enhanced, !args.no_cache)?;

    if analysis.cached {
        println!("(served from cache, run {})", analysis.run_id);
    }
    print!("{}", summarize(&analysis));
    Ok(())
}
