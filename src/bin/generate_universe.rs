//! Universe generator binary: loads a block of filaments and their sectors,
//! saving one JSON record per node.
//!
//! Usage: cargo run --release --bin generate_universe -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>     Cascade settings JSON (default: built-in defaults)
//!   --seed <SEED>       Override every level's seed
//!   --filaments <N>     Load an N x N block of filaments from (0, 0) (default: 2)
//!   --sectors <N>       Sectors per filament axis to load (default: 2)
//!   --out <DIR>         Output directory (default: "universe")
//!   --jobs <N>          Kernel worker threads (default: rayon's choice)
//!   --max-ticks <N>     Give up after this many ticks (default: 10000)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use cosmogen::coords::{Level, Position};
use cosmogen::core::Result;
use cosmogen::generation::{CascadeSettings, NoiseKernel};
use cosmogen::hierarchy::NodeKind;
use cosmogen::streaming::{DirectoryStore, Scheduler};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = parse_str_arg(&args, "--config").map(PathBuf::from);
    let seed = parse_i32_arg(&args, "--seed");
    let filaments = parse_i32_arg(&args, "--filaments").unwrap_or(2).max(1);
    let sectors = parse_i32_arg(&args, "--sectors").unwrap_or(2).max(0);
    let output_dir = PathBuf::from(parse_str_arg(&args, "--out").unwrap_or_else(|| "universe".to_string()));
    let max_ticks = parse_i32_arg(&args, "--max-ticks").unwrap_or(10_000).max(1) as u64;

    if let Some(jobs) = parse_i32_arg(&args, "--jobs") {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1) as usize)
            .build_global()
        {
            log::warn!("Could not configure thread pool: {}", e);
        }
    }

    let mut cascade = match &config {
        Some(path) => CascadeSettings::load(path)?,
        None => CascadeSettings::default(),
    };
    if let Some(seed) = seed {
        for level in [&mut cascade.universe, &mut cascade.filament, &mut cascade.sector, &mut cascade.region] {
            level.seed = seed;
        }
    }
    let sector_size = cascade.filament.size() as i32;

    println!("=== Cosmogen Universe Generator ===");
    println!("Universe:  {0} x {0} cells", cascade.universe.size());
    println!("Filaments: {0} x {0}", filaments);
    println!("Sectors:   {0} x {0} per filament", sectors.min(sector_size));
    println!("Output:    {}", output_dir.display());
    println!();

    let store = Arc::new(DirectoryStore::new(&output_dir)?);
    let mut scheduler = Scheduler::new(cascade.clone(), Arc::new(NoiseKernel), store)?;

    for fx in 0..filaments {
        for fy in 0..filaments {
            scheduler.request(NodeKind::Filament, Position::filament(fx, fy))?;
            for sx in 0..sectors.min(sector_size) {
                for sy in 0..sectors.min(sector_size) {
                    let sector = Position::sector(fx * sector_size + sx, fy * sector_size + sy);
                    scheduler.request(NodeKind::Sector, sector)?;
                }
            }
        }
    }

    let start = Instant::now();
    let ticks = scheduler.run_until_idle(max_ticks)?;
    let elapsed = start.elapsed();

    let counts: serde_json::Map<String, serde_json::Value> = NodeKind::ALL
        .iter()
        .map(|kind| (kind.to_string(), json!(scheduler.registry().count(*kind))))
        .collect();
    println!(
        "Done: {} nodes in {} ticks, {:.2}s ({} kernel dispatches)",
        scheduler.registry().len(),
        ticks,
        elapsed.as_secs_f64(),
        scheduler.pipeline().dispatch_count(),
    );
    if !scheduler.is_idle() {
        log::warn!("Stopped after {} ticks with requests still queued", ticks);
    }

    let manifest = json!({
        "cascade": scheduler.cascade(),
        "universe_seed": scheduler.registry().universe().seed(),
        "levels": Level::ALL.iter().map(|l| l.to_string()).collect::<Vec<_>>(),
        "nodes": counts,
        "ticks": ticks,
        "idle": scheduler.is_idle(),
    });
    let manifest_path = output_dir.join("manifest.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    println!("Manifest: {}", manifest_path.display());

    Ok(())
}

fn parse_i32_arg(args: &[String], flag: &str) -> Option<i32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
