//! Headless terrain streamer: flies an observer across noise terrain.
//!
//! Usage: cargo run --release --bin stream_terrain -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   JSON terrain configuration (default: built-in)
//!   --ticks <N>       Number of ticks to run (default: 600)
//!   --speed <UNITS>   Observer movement per tick (default: 5% of chunk width)
//!   --max-lod <LOD>   Override the finest LOD
//!   --workers <N>     Override the generation worker count
//!   --seed <SEED>     Override the height noise seed
//!   --every <N>       Print stats every N ticks (default: 60)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;

use lodterrain::core::Result;
use lodterrain::streaming::{HeadlessSink, TerrainService, TerrainStats};
use lodterrain::terrain::{NoiseHeightSampler, TerrainConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => TerrainConfig::load(&PathBuf::from(path))?,
        None => TerrainConfig::default(),
    };
    if let Some(max_lod) = parse_u32_arg(&args, "--max-lod") {
        config.max_lod = max_lod;
        config.lod_rings.truncate(max_lod as usize + 1);
    }
    if let Some(workers) = parse_usize_arg(&args, "--workers") {
        config.worker_threads = workers;
    }
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.height.seed = seed;
    }
    config.validate()?;

    let ticks = parse_usize_arg(&args, "--ticks").unwrap_or(600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(config.chunk_width * 0.05);
    let every = parse_usize_arg(&args, "--every").unwrap_or(60).max(1);

    println!("=== LOD Terrain Streamer ===");
    println!("Chunk width: {}", config.chunk_width);
    println!("Max LOD:     {}", config.max_lod);
    println!("Workers:     {}", config.worker_threads);
    println!("Rings:       {:?}", config.lod_rings);
    println!("Ticks:       {} at {} units/tick", ticks, speed);
    println!();

    let sampler = Arc::new(NoiseHeightSampler::new(config.height.clone()));
    let mut service = TerrainService::new(config, sampler, HeadlessSink::new())?;

    let start = Instant::now();
    let mut observer = Vec2::new(0.5, 0.5);
    let mut totals = TerrainStats::default();

    for tick in 0..ticks {
        let stats = service.tick(observer);
        totals.installed += stats.installed;
        totals.launched += stats.launched;
        totals.evicted += stats.evicted;

        if tick % every == 0 || tick + 1 == ticks {
            let sink = service.sink();
            eprintln!(
                "  [{}/{}] observer ({:.0}, {:.0}) visible {} stored {} pending {} in flight {} triangles {}",
                tick + 1,
                ticks,
                observer.x,
                observer.y,
                stats.visible_chunks,
                stats.stored_chunks,
                stats.pending,
                stats.in_flight,
                sink.visible_triangles()
            );
        }

        observer.x += speed;
        observer.y += speed * 0.25;
        // Roughly 60 ticks per second
        std::thread::sleep(Duration::from_millis(16));
    }

    let last = service.tick(observer);
    totals.tick = last.tick;
    totals.pending = last.pending;
    totals.in_flight = last.in_flight;
    totals.failed = last.failed;
    totals.visible_chunks = last.visible_chunks;
    totals.stored_chunks = last.stored_chunks;

    println!();
    println!("Done in {:.1}s", start.elapsed().as_secs_f64());
    println!("{}", serde_json::to_string_pretty(&totals)?);

    let sink = service.shutdown();
    log::info!("Sink saw {} section creates and {} visibility toggles", sink.creates, sink.toggles);
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
