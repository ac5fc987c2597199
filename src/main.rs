//! Headless fly-through: streams a procedurally generated world while the
//! camera crosses it from west to east, logging streaming statistics.
//!
//! Usage: terrapage [CONFIG.json] [OPTIONS]
//!
//! Options:
//!   --seed <SEED>      Noise seed (default: 12345)
//!   --frames <N>       Number of frames to simulate (default: 2000)
//!   --height <H>       Camera height above the terrain (default: 40)

use std::sync::Arc;
use std::time::Instant;

use terrapage::core::{logging, Camera, Result, TerrainConfig, Vec3};
use terrapage::scene::SceneGraph;
use terrapage::streaming::LoadAction;
use terrapage::terrain::{GeneratedSource, HeightGenerator, NoiseHeightGenerator, NoiseParams};
use terrapage::world::TerrainWorld;

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1).filter(|a| !a.starts_with("--")) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            TerrainConfig::load(path)?
        }
        None => TerrainConfig::default(),
    };
    let seed = parse_arg::<u32>(&args, "--seed").unwrap_or(12345);
    let frames = parse_arg::<usize>(&args, "--frames").unwrap_or(2000);
    let hover = parse_arg::<f32>(&args, "--height").unwrap_or(40.0);

    let generator: Arc<dyn HeightGenerator> = Arc::new(NoiseHeightGenerator::new(
        NoiseParams { seed, ..Default::default() },
        &config,
    ));
    let source = GeneratedSource::new(generator, config.page_size, config.scale());
    let mut world = TerrainWorld::new(config, Box::new(source), SceneGraph::new())?;

    // West edge to east edge along z = 0
    let extent = world.config().page_extent();
    let half_width = (world.config().world_width / 2) as f32 * extent.x;
    let start = -half_width + 1.0;
    let end = start + world.config().world_width as f32 * extent.x - 2.0;
    let speed = (end - start) / frames.max(1) as f32;

    let started = Instant::now();
    let mut camera = Camera::default();
    for frame in 0..frames {
        let x = start + speed * frame as f32;
        let ground = world.height_at(Vec3::new(x, 0.0, 0.0));
        camera.position = Vec3::new(x, ground + hover, 0.0);
        camera.set_rotation_euler(-std::f32::consts::FRAC_PI_2, -0.3);

        if let Some(LoadAction::Requeued(page)) = world.update(&camera)? {
            log::debug!("Frame {}: page {} requeued", frame, page);
        }

        if frame % 200 == 0 {
            let stats = world.stats();
            let pool = &world.context().pool;
            log::info!(
                "Frame {:>5} x={:>8.1}: {} visible, pool {}/{} free, {} loading, pages +{} -{} (preloaded {}, released {})",
                frame,
                x,
                world.visible_renderables().count(),
                pool.free_count(),
                pool.renderables_count(),
                pool.loading_count(),
                stats.loaded,
                stats.unloaded,
                stats.preloaded,
                stats.post_unloaded
            );
        }
    }

    let stats = world.stats();
    let (hits, misses) = world.context().index_cache.stats();
    log::info!(
        "{} frames in {:.2?}: {} re-evaluations, {} stale queue entries, index cache {} hits / {} misses",
        frames,
        started.elapsed(),
        stats.reevaluations,
        stats.stale,
        hits,
        misses
    );

    world.shutdown();
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
