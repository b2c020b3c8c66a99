use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cairn_blocks::BlockRegistry;
use cairn_geom::{Vec3, to_block_pos};
use cairn_runtime::{Engine, EngineConfig, HeadlessBackend};
use cairn_store::{
    BlockStore, InProcessRemote, JournalStore, MemoryStore, PlayerState, RemoteSync, Retry,
};
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

#[derive(Parser, Debug)]
#[command(name = "cairn", about = "Headless voxel world host")]
struct Args {
    /// Engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Render radius in chunks
    #[arg(short = 'r', long)]
    radius: Option<i32>,
    /// Journal file for block edits and player state
    #[arg(long)]
    db: Option<PathBuf>,
    /// World seed
    #[arg(long)]
    seed: Option<i32>,
    /// Block definitions (TOML)
    #[arg(long)]
    blocks: Option<PathBuf>,
    /// Frames to run before exiting
    #[arg(long, default_value_t = 240)]
    frames: u32,
    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

const FRAME: Duration = Duration::from_millis(16);
const WALK_SPEED: f32 = 0.5;
const GRAVITY_STEP: f32 = 0.25;

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::new()
                .target(env_logger::Target::Stdout)
                .filter_level(LevelFilter::Info)
                .parse_env("RUST_LOG")
                .init();
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(r) = args.radius {
        cfg.render_radius = r;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(db) = &args.db {
        cfg.store_path = Some(db.clone());
    }
    if let Some(blocks) = &args.blocks {
        cfg.blocks_path = Some(blocks.clone());
    }
    Ok(cfg)
}

/// Camera matrix looking along the player's yaw/pitch.
fn view_proj(eye: Vec3, state: &PlayerState) -> glam::Mat4 {
    let eye: glam::Vec3 = eye.into();
    let dir = glam::Vec3::new(
        state.ry.cos() * state.rx.cos(),
        state.rx.sin(),
        state.ry.sin() * state.rx.cos(),
    );
    let proj = glam::Mat4::perspective_rh_gl(70f32.to_radians(), 16.0 / 9.0, 0.1, 512.0);
    proj * glam::Mat4::look_at_rh(eye, eye + dir, glam::Vec3::Y)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;
    let cfg = load_config(&args)?;

    let registry = Arc::new(match &cfg.blocks_path {
        Some(path) => BlockRegistry::load_from_path(path)?,
        None => BlockRegistry::with_defaults(),
    });
    log::info!("{} block types", registry.len());

    let store: Arc<dyn BlockStore> = match &cfg.store_path {
        Some(path) => Arc::new(JournalStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let remote: Option<Arc<dyn RemoteSync>> = if cfg.loopback_remote {
        Some(Arc::new(Retry::new(InProcessRemote::new(), cfg.retry.clone())))
    } else {
        None
    };

    let engine = Engine::new(&cfg, registry, store, remote)?;
    let mut player = engine.player_state()?;
    let mut gpu = HeadlessBackend::new();
    let started = Instant::now();
    let mut faces = 0;

    for frame in 0..args.frames {
        let here = to_block_pos(Vec3::new(player.x, player.y, player.z));
        // No gravity until the ground under the player is resident.
        let fall = if engine.world().is_resident(here.chunk()) {
            GRAVITY_STEP
        } else {
            0.0
        };
        let walked = Vec3::new(
            player.x + player.ry.cos() * WALK_SPEED,
            (player.y - fall).max(1.0),
            player.z + player.ry.sin() * WALK_SPEED,
        );
        let pose = engine.world().collide(walked);
        player.x = pose.position.x;
        player.y = pose.position.y;
        player.z = pose.position.z;

        let eye = pose.position;
        engine.set_viewer(eye, Some(view_proj(eye, &player)));
        let report = engine.frame(&mut gpu);
        faces = report.stats.total_faces;
        if frame % 60 == 0 {
            log::info!(
                "frame {frame}: at ({:.1}, {:.1}, {:.1}) visible {} cached {} faces {}",
                player.x,
                player.y,
                player.z,
                report.stats.visible_chunks,
                report.stats.cached_chunks,
                report.stats.total_faces
            );
        }
        thread::sleep(FRAME);
    }

    let down = Vec3::new(0.0, -1.0, 0.0);
    if let Some(hit) = engine.world().hit_test(Vec3::new(player.x, player.y, player.z), down) {
        let block = engine.registry().name(engine.world().block(hit.hit));
        log::info!("standing on {block} at {}", hit.hit);
    }

    let world = engine.world().stats();
    println!(
        "{} frames in {:.2?}: {} faces drawn, {} geometries created, {} chunk loads ({} hits)",
        args.frames,
        started.elapsed(),
        faces,
        gpu.created,
        world.misses,
        world.hits
    );

    engine.save_player_state(&player)?;
    engine.shutdown(&mut gpu)?;
    Ok(())
}
