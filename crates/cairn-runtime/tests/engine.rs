use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cairn_blocks::{BlockId, BlockRegistry};
use cairn_geom::{BlockPos, ChunkId, Vec3};
use cairn_runtime::{Engine, EngineConfig, GeometryHandle, HeadlessBackend};
use cairn_store::{BlockStore, ChunkVersion, InProcessRemote, MemoryStore, PlayerState, RemoteSync};

fn small_config() -> EngineConfig {
    EngineConfig {
        render_radius: 1,
        batch_size: 4,
        load_workers: 2,
        load_deadline_ms: 5_000,
        seed: 3,
        ..EngineConfig::default()
    }
}

/// Runs frames until the chunk's geometry differs from `before`.
fn remeshed(
    engine: &Engine,
    gpu: &mut HeadlessBackend,
    id: ChunkId,
    before: GeometryHandle,
) -> bool {
    wait_for(|| {
        engine.frame(gpu);
        engine.meshes().geometry(id).is_some_and(|g| g.handle != before)
    })
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn frames_fill_the_neighborhood_with_terrain() {
    let reg = Arc::new(BlockRegistry::with_defaults());
    let engine = Engine::new(&small_config(), reg, Arc::new(MemoryStore::new()), None).unwrap();
    engine.set_viewer(Vec3::new(0.0, 40.0, 0.0), None);
    let mut gpu = HeadlessBackend::new();

    let first = engine.frame(&mut gpu);
    assert_eq!(first.forced, 9);
    assert_eq!(first.stats.cached_chunks, 9);
    assert!(first.stats.total_faces > 0);

    let second = engine.frame(&mut gpu);
    assert_eq!(second.forced, 0);
    assert_eq!(second.draws.len(), 9);
    engine.shutdown(&mut gpu).unwrap();
    assert_eq!(gpu.live(), 0);
}

#[test]
fn local_edit_is_pushed_and_acknowledged() {
    let reg = Arc::new(BlockRegistry::with_defaults());
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(InProcessRemote::new());
    let engine = Engine::new(
        &small_config(),
        Arc::clone(&reg),
        store.clone(),
        Some(remote.clone() as Arc<dyn RemoteSync>),
    )
    .unwrap();
    let mut gpu = HeadlessBackend::new();
    engine.frame(&mut gpu);

    let before = engine.meshes().geometry(ChunkId::new(0, 0)).unwrap().handle;
    let stone = reg.id_by_name("stone").unwrap();
    let pos = BlockPos::new(5, 100, 5);
    engine.edit_block(pos, stone).unwrap();
    assert_eq!(engine.world().block(pos), stone);
    assert!(remeshed(&engine, &mut gpu, ChunkId::new(0, 0), before));

    assert!(wait_for(|| engine.pending_pushes() == 0));
    assert!(!engine.world().is_pending(pos));
    assert_eq!(
        store.chunk_version(ChunkId::new(0, 0)).unwrap(),
        Some(ChunkVersion(1))
    );
    let delta = remote.fetch_chunk(ChunkId::new(0, 0), None).unwrap().unwrap();
    assert_eq!(delta.overrides, vec![(pos, "stone".to_string())]);
    engine.shutdown(&mut gpu).unwrap();
}

#[test]
fn failed_push_leaves_the_edit_local() {
    let reg = Arc::new(BlockRegistry::with_defaults());
    let remote = Arc::new(InProcessRemote::new());
    let engine = Engine::new(
        &small_config(),
        Arc::clone(&reg),
        Arc::new(MemoryStore::new()),
        Some(remote.clone() as Arc<dyn RemoteSync>),
    )
    .unwrap();
    let mut gpu = HeadlessBackend::new();
    engine.frame(&mut gpu);

    remote.fail_next(1);
    let pos = BlockPos::new(-3, 90, 7);
    engine.edit_block(pos, reg.id_by_name("dirt").unwrap()).unwrap();
    assert!(wait_for(|| engine.pending_pushes() == 0));
    assert!(!engine.world().is_pending(pos));
    assert_eq!(engine.world().block(pos), reg.id_by_name("dirt").unwrap());
    engine.shutdown(&mut gpu).unwrap();
}

#[test]
fn remote_update_changes_world_and_dirties_meshes() {
    let reg = Arc::new(BlockRegistry::with_defaults());
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(&small_config(), Arc::clone(&reg), store, None).unwrap();
    let mut gpu = HeadlessBackend::new();
    engine.frame(&mut gpu);

    let home = engine.meshes().geometry(ChunkId::new(0, 0)).unwrap().handle;
    let front = engine.meshes().geometry(ChunkId::new(0, 1)).unwrap().handle;
    let pos = BlockPos::new(0, 120, 31);
    engine.remote_block_updated(pos, "sand").unwrap();
    assert_eq!(engine.world().block(pos), reg.id_by_name("sand").unwrap());
    assert!(remeshed(&engine, &mut gpu, ChunkId::new(0, 0), home));
    assert!(remeshed(&engine, &mut gpu, ChunkId::new(0, 1), front));

    engine.remote_block_updated(pos, "no_such_block").unwrap();
    assert_eq!(engine.world().block(pos), BlockId::AIR);
    engine.shutdown(&mut gpu).unwrap();
}

#[test]
fn player_state_round_trips_through_the_store() {
    let store = Arc::new(MemoryStore::new());
    let reg = Arc::new(BlockRegistry::with_defaults());
    let engine = Engine::new(&small_config(), reg, store.clone(), None).unwrap();
    assert_eq!(engine.player_state().unwrap(), PlayerState::default());
    let state = PlayerState {
        x: 4.0,
        y: 30.5,
        z: -2.0,
        rx: 0.3,
        ry: 1.2,
    };
    engine.save_player_state(&state).unwrap();
    let mut gpu = HeadlessBackend::new();
    engine.shutdown(&mut gpu).unwrap();
    assert_eq!(store.player_state().unwrap(), state);
}
