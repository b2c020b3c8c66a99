use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cairn_blocks::{BlockDef, BlockRegistry};
use cairn_geom::{BlockPos, CHUNK_WIDTH, ChunkId, Vec3};
use cairn_runtime::{GpuBackend, HeadlessBackend, MeshCache, MeshScheduler, needed_set};
use cairn_store::MemoryStore;
use cairn_world::{Terrain, WorldCache, WorldCacheConfig, WorldGenConfig};

/// Registry without worldgen names: chunks generate empty and mesh instantly.
fn bare_world() -> Arc<WorldCache> {
    let mut reg = BlockRegistry::new();
    reg.register(BlockDef::solid("stone")).unwrap();
    let reg = Arc::new(reg);
    let terrain = Terrain::new(1, WorldGenConfig::default(), &reg);
    let cfg = WorldCacheConfig {
        capacity: 256,
        load_workers: 2,
        load_deadline: Duration::from_secs(5),
    };
    Arc::new(WorldCache::new(reg, terrain, Arc::new(MemoryStore::new()), None, cfg).unwrap())
}

fn cache(radius: i32, batch: usize) -> MeshCache {
    MeshCache::new(bare_world(), radius, batch)
}

fn drain(cache: &MeshCache, gpu: &mut dyn GpuBackend) {
    for _ in 0..64 {
        let r = cache.run_cycle();
        cache.pump(gpu);
        if r.built == 0 && r.deferred == 0 {
            break;
        }
    }
}

#[test]
fn needed_set_is_a_symmetric_disc() {
    let set = needed_set(ChunkId::new(0, 0), 3);
    assert_eq!(set.len(), 29);
    assert!(set.contains(&ChunkId::new(3, 0)));
    assert!(set.contains(&ChunkId::new(-3, 0)));
    assert!(set.contains(&ChunkId::new(2, -2)));
    assert!(!set.contains(&ChunkId::new(3, 1)));
    assert_eq!(needed_set(ChunkId::new(5, 5), 0).len(), 1);
}

#[test]
fn cycle_builds_at_most_batch_size_nearest_first() {
    let c = cache(3, 4);
    let r = c.run_cycle();
    assert_eq!(r.built, 4);
    assert_eq!(r.deferred, 25);
    assert_eq!(r.evicted, 0);
    let mut ids = c.entry_ids();
    ids.sort();
    let mut expect = vec![
        ChunkId::new(0, 0),
        ChunkId::new(-1, 0),
        ChunkId::new(0, -1),
        ChunkId::new(0, 1),
    ];
    expect.sort();
    assert_eq!(ids, expect);

    let r = c.run_cycle();
    assert_eq!(r.built, 4);
    assert_eq!(r.deferred, 21);
}

#[test]
fn only_needed_chunks_get_entries() {
    let c = cache(2, 8);
    c.set_viewer(Vec3::new(100.0, 10.0, -20.0), None);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);
    let needed = needed_set(ChunkId::new(3, -1), 2);
    let ids = c.entry_ids();
    assert_eq!(ids.len(), needed.len());
    assert!(ids.iter().all(|id| needed.contains(id)));
    assert_eq!(gpu.live(), needed.len());
}

#[test]
fn in_flight_builds_are_not_requeued() {
    let c = cache(1, 8);
    let first = c.run_cycle();
    assert_eq!(first.built, 5);
    // Uploads not pumped yet: entries exist without geometry.
    let second = c.run_cycle();
    assert_eq!(second.built, 0);
    assert_eq!(second.deferred, 0);
}

#[test]
fn leaving_chunks_are_evicted_and_released() {
    let c = cache(1, 8);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);
    assert_eq!(gpu.live(), 5);

    c.set_viewer(Vec3::new((CHUNK_WIDTH * 10) as f32, 10.0, 0.0), None);
    let r = c.run_cycle();
    assert_eq!(r.evicted, 5);
    c.pump(&mut gpu);
    assert_eq!(gpu.destroyed, 5);
    assert!(!c.contains(ChunkId::new(0, 0)));
    assert!(c.geometry(ChunkId::new(10, 0)).is_some());
}

#[test]
fn border_edit_dirties_the_neighbor_chunk() {
    let c = cache(2, 16);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);

    c.mark_block_dirty(BlockPos::new(31, 5, 10));
    assert!(c.is_dirty(ChunkId::new(0, 0)));
    assert!(c.is_dirty(ChunkId::new(1, 0)));
    assert!(!c.is_dirty(ChunkId::new(-1, 0)));
    assert!(!c.is_dirty(ChunkId::new(0, -1)));

    let old = c.geometry(ChunkId::new(1, 0)).unwrap();
    let r = c.run_cycle();
    assert_eq!(r.built, 2);
    // Old geometry stays until the replacement lands.
    assert_eq!(c.geometry(ChunkId::new(1, 0)), Some(old));
    c.pump(&mut gpu);
    let new = c.geometry(ChunkId::new(1, 0)).unwrap();
    assert_ne!(new.handle, old.handle);
    assert!(!gpu.is_live(old.handle));
}

#[test]
fn mark_dirty_on_absent_chunk_is_a_noop() {
    let c = cache(1, 4);
    c.mark_dirty(ChunkId::new(40, 40));
    assert!(!c.contains(ChunkId::new(40, 40)));
    assert!(!c.is_dirty(ChunkId::new(40, 40)));
}

#[test]
fn forced_neighborhood_builds_synchronously() {
    let c = cache(2, 1);
    let mut gpu = HeadlessBackend::new();
    assert_eq!(c.force_neighborhood(&mut gpu), 9);
    for dx in -1..=1 {
        for dz in -1..=1 {
            assert!(c.geometry(ChunkId::new(dx, dz)).is_some());
        }
    }
    assert_eq!(c.force_neighborhood(&mut gpu), 0);
    // Neighborhood corners survive a radius-1 cycle.
    let small = cache(1, 1);
    small.force_neighborhood(&mut gpu);
    assert_eq!(small.run_cycle().evicted, 0);
}

#[test]
fn stale_upload_is_dropped() {
    let c = cache(2, 5);
    let mut gpu = HeadlessBackend::new();
    // Queues uploads for the center and its 4 edge neighbors.
    c.run_cycle();
    c.mark_dirty(ChunkId::new(0, 0));
    // Builds a newer (0,0) directly, plus the 4 unbuilt corners.
    assert_eq!(c.force_neighborhood(&mut gpu), 5);
    let forced = c.geometry(ChunkId::new(0, 0)).unwrap();

    let applied = c.pump(&mut gpu);
    assert_eq!(applied, 4);
    assert_eq!(c.geometry(ChunkId::new(0, 0)), Some(forced));
}

/// Looking down +X with a narrow cone from inside chunk (0, 0).
fn narrow_view_along_x() -> glam::Mat4 {
    let eye = glam::Vec3::new(16.0, 20.0, 16.0);
    let proj = glam::Mat4::perspective_rh_gl(30f32.to_radians(), 1.0, 0.1, 500.0);
    proj * glam::Mat4::look_at_rh(eye, eye + glam::Vec3::X, glam::Vec3::Y)
}

#[test]
fn visible_chunks_are_built_before_nearer_hidden_ones() {
    let c = cache(3, 4);
    c.set_viewer(Vec3::new(16.0, 20.0, 16.0), Some(narrow_view_along_x()));
    let r = c.run_cycle();
    assert_eq!(r.built, 4);
    let mut ids = c.entry_ids();
    ids.sort();
    let mut expect = vec![
        ChunkId::new(0, 0),
        ChunkId::new(1, 0),
        ChunkId::new(2, -1),
        ChunkId::new(2, 0),
    ];
    expect.sort();
    assert_eq!(ids, expect);
    assert!(!c.contains(ChunkId::new(-1, 0)));
    assert!(!c.contains(ChunkId::new(0, 1)));
}

#[test]
fn stats_do_not_depend_on_the_draw_list() {
    let c = cache(1, 8);
    assert_eq!(c.stats().cached_chunks, 0);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);
    let stats = c.stats();
    assert_eq!(stats.cached_chunks, 5);
    assert_eq!(stats.visible_chunks, 5);

    c.set_viewer(Vec3::new(16.0, 20.0, 16.0), Some(narrow_view_along_x()));
    let narrowed = c.stats();
    assert_eq!(narrowed.cached_chunks, 5);
    assert!(narrowed.visible_chunks < 5);
}

#[test]
fn background_cycles_never_evict_a_freshly_forced_neighborhood() {
    let c = Arc::new(cache(1, 4));
    let stop = Arc::new(AtomicBool::new(false));
    let worker = {
        let c = Arc::clone(&c);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                c.run_cycle();
            }
        })
    };
    let mut gpu = HeadlessBackend::new();
    for step in 0..30 {
        let x = step * 10;
        c.set_viewer(Vec3::new((x * CHUNK_WIDTH + 16) as f32, 20.0, 16.0), None);
        c.force_neighborhood(&mut gpu);
        for dx in -1..=1 {
            for dz in -1..=1 {
                assert!(c.contains(ChunkId::new(x + dx, dz)), "step {step}: ({dx}, {dz})");
            }
        }
        c.pump(&mut gpu);
    }
    stop.store(true, Ordering::Relaxed);
    worker.join().unwrap();
}

#[test]
fn frustum_filters_draws_and_stats() {
    let c = cache(2, 16);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);
    let all = c.visible_meshes();
    assert_eq!(all.len(), 13);
    assert_eq!(c.stats().visible_chunks, 13);
    assert_eq!(c.stats().cached_chunks, 13);

    let eye = glam::Vec3::new(16.0, 20.0, 16.0);
    let proj = glam::Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 500.0);
    let view = glam::Mat4::look_at_rh(eye, eye + glam::Vec3::X, glam::Vec3::Y);
    c.set_viewer(Vec3::new(16.0, 20.0, 16.0), Some(proj * view));
    let seen = c.visible_meshes();
    assert!(seen.len() < all.len());
    assert!(seen.iter().any(|d| d.id == ChunkId::new(2, 0)));
    assert!(!seen.iter().any(|d| d.id == ChunkId::new(-2, 0)));
    assert_eq!(c.stats().cached_chunks, 13);
}

#[test]
fn release_all_destroys_everything() {
    let c = cache(1, 8);
    let mut gpu = HeadlessBackend::new();
    drain(&c, &mut gpu);
    c.release_all(&mut gpu);
    assert_eq!(gpu.live(), 0);
    assert!(c.entry_ids().is_empty());
}

#[test]
fn scheduler_runs_one_cycle_per_accepted_signal() {
    let c = Arc::new(cache(1, 8));
    let mut sched = MeshScheduler::spawn(Arc::clone(&c)).unwrap();
    let accepted = (0..50).filter(|_| sched.check()).count();
    assert!(accepted >= 1);
    sched.shutdown();
    assert_eq!(sched.cycles(), accepted as u64);
    assert!(!sched.check());
    assert!(!c.entry_ids().is_empty());
}
