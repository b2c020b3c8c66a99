use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use cairn_chunk::Chunk;
use cairn_geom::{BlockPos, ChunkId, Frustum, Vec3, chunk_of, to_block_pos};
use cairn_mesh_cpu::{ChunkMeshCPU, build_chunk_mesh};
use cairn_world::{WorldCache, affected_chunks};
use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::Mat4;
use hashbrown::{HashMap, HashSet};

use crate::gpu::{GeometryHandle, GpuBackend};

/// Work handed from background builds to the main thread.
pub enum GpuCommand {
    Upload {
        id: ChunkId,
        rev: u64,
        mesh: ChunkMeshCPU,
    },
    Release {
        handle: GeometryHandle,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub handle: GeometryHandle,
    pub faces: u32,
}

/// One chunk's render state.
///
/// `geometry` is what is drawn; `queued_rev` is the newest build handed out and
/// `applied_rev` the newest one uploaded. An entry with no geometry that is not
/// dirty has a build in flight.
struct MeshEntry {
    geometry: Option<Geometry>,
    dirty: AtomicBool,
    queued_rev: u64,
    applied_rev: u64,
}

impl MeshEntry {
    fn new() -> Self {
        Self {
            geometry: None,
            dirty: AtomicBool::new(false),
            queued_rev: 0,
            applied_rev: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub built: usize,
    pub evicted: usize,
    pub deferred: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub visible_chunks: usize,
    pub cached_chunks: usize,
    pub total_faces: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawItem {
    pub id: ChunkId,
    pub handle: GeometryHandle,
    pub faces: u32,
}

#[derive(Clone, Copy, Debug)]
struct Viewer {
    position: Vec3,
    frustum: Option<Frustum>,
}

impl Viewer {
    fn chunk(&self) -> ChunkId {
        chunk_of(to_block_pos(self.position))
    }

    fn sees(&self, id: ChunkId) -> bool {
        self.frustum.is_none_or(|f| f.contains_chunk(id))
    }
}

/// Ids within `radius` chunks of `center`, culled to a disc.
pub fn needed_set(center: ChunkId, radius: i32) -> HashSet<ChunkId> {
    let r = radius.max(0);
    let mut out = HashSet::new();
    for dx in -r..=r {
        for dz in -r..=r {
            if dx * dx + dz * dz <= r * r {
                out.insert(center.offset(dx, dz));
            }
        }
    }
    out
}

/// The forced 3×3 around the viewer's chunk; kept even outside a small disc.
fn in_neighborhood(center: ChunkId, id: ChunkId) -> bool {
    (id.x - center.x).abs() <= 1 && (id.z - center.z).abs() <= 1
}

/// Render-mesh lifecycle for chunks around the viewer.
///
/// Builds run on the scheduler thread (`run_cycle`) or synchronously for the
/// viewer's 3×3 neighborhood (`force_neighborhood`); only `pump` and
/// `force_neighborhood` touch the GPU and both belong to the main thread.
pub struct MeshCache {
    world: Arc<WorldCache>,
    radius: i32,
    batch_size: usize,
    entries: RwLock<HashMap<ChunkId, MeshEntry>>,
    viewer: RwLock<Viewer>,
    rev: AtomicU64,
    gpu_tx: Sender<GpuCommand>,
    gpu_rx: Receiver<GpuCommand>,
}

impl MeshCache {
    pub fn new(world: Arc<WorldCache>, radius: i32, batch_size: usize) -> Self {
        let (gpu_tx, gpu_rx) = unbounded();
        Self {
            world,
            radius: radius.max(1),
            batch_size: batch_size.max(1),
            entries: RwLock::new(HashMap::new()),
            viewer: RwLock::new(Viewer {
                position: Vec3::ZERO,
                frustum: None,
            }),
            rev: AtomicU64::new(0),
            gpu_tx,
            gpu_rx,
        }
    }

    pub fn world(&self) -> &Arc<WorldCache> {
        &self.world
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Without a view-projection every chunk counts as visible.
    pub fn set_viewer(&self, position: Vec3, view_proj: Option<Mat4>) {
        if let Ok(mut v) = self.viewer.write() {
            v.position = position;
            v.frustum = view_proj.map(Frustum::from_view_proj);
        }
    }

    fn viewer(&self) -> Viewer {
        self.viewer.read().map(|v| *v).unwrap_or(Viewer {
            position: Vec3::ZERO,
            frustum: None,
        })
    }

    /// Clean → dirty. No-op for chunks without an entry.
    pub fn mark_dirty(&self, id: ChunkId) {
        if let Ok(entries) = self.entries.read() {
            if let Some(e) = entries.get(&id) {
                e.dirty.store(true, Ordering::Release);
            }
        }
    }

    /// Dirties the chunk owning `pos` and every X/Z neighbor chunk it borders.
    pub fn mark_block_dirty(&self, pos: BlockPos) {
        for id in affected_chunks(pos) {
            self.mark_dirty(id);
        }
    }

    pub fn is_dirty(&self, id: ChunkId) -> bool {
        self.entries
            .read()
            .ok()
            .and_then(|m| m.get(&id).map(|e| e.dirty.load(Ordering::Acquire)))
            .unwrap_or(false)
    }

    pub fn contains(&self, id: ChunkId) -> bool {
        self.entries
            .read()
            .map(|m| m.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn geometry(&self, id: ChunkId) -> Option<Geometry> {
        self.entries.read().ok()?.get(&id)?.geometry
    }

    /// Ids with an entry in any state.
    pub fn entry_ids(&self) -> Vec<ChunkId> {
        self.entries
            .read()
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    fn next_rev(&self) -> u64 {
        self.rev.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Creates missing entries, clears dirty flags and stamps a new revision.
    /// Clearing before the build means a mark landing mid-build queues another.
    fn claim(&self, ids: &[ChunkId]) -> HashMap<ChunkId, u64> {
        let mut revs = HashMap::with_capacity(ids.len());
        if let Ok(mut entries) = self.entries.write() {
            for &id in ids {
                let e = entries.entry(id).or_insert_with(MeshEntry::new);
                e.dirty.store(false, Ordering::Release);
                let rev = self.next_rev();
                e.queued_rev = rev;
                revs.insert(id, rev);
            }
        }
        revs
    }

    /// Loads `ids` and meshes what arrived; ids that did not load are re-dirtied.
    fn build(
        &self,
        ids: &[ChunkId],
        revs: &HashMap<ChunkId, u64>,
    ) -> (Vec<(u64, ChunkMeshCPU)>, usize) {
        let chunks = self.world.chunks_batch(ids);
        let reg = self.world.registry();
        let mut built = Vec::with_capacity(chunks.len());
        let mut arrived: HashSet<ChunkId> = HashSet::with_capacity(chunks.len());
        for chunk in chunks {
            let id = chunk.id();
            if !arrived.insert(id) {
                continue;
            }
            let Some(&rev) = revs.get(&id) else { continue };
            built.push((rev, self.mesh(&chunk, reg)));
        }
        let mut failed = 0;
        for id in ids {
            if !arrived.contains(id) {
                self.mark_dirty(*id);
                failed += 1;
            }
        }
        (built, failed)
    }

    fn mesh(&self, chunk: &Chunk, reg: &cairn_blocks::BlockRegistry) -> ChunkMeshCPU {
        build_chunk_mesh(chunk, reg, |p| self.world.block_if_loaded(p))
    }

    /// One scheduler pass: evict, pick up to `batch_size` builds, queue uploads.
    pub fn run_cycle(&self) -> CycleReport {
        let t0 = Instant::now();
        let mut report = CycleReport::default();

        // The viewer is read under the entries lock: `set_viewer` precedes
        // `force_neighborhood`, so a claimed neighborhood is never evicted
        // against an older position.
        let Ok(mut entries) = self.entries.write() else {
            return report;
        };
        let viewer = self.viewer();
        let center = viewer.chunk();
        let needed = needed_set(center, self.radius);
        let gone: Vec<ChunkId> = entries
            .keys()
            .filter(|id| !needed.contains(*id) && !in_neighborhood(center, **id))
            .copied()
            .collect();
        let released: Vec<Option<Geometry>> = gone
            .iter()
            .filter_map(|id| entries.remove(id))
            .map(|e| e.geometry)
            .collect();
        drop(entries);
        report.evicted = released.len();
        for g in released.into_iter().flatten() {
            let _ = self.gpu_tx.send(GpuCommand::Release { handle: g.handle });
        }

        let mut candidates: Vec<ChunkId> = match self.entries.read() {
            Ok(entries) => needed
                .iter()
                .filter(|id| {
                    entries
                        .get(*id)
                        .is_none_or(|e| e.dirty.load(Ordering::Acquire))
                })
                .copied()
                .collect(),
            Err(_) => Vec::new(),
        };
        candidates.sort_by_key(|id| (!viewer.sees(*id), id.distance_sq(center), id.x, id.z));
        report.deferred = candidates.len().saturating_sub(self.batch_size);
        candidates.truncate(self.batch_size);

        if !candidates.is_empty() {
            let revs = self.claim(&candidates);
            let (built, failed) = self.build(&candidates, &revs);
            report.failed = failed;
            report.built = built.len();
            for (rev, mesh) in built {
                let _ = self.gpu_tx.send(GpuCommand::Upload {
                    id: mesh.id,
                    rev,
                    mesh,
                });
            }
        }
        if report.built > 0 || report.evicted > 0 {
            log::debug!(
                target: "mesh",
                "cycle at {center}: built {} evicted {} deferred {} failed {} in {:?}",
                report.built,
                report.evicted,
                report.deferred,
                report.failed,
                t0.elapsed()
            );
        }
        report
    }

    /// Synchronously rebuilds the viewer's chunk and its 8 neighbors when
    /// absent or dirty. Main thread only.
    pub fn force_neighborhood(&self, gpu: &mut dyn GpuBackend) -> usize {
        let center = self.viewer().chunk();
        let targets: Vec<ChunkId> = match self.entries.read() {
            Ok(entries) => {
                let mut v = Vec::with_capacity(9);
                for dx in -1..=1 {
                    for dz in -1..=1 {
                        let id = center.offset(dx, dz);
                        let stale = entries
                            .get(&id)
                            .is_none_or(|e| e.dirty.load(Ordering::Acquire));
                        if stale {
                            v.push(id);
                        }
                    }
                }
                v
            }
            Err(_) => return 0,
        };
        if targets.is_empty() {
            return 0;
        }
        let revs = self.claim(&targets);
        let (built, _) = self.build(&targets, &revs);
        let n = built.len();
        for (rev, mesh) in built {
            self.install(gpu, mesh.id, rev, &mesh);
        }
        log::trace!(target: "mesh", "forced {n} meshes around {center}");
        n
    }

    /// Uploads `mesh` if it is newer than what the entry shows.
    fn install(
        &self,
        gpu: &mut dyn GpuBackend,
        id: ChunkId,
        rev: u64,
        mesh: &ChunkMeshCPU,
    ) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        let Some(e) = entries.get_mut(&id) else {
            return false;
        };
        if rev <= e.applied_rev {
            return false;
        }
        let handle = gpu.create_geometry(mesh);
        let old = e.geometry.replace(Geometry {
            handle,
            faces: mesh.face_count() as u32,
        });
        e.applied_rev = rev;
        if let Some(old) = old {
            gpu.destroy_geometry(old.handle);
        }
        true
    }

    /// Applies queued uploads and releases. Main thread only.
    pub fn pump(&self, gpu: &mut dyn GpuBackend) -> usize {
        let mut applied = 0;
        for cmd in self.gpu_rx.try_iter() {
            match cmd {
                GpuCommand::Upload { id, rev, mesh } => {
                    if self.install(gpu, id, rev, &mesh) {
                        applied += 1;
                    }
                }
                GpuCommand::Release { handle } => gpu.destroy_geometry(handle),
            }
        }
        applied
    }

    /// Cached meshes inside the viewer's frustum.
    pub fn visible_meshes(&self) -> Vec<DrawItem> {
        self.draw_list().0
    }

    /// Draw list plus the number of entries holding geometry.
    fn draw_list(&self) -> (Vec<DrawItem>, usize) {
        let viewer = self.viewer();
        let mut out = Vec::new();
        let mut cached = 0;
        if let Ok(entries) = self.entries.read() {
            for (id, e) in entries.iter() {
                let Some(g) = e.geometry else { continue };
                cached += 1;
                if viewer.sees(*id) {
                    out.push(DrawItem {
                        id: *id,
                        handle: g.handle,
                        faces: g.faces,
                    });
                }
            }
        }
        (out, cached)
    }

    /// Computed from the current entries and viewer on every call.
    pub fn stats(&self) -> MeshStats {
        let (draws, cached) = self.draw_list();
        MeshStats {
            visible_chunks: draws.len(),
            cached_chunks: cached,
            total_faces: draws.iter().map(|d| d.faces as usize).sum(),
        }
    }

    /// Destroys every geometry and drops all entries. Main thread only.
    pub fn release_all(&self, gpu: &mut dyn GpuBackend) {
        self.pump(gpu);
        let drained: Vec<MeshEntry> = match self.entries.write() {
            Ok(mut entries) => entries.drain().map(|(_, e)| e).collect(),
            Err(_) => Vec::new(),
        };
        for e in drained {
            if let Some(g) = e.geometry {
                gpu.destroy_geometry(g.handle);
            }
        }
    }
}
