use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cairn_blocks::{BlockId, BlockRegistry};
use cairn_chunk::{Chunk, ChunkError};
use cairn_geom::{BlockPos, ChunkId, chunk_of};
use cairn_store::{BlockStore, ChunkDelta, ChunkVersion, RemoteSync};
use crossbeam_channel::{RecvTimeoutError, unbounded};
use hashbrown::HashMap;
use lru::LruCache;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::WorldError;
use crate::generation::Terrain;

#[derive(Clone, Debug)]
pub struct WorldCacheConfig {
    pub capacity: usize,
    pub load_workers: usize,
    pub load_deadline: Duration,
}

impl WorldCacheConfig {
    /// Capacity of `radius² × 4` chunks, never below the 3×3 neighborhood.
    pub fn for_radius(radius: i32) -> Self {
        let r = radius.max(1) as usize;
        Self {
            capacity: (r * r * 4).max(9),
            load_workers: 4,
            load_deadline: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct WorldCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub pending_edits: usize,
}

/// Bounded LRU of resident chunks, shared behind `Arc`.
///
/// At most one construction per `ChunkId` is in flight: loads and edits of the
/// same id serialize on a per-id lock; different ids proceed in parallel.
pub struct WorldCache {
    registry: Arc<BlockRegistry>,
    terrain: Terrain,
    store: Arc<dyn BlockStore>,
    remote: Option<Arc<dyn RemoteSync>>,
    chunks: Mutex<LruCache<ChunkId, Arc<Chunk>>>,
    build_locks: Mutex<HashMap<ChunkId, Arc<Mutex<()>>>>,
    // Local edits not yet acknowledged by the remote, by position.
    pending: Mutex<HashMap<BlockPos, u32>>,
    pool: ThreadPool,
    load_deadline: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Positions handed to a chunk are routed by `chunk_of`, so a rejection here is a bug.
#[inline]
pub(crate) fn owned<T>(r: Result<T, ChunkError>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => panic!("chunk addressing invariant violated: {e}"),
    }
}

impl WorldCache {
    pub fn new(
        registry: Arc<BlockRegistry>,
        terrain: Terrain,
        store: Arc<dyn BlockStore>,
        remote: Option<Arc<dyn RemoteSync>>,
        cfg: WorldCacheConfig,
    ) -> Result<Self, WorldError> {
        let capacity = NonZeroUsize::new(cfg.capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        let pool = ThreadPoolBuilder::new()
            .num_threads(cfg.load_workers.max(1))
            .thread_name(|i| format!("cairn-load-{i}"))
            .build()
            .map_err(|e| WorldError::Pool(e.to_string()))?;
        log::info!(
            target: "world",
            "world cache: capacity {} chunks, {} load workers, remote {}",
            capacity,
            cfg.load_workers.max(1),
            if remote.is_some() { "attached" } else { "offline" }
        );
        Ok(Self {
            registry,
            terrain,
            store,
            remote,
            chunks: Mutex::new(LruCache::new(capacity)),
            build_locks: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            pool,
            load_deadline: cfg.load_deadline,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn capacity(&self) -> usize {
        self.chunks.lock().map(|c| c.cap().get()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.chunks.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_resident(&self, id: ChunkId) -> bool {
        self.chunks.lock().map(|c| c.contains(&id)).unwrap_or(false)
    }

    /// Resident ids, most recently used first.
    pub fn resident_ids(&self) -> Vec<ChunkId> {
        self.chunks
            .lock()
            .map(|c| c.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> WorldCacheStats {
        WorldCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            pending_edits: self.pending.lock().map(|p| p.len()).unwrap_or(0),
        }
    }

    /// Drops a resident chunk. Nothing to flush: every write is already persisted.
    pub fn evict(&self, id: ChunkId) -> bool {
        let removed = self
            .chunks
            .lock()
            .map(|mut c| c.pop(&id).is_some())
            .unwrap_or(false);
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!(target: "world", "evicted chunk {id}");
        }
        removed
    }

    /// Resident chunk, touching its LRU position.
    fn cached(&self, id: ChunkId) -> Option<Arc<Chunk>> {
        self.chunks.lock().ok()?.get(&id).cloned()
    }

    /// Resident chunk without touching its LRU position.
    pub fn peek(&self, id: ChunkId) -> Option<Arc<Chunk>> {
        self.chunks.lock().ok()?.peek(&id).cloned()
    }

    fn build_lock(&self, id: ChunkId) -> Result<Arc<Mutex<()>>, WorldError> {
        let mut locks = self.build_locks.lock().map_err(|_| WorldError::Poisoned)?;
        Ok(locks.entry(id).or_default().clone())
    }

    // An entry nobody else holds can go; acquiring requires this same table lock.
    fn release_build_lock(&self, id: ChunkId, lock: Arc<Mutex<()>>) {
        drop(lock);
        if let Ok(mut locks) = self.build_locks.lock() {
            if locks.get(&id).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(&id);
            }
        }
    }

    fn with_build_lock<T>(
        &self,
        id: ChunkId,
        f: impl FnOnce() -> Result<T, WorldError>,
    ) -> Result<T, WorldError> {
        let lock = self.build_lock(id)?;
        let out = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(WorldError::Poisoned),
        };
        self.release_build_lock(id, lock);
        out
    }

    /// Resident chunk for `id`, constructing and inserting it on a miss.
    pub fn chunk(&self, id: ChunkId) -> Result<Arc<Chunk>, WorldError> {
        if let Some(c) = self.cached(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(c);
        }
        self.with_build_lock(id, || {
            if let Some(c) = self.cached(id) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(c);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            let t0 = Instant::now();
            let chunk = Arc::new(self.construct(id)?);
            log::debug!(
                target: "world",
                "built chunk {id}: {} blocks in {:?}",
                chunk.len(),
                t0.elapsed()
            );
            self.insert(id, chunk.clone())?;
            Ok(chunk)
        })
    }

    fn insert(&self, id: ChunkId, chunk: Arc<Chunk>) -> Result<(), WorldError> {
        let evicted = {
            let mut chunks = self.chunks.lock().map_err(|_| WorldError::Poisoned)?;
            chunks.push(id, chunk)
        };
        if let Some((old, _)) = evicted {
            if old != id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                log::debug!(target: "world", "evicted chunk {old} for {id}");
            }
        }
        Ok(())
    }

    /// Generator fill, then persisted overrides, then remote overrides.
    fn construct(&self, id: ChunkId) -> Result<Chunk, WorldError> {
        let chunk = Chunk::new(id);
        for (pos, block) in self.terrain.generate(id) {
            chunk.set(pos, block)?;
        }

        let mut persisted: Vec<(BlockPos, BlockId)> = Vec::new();
        self.store.range_blocks(id, &mut |pos, name| {
            persisted.push((pos, self.resolve(name)));
        })?;
        for (pos, block) in persisted {
            chunk.set(pos, block)?;
        }

        if let Some(remote) = self.remote.as_ref() {
            let known = self.store.chunk_version(id)?;
            match remote.fetch_chunk(id, known) {
                Ok(Some(delta)) => self.merge_remote(&chunk, known, delta)?,
                Ok(None) => {}
                Err(e) => {
                    log::warn!(target: "sync", "fetch {id} failed, using local data: {e}");
                }
            }
        }
        Ok(chunk)
    }

    fn merge_remote(
        &self,
        chunk: &Chunk,
        known: Option<ChunkVersion>,
        delta: ChunkDelta,
    ) -> Result<(), WorldError> {
        let id = chunk.id();
        if known.is_some_and(|k| delta.version <= k) {
            log::debug!(
                target: "sync",
                "ignoring stale snapshot {} for {id} (have {:?})",
                delta.version,
                known
            );
            return Ok(());
        }
        let pending = self.pending.lock().map_err(|_| WorldError::Poisoned)?;
        let mut applied = 0usize;
        for (pos, name) in &delta.overrides {
            if pending.contains_key(pos) {
                continue;
            }
            chunk.set(*pos, self.resolve(name))?;
            self.store.put_block(id, *pos, name)?;
            applied += 1;
        }
        drop(pending);
        self.store.put_chunk_version(id, delta.version)?;
        log::debug!(
            target: "sync",
            "merged {applied}/{} remote overrides into {id} at {}",
            delta.overrides.len(),
            delta.version
        );
        Ok(())
    }

    fn resolve(&self, name: &str) -> BlockId {
        match self.registry.id_by_name(name) {
            Some(b) => b,
            None => {
                log::debug!(target: "world", "unknown block '{name}' treated as air");
                BlockId::AIR
            }
        }
    }

    /// Block at `pos`, loading its chunk if needed; air when the load fails.
    pub fn block(&self, pos: BlockPos) -> BlockId {
        match self.chunk(chunk_of(pos)) {
            Ok(c) => owned(c.get(pos)),
            Err(e) => {
                log::debug!(target: "world", "block {pos}: chunk unavailable: {e}");
                BlockId::AIR
            }
        }
    }

    /// Block at `pos` if its chunk is resident; never loads.
    pub fn block_if_loaded(&self, pos: BlockPos) -> BlockId {
        match self.peek(chunk_of(pos)) {
            Some(c) => owned(c.get(pos)),
            None => BlockId::AIR,
        }
    }

    pub fn has_block(&self, pos: BlockPos) -> bool {
        !self.block_if_loaded(pos).is_air()
    }

    /// Local edit: persisted first, then applied to the resident chunk if any.
    /// With a remote attached the position stays pending until acknowledged.
    pub fn update_block(&self, pos: BlockPos, block: BlockId) -> Result<(), WorldError> {
        let id = chunk_of(pos);
        self.with_build_lock(id, || {
            self.store.put_block(id, pos, self.registry.name(block))?;
            if let Some(c) = self.peek(id) {
                owned(c.set(pos, block));
            }
            if self.remote.is_some() {
                let mut pending = self.pending.lock().map_err(|_| WorldError::Poisoned)?;
                *pending.entry(pos).or_insert(0) += 1;
            }
            Ok(())
        })
    }

    /// Edit pushed to us by the authoritative source.
    pub fn apply_remote_update(&self, pos: BlockPos, block: BlockId) -> Result<(), WorldError> {
        let id = chunk_of(pos);
        self.with_build_lock(id, || {
            self.store.put_block(id, pos, self.registry.name(block))?;
            if let Some(c) = self.peek(id) {
                owned(c.set(pos, block));
            }
            Ok(())
        })
    }

    /// The remote accepted our edit at `pos` as part of `version`.
    ///
    /// The stored version only advances when `version` directly follows it;
    /// a gap means other writers intervened and the next fetch must reconcile.
    pub fn ack_push(&self, pos: BlockPos, version: ChunkVersion) -> Result<(), WorldError> {
        {
            let mut pending = self.pending.lock().map_err(|_| WorldError::Poisoned)?;
            if let Some(n) = pending.get_mut(&pos) {
                *n -= 1;
                if *n == 0 {
                    pending.remove(&pos);
                }
            }
        }
        let id = chunk_of(pos);
        self.with_build_lock(id, || {
            let known = self.store.chunk_version(id)?.unwrap_or_default();
            if version.0 == known.0 + 1 {
                self.store.put_chunk_version(id, version)?;
            }
            Ok(())
        })
    }

    /// Push failed for good: the edit stays local only.
    pub fn abandon_push(&self, pos: BlockPos) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(n) = pending.get_mut(&pos) {
                *n -= 1;
                if *n == 0 {
                    pending.remove(&pos);
                }
            }
        }
    }

    pub fn is_pending(&self, pos: BlockPos) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(&pos))
            .unwrap_or(false)
    }

    /// Loads `ids` in parallel on the load pool.
    ///
    /// Returns the chunks that finished before the batch deadline, in no
    /// particular order. Failed loads are omitted; late loads still land in the
    /// cache when they complete.
    pub fn chunks_batch(self: &Arc<Self>, ids: &[ChunkId]) -> Vec<Arc<Chunk>> {
        let mut out = Vec::with_capacity(ids.len());
        let (tx, rx) = unbounded::<(ChunkId, Result<Arc<Chunk>, WorldError>)>();
        let mut spawned = 0usize;
        for &id in ids {
            if let Some(c) = self.cached(id) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                out.push(c);
                continue;
            }
            let world = Arc::clone(self);
            let tx = tx.clone();
            self.pool.spawn(move || {
                let r = world.chunk(id);
                let _ = tx.send((id, r));
            });
            spawned += 1;
        }
        drop(tx);

        let deadline = Instant::now() + self.load_deadline;
        let mut received = 0usize;
        while received < spawned {
            match rx.recv_deadline(deadline) {
                Ok((_, Ok(c))) => out.push(c),
                Ok((id, Err(e))) => {
                    log::warn!(target: "world", "load of chunk {id} failed: {e}");
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        target: "world",
                        "{} chunk loads missed the {:?} batch deadline",
                        spawned - received,
                        self.load_deadline
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
            received += 1;
        }
        out
    }
}
