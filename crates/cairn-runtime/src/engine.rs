use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;

use cairn_blocks::{BlockId, BlockRegistry};
use cairn_geom::{BlockPos, Vec3};
use cairn_store::{BlockStore, PlayerState, RemoteSync, StoreError};
use cairn_world::{Terrain, WorldCache, WorldError};
use glam::Mat4;

use crate::config::EngineConfig;
use crate::gpu::GpuBackend;
use crate::mesh_cache::{DrawItem, MeshCache, MeshStats};
use crate::scheduler::MeshScheduler;
use crate::sync::PushQueue;

#[derive(Debug)]
pub enum RuntimeError {
    World(WorldError),
    Store(StoreError),
    Spawn(io::Error),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::World(e) => write!(f, "{e}"),
            RuntimeError::Store(e) => write!(f, "{e}"),
            RuntimeError::Spawn(e) => write!(f, "failed to start engine thread: {e}"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::World(e) => Some(e),
            RuntimeError::Store(e) => Some(e),
            RuntimeError::Spawn(e) => Some(e),
        }
    }
}

impl From<WorldError> for RuntimeError {
    fn from(e: WorldError) -> Self {
        RuntimeError::World(e)
    }
}

impl From<StoreError> for RuntimeError {
    fn from(e: StoreError) -> Self {
        RuntimeError::Store(e)
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Spawn(e)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    pub forced: usize,
    pub uploaded: usize,
    pub draws: Vec<DrawItem>,
    pub stats: MeshStats,
}

/// Owns the world cache, the mesh cache and their background threads.
pub struct Engine {
    registry: Arc<BlockRegistry>,
    world: Arc<WorldCache>,
    meshes: Arc<MeshCache>,
    scheduler: MeshScheduler,
    pushes: Option<PushQueue>,
}

impl Engine {
    pub fn new(
        cfg: &EngineConfig,
        registry: Arc<BlockRegistry>,
        store: Arc<dyn BlockStore>,
        remote: Option<Arc<dyn RemoteSync>>,
    ) -> Result<Self, RuntimeError> {
        let terrain = Terrain::new(cfg.seed, cfg.worldgen.clone(), &registry);
        let world = Arc::new(WorldCache::new(
            Arc::clone(&registry),
            terrain,
            store,
            remote.clone(),
            cfg.world_cache(),
        )?);
        let meshes = Arc::new(MeshCache::new(
            Arc::clone(&world),
            cfg.render_radius,
            cfg.batch_size,
        ));
        let scheduler = MeshScheduler::spawn(Arc::clone(&meshes))?;
        let pushes = match remote {
            Some(r) => Some(PushQueue::spawn(Arc::clone(&world), r)?),
            None => None,
        };
        log::info!(
            target: "mesh",
            "engine up: radius {}, batch {}, seed {}",
            meshes.radius(),
            cfg.batch_size,
            cfg.seed
        );
        Ok(Self {
            registry,
            world,
            meshes,
            scheduler,
            pushes,
        })
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn world(&self) -> &Arc<WorldCache> {
        &self.world
    }

    pub fn meshes(&self) -> &Arc<MeshCache> {
        &self.meshes
    }

    pub fn scheduler(&self) -> &MeshScheduler {
        &self.scheduler
    }

    pub fn set_viewer(&self, position: Vec3, view_proj: Option<Mat4>) {
        self.meshes.set_viewer(position, view_proj);
    }

    /// Main-thread frame step: forced neighborhood, cycle request, GPU pump,
    /// draw list.
    pub fn frame(&self, gpu: &mut dyn GpuBackend) -> FrameReport {
        let forced = self.meshes.force_neighborhood(gpu);
        self.scheduler.check();
        let uploaded = self.meshes.pump(gpu);
        let draws = self.meshes.visible_meshes();
        FrameReport {
            forced,
            uploaded,
            draws,
            stats: self.meshes.stats(),
        }
    }

    /// Local edit: persist, forward to the remote, rebuild affected meshes.
    pub fn edit_block(&self, pos: BlockPos, block: BlockId) -> Result<(), RuntimeError> {
        self.world.update_block(pos, block)?;
        if let Some(q) = &self.pushes {
            q.enqueue(pos, self.registry.name(block));
        }
        self.meshes.mark_block_dirty(pos);
        self.scheduler.check();
        Ok(())
    }

    /// Edit announced by the remote. Unknown names become air.
    pub fn remote_block_updated(&self, pos: BlockPos, block: &str) -> Result<(), RuntimeError> {
        let id = self.registry.lookup(block).id;
        self.world.apply_remote_update(pos, id)?;
        self.meshes.mark_block_dirty(pos);
        self.scheduler.check();
        Ok(())
    }

    pub fn pending_pushes(&self) -> usize {
        self.pushes.as_ref().map_or(0, PushQueue::pending)
    }

    pub fn player_state(&self) -> Result<PlayerState, RuntimeError> {
        Ok(self.world.store().player_state()?)
    }

    pub fn save_player_state(&self, state: &PlayerState) -> Result<(), RuntimeError> {
        Ok(self.world.store().put_player_state(state)?)
    }

    /// Joins background threads, releases all geometry and flushes the store.
    pub fn shutdown(mut self, gpu: &mut dyn GpuBackend) -> Result<(), RuntimeError> {
        self.scheduler.shutdown();
        if let Some(mut q) = self.pushes.take() {
            q.shutdown();
        }
        self.meshes.release_all(gpu);
        self.world.store().flush()?;
        log::info!(
            target: "mesh",
            "engine down after {} mesh cycles",
            self.scheduler.cycles()
        );
        Ok(())
    }
}
