//! World cache: chunk construction, LRU residency, block queries and edits.
#![forbid(unsafe_code)]

mod cache;
pub mod generation;
mod physics;
pub mod worldgen;

pub use cache::{WorldCache, WorldCacheConfig, WorldCacheStats};
pub use generation::{Column, Surface, Terrain};
pub use physics::{COLLIDE_PADDING, Collision, HIT_MAX_DISTANCE, HIT_STEP, RayHit};
pub use worldgen::WorldGenConfig;

use std::error::Error;
use std::fmt;

use cairn_chunk::ChunkError;
use cairn_geom::{BlockPos, ChunkId, chunk_of};
use cairn_store::StoreError;

#[derive(Debug)]
pub enum WorldError {
    Store(StoreError),
    Chunk(ChunkError),
    Pool(String),
    Poisoned,
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::Store(e) => write!(f, "{e}"),
            WorldError::Chunk(e) => write!(f, "{e}"),
            WorldError::Pool(msg) => write!(f, "chunk load pool: {msg}"),
            WorldError::Poisoned => write!(f, "world cache lock poisoned"),
        }
    }
}

impl Error for WorldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldError::Store(e) => Some(e),
            WorldError::Chunk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for WorldError {
    fn from(e: StoreError) -> Self {
        WorldError::Store(e)
    }
}

impl From<ChunkError> for WorldError {
    fn from(e: ChunkError) -> Self {
        WorldError::Chunk(e)
    }
}

/// Chunks whose geometry depends on the block at `pos`: its own chunk plus any
/// X/Z neighbor chunk the block touches across a border.
pub fn affected_chunks(pos: BlockPos) -> Vec<ChunkId> {
    let home = chunk_of(pos);
    let mut out = vec![home];
    for n in [pos.left(), pos.right(), pos.back(), pos.front()] {
        let id = chunk_of(n);
        if id != home && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
