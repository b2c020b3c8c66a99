use cairn_blocks::BlockId;
use cairn_geom::{Aabb, ChunkId};
use hashbrown::HashMap;

use crate::mesh_build::MeshBuild;

/// Geometry for one chunk, split per block type so each part binds one texture.
#[derive(Clone, Debug)]
pub struct ChunkMeshCPU {
    pub id: ChunkId,
    pub bbox: Aabb,
    pub parts: HashMap<BlockId, MeshBuild>,
}

impl ChunkMeshCPU {
    pub fn new(id: ChunkId) -> Self {
        Self {
            id,
            bbox: id.bounds(),
            parts: HashMap::new(),
        }
    }

    /// Quads across all parts.
    pub fn face_count(&self) -> usize {
        self.parts.values().map(MeshBuild::quad_count).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.values().map(MeshBuild::vertex_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.values().all(MeshBuild::is_empty)
    }
}
