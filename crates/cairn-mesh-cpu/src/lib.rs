//! CPU-side chunk meshing: visible cube faces and plant billboards.
#![forbid(unsafe_code)]

mod build;
mod chunk;
mod face;
mod mesh_build;

pub use build::{build_chunk_mesh, build_item_mesh};
pub use chunk::ChunkMeshCPU;
pub use face::Face;
pub use mesh_build::MeshBuild;
