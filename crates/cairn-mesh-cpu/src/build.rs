use cairn_blocks::{BlockId, BlockRegistry, BlockType};
use cairn_chunk::Chunk;
use cairn_geom::{BlockPos, Vec3, chunk_of};
use hashbrown::HashMap;

use crate::chunk::ChunkMeshCPU;
use crate::face::Face;
use crate::mesh_build::MeshBuild;

/// Meshes every stored block of `chunk`.
///
/// Blocks inside the chunk are read from a snapshot taken up front; positions
/// across the border go through `neighbor`, which should not load chunks.
/// A face is emitted when the adjacent block is transparent. Bottom faces at
/// y = 0 are never visible. Plants become two crossed double-sided quads.
pub fn build_chunk_mesh(
    chunk: &Chunk,
    reg: &BlockRegistry,
    neighbor: impl Fn(BlockPos) -> BlockId,
) -> ChunkMeshCPU {
    let id = chunk.id();
    let snapshot: HashMap<BlockPos, BlockId> = chunk.blocks().into_iter().collect();
    let lookup = |p: BlockPos| -> BlockId {
        if chunk_of(p) == id {
            snapshot.get(&p).copied().unwrap_or(BlockId::AIR)
        } else {
            neighbor(p)
        }
    };

    let mut out = ChunkMeshCPU::new(id);
    for (&pos, &block) in snapshot.iter() {
        let ty = reg.get(block);
        if !ty.is_visible() {
            continue;
        }
        let center = pos.to_vec3();
        let part = out.parts.entry(block).or_default();
        if ty.is_plant() {
            emit_plant(part, center);
            continue;
        }
        for face in Face::ALL {
            if face == Face::NegY && pos.y == 0 {
                continue;
            }
            if reg.get(lookup(face.neighbor(pos))).is_transparent() {
                emit_face(part, face, center);
            }
        }
    }
    out.parts.retain(|_, m| !m.is_empty());
    log::trace!(
        target: "mesh",
        "meshed chunk {id}: {} blocks, {} faces in {} parts",
        snapshot.len(),
        out.face_count(),
        out.parts.len()
    );
    out
}

/// Unit-size preview of a single block with every face shown.
pub fn build_item_mesh(ty: &BlockType) -> MeshBuild {
    let mut mb = MeshBuild::default();
    if ty.is_plant() {
        emit_plant(&mut mb, Vec3::ZERO);
    } else if ty.is_visible() {
        mb.reserve_quads(6);
        for face in Face::ALL {
            emit_face(&mut mb, face, Vec3::ZERO);
        }
    }
    mb
}

#[inline]
fn emit_face(mb: &mut MeshBuild, face: Face, center: Vec3) {
    let [a, b, c, d] = face.corners(center);
    mb.add_quad(a, b, c, d, face.normal());
}

fn emit_plant(mb: &mut MeshBuild, c: Vec3) {
    let h = 0.5;
    let v = |dx: f32, dy: f32, dz: f32| Vec3::new(c.x + dx, c.y + dy, c.z + dz);
    // plane x = c.x
    let (a, b, cc, d) = (v(0.0, -h, -h), v(0.0, -h, h), v(0.0, h, h), v(0.0, h, -h));
    mb.add_quad(a, b, cc, d, Face::NegX.normal());
    mb.add_quad(a, b, cc, d, Face::PosX.normal());
    // plane z = c.z
    let (a, b, cc, d) = (v(-h, -h, 0.0), v(h, -h, 0.0), v(h, h, 0.0), v(-h, h, 0.0));
    mb.add_quad(a, b, cc, d, Face::PosZ.normal());
    mb.add_quad(a, b, cc, d, Face::NegZ.normal());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_cube_has_six_faces() {
        let reg = BlockRegistry::with_defaults();
        assert_eq!(build_item_mesh(reg.lookup("stone")).quad_count(), 6);
        assert_eq!(build_item_mesh(reg.lookup("dandelion")).quad_count(), 4);
        assert!(build_item_mesh(reg.lookup("air")).is_empty());
    }
}
