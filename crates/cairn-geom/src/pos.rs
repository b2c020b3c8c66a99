use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Aabb, Vec3};

/// Horizontal edge length of a chunk column, in blocks.
pub const CHUNK_WIDTH: i32 = 32;
/// Vertical extent of a storage segment inside a chunk.
pub const SEGMENT_HEIGHT: i32 = 8;
/// Upper bound used for chunk bounding boxes (culling only; Y is not clamped).
pub const MAX_WORLD_HEIGHT: i32 = 256;

/// Integer block coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn left(self) -> Self {
        self.offset(-1, 0, 0)
    }
    #[inline]
    pub fn right(self) -> Self {
        self.offset(1, 0, 0)
    }
    #[inline]
    pub fn down(self) -> Self {
        self.offset(0, -1, 0)
    }
    #[inline]
    pub fn up(self) -> Self {
        self.offset(0, 1, 0)
    }
    #[inline]
    pub fn back(self) -> Self {
        self.offset(0, 0, -1)
    }
    #[inline]
    pub fn front(self) -> Self {
        self.offset(0, 0, 1)
    }

    #[inline]
    pub fn chunk(self) -> ChunkId {
        chunk_of(self)
    }

    /// Storage segment index within the owning chunk.
    #[inline]
    pub fn segment(self) -> i32 {
        self.y.div_euclid(SEGMENT_HEIGHT)
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<BlockPos> for (i32, i32, i32) {
    fn from(value: BlockPos) -> Self {
        (value.x, value.y, value.z)
    }
}

/// Column identifier: floor division of a block's X/Z by [`CHUNK_WIDTH`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ChunkId {
    pub x: i32,
    pub z: i32,
}

impl ChunkId {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkId) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dz = i64::from(self.z - other.z);
        dx * dx + dz * dz
    }

    /// Block coordinates of the column's minimum X/Z corner at y = 0.
    #[inline]
    pub fn origin(self) -> BlockPos {
        BlockPos::new(self.x * CHUNK_WIDTH, 0, self.z * CHUNK_WIDTH)
    }

    #[inline]
    pub fn contains(self, pos: BlockPos) -> bool {
        chunk_of(pos) == self
    }

    /// Box spanning the column footprint from y = 0 to [`MAX_WORLD_HEIGHT`].
    pub fn bounds(self) -> Aabb {
        let o = self.origin().to_vec3();
        let w = CHUNK_WIDTH as f32;
        Aabb::new(o, Vec3::new(o.x + w, MAX_WORLD_HEIGHT as f32, o.z + w))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

impl From<(i32, i32)> for ChunkId {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkId> for (i32, i32) {
    fn from(value: ChunkId) -> Self {
        (value.x, value.z)
    }
}

#[inline]
pub fn to_block_pos(v: Vec3) -> BlockPos {
    let r = v.round();
    BlockPos::new(r.x as i32, r.y as i32, r.z as i32)
}

#[inline]
pub fn chunk_of(pos: BlockPos) -> ChunkId {
    ChunkId::new(pos.x.div_euclid(CHUNK_WIDTH), pos.z.div_euclid(CHUNK_WIDTH))
}

/// Face-adjacent positions in the order left, right, down, up, back, front.
#[inline]
pub fn neighbors6(pos: BlockPos) -> [BlockPos; 6] {
    [
        pos.left(),
        pos.right(),
        pos.down(),
        pos.up(),
        pos.back(),
        pos.front(),
    ]
}
