use cairn_geom::{BlockPos, Vec3, to_block_pos};

use crate::WorldCache;

pub const COLLIDE_PADDING: f32 = 0.25;
pub const HIT_MAX_DISTANCE: f32 = 8.0;
pub const HIT_STEP: f32 = 0.125;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub position: Vec3,
    /// A block below stopped the body.
    pub grounded: bool,
    /// A block above stopped the body.
    pub hit_ceiling: bool,
}

impl Collision {
    #[inline]
    pub fn stops_vertical(&self) -> bool {
        self.grounded || self.hit_ceiling
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
    pub hit: BlockPos,
    /// Last empty sample before `hit`; `None` when the ray starts inside a block.
    pub before: Option<BlockPos>,
}

impl WorldCache {
    fn is_obstacle(&self, pos: BlockPos) -> bool {
        self.registry()
            .get(self.block_if_loaded(pos))
            .is_obstacle()
    }

    /// Pushes a two-block-tall body at `pos` out of neighboring obstacles.
    ///
    /// Only resident chunks are consulted.
    pub fn collide(&self, pos: Vec3) -> Collision {
        let Vec3 {
            mut x,
            mut y,
            mut z,
        } = pos;
        let n = pos.round();
        let head = to_block_pos(pos);
        let foot = head.down();
        let pad = COLLIDE_PADDING;
        let mut grounded = false;
        let mut hit_ceiling = false;
        for b in [foot, head] {
            if self.is_obstacle(b.left()) && x < n.x && n.x - x > pad {
                x = n.x - pad;
            }
            if self.is_obstacle(b.right()) && x > n.x && x - n.x > pad {
                x = n.x + pad;
            }
            if self.is_obstacle(b.down()) && y < n.y && n.y - y > pad {
                y = n.y - pad;
                grounded = true;
            }
            if self.is_obstacle(b.up()) && y > n.y && y - n.y > pad {
                y = n.y + pad;
                hit_ceiling = true;
            }
            if self.is_obstacle(b.back()) && z < n.z && n.z - z > pad {
                z = n.z - pad;
            }
            if self.is_obstacle(b.front()) && z > n.z && z - n.z > pad {
                z = n.z + pad;
            }
        }
        Collision {
            position: Vec3::new(x, y, z),
            grounded,
            hit_ceiling,
        }
    }

    /// Marches from `origin` along `dir` and reports the first non-air block.
    ///
    /// Samples every [`HIT_STEP`] up to [`HIT_MAX_DISTANCE`]; consecutive samples
    /// snapping to the same block are tested once. Only resident chunks are consulted.
    pub fn hit_test(&self, origin: Vec3, dir: Vec3) -> Option<RayHit> {
        let mut prev: Option<BlockPos> = None;
        let steps = (HIT_MAX_DISTANCE / HIT_STEP) as i32;
        for i in 0..steps {
            let sample = to_block_pos(origin + dir * (i as f32 * HIT_STEP));
            if prev == Some(sample) {
                continue;
            }
            if self.has_block(sample) {
                return Some(RayHit {
                    hit: sample,
                    before: prev,
                });
            }
            prev = Some(sample);
        }
        None
    }
}
