use glam::{Mat4, Vec4};

use crate::{Aabb, ChunkId, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_row(v: Vec4) -> Self {
        Plane {
            normal: Vec3::new(v.x, v.y, v.z),
            d: v.w,
        }
    }

    /// Signed distance scaled by the (unnormalized) normal length.
    #[inline]
    pub fn side(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// Six clip planes (left, right, bottom, top, near, far) of a view-projection matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_proj(m: Mat4) -> Self {
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        Frustum {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r3 + r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    /// Conservative: false only when every corner lies outside a single plane.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let corners = aabb.corners();
        !self
            .planes
            .iter()
            .any(|plane| corners.iter().all(|c| plane.side(*c) < 0.0))
    }

    #[inline]
    pub fn contains_chunk(&self, id: ChunkId) -> bool {
        self.intersects_aabb(&id.bounds())
    }
}
