use cairn_geom::{BlockPos, Vec3};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Face {
    PosY = 0,
    NegY = 1,
    PosX = 2,
    NegX = 3,
    PosZ = 4,
    NegZ = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosY,
        Face::NegY,
        Face::PosX,
        Face::NegX,
        Face::PosZ,
        Face::NegZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        let (x, y, z) = self.delta();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Integer step `(dx, dy, dz)` out of this face.
    #[inline]
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
            Face::PosX => (1, 0, 0),
            Face::NegX => (-1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegZ => (0, 0, -1),
        }
    }

    #[inline]
    pub fn neighbor(self, pos: BlockPos) -> BlockPos {
        let (dx, dy, dz) = self.delta();
        pos.offset(dx, dy, dz)
    }

    /// Corners of this face on a unit cube centered at `c`, counter-clockwise
    /// seen from outside.
    pub fn corners(self, c: Vec3) -> [Vec3; 4] {
        let h = 0.5;
        let v = |dx: f32, dy: f32, dz: f32| Vec3::new(c.x + dx, c.y + dy, c.z + dz);
        match self {
            Face::PosY => [v(-h, h, h), v(h, h, h), v(h, h, -h), v(-h, h, -h)],
            Face::NegY => [v(-h, -h, -h), v(h, -h, -h), v(h, -h, h), v(-h, -h, h)],
            Face::PosX => [v(h, -h, h), v(h, -h, -h), v(h, h, -h), v(h, h, h)],
            Face::NegX => [v(-h, -h, -h), v(-h, -h, h), v(-h, h, h), v(-h, h, -h)],
            Face::PosZ => [v(-h, -h, h), v(h, -h, h), v(h, h, h), v(-h, h, h)],
            Face::NegZ => [v(h, -h, -h), v(-h, -h, -h), v(-h, h, -h), v(h, h, -h)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_wind_outward() {
        for f in Face::ALL {
            let [a, b, c, _] = f.corners(Vec3::ZERO);
            let e1 = b - a;
            let e2 = c - a;
            let cross = Vec3::new(
                e1.y * e2.z - e1.z * e2.y,
                e1.z * e2.x - e1.x * e2.z,
                e1.x * e2.y - e1.y * e2.x,
            );
            assert!(cross.dot(f.normal()) > 0.0, "{f:?}");
        }
    }
}
