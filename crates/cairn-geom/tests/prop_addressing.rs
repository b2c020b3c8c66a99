use cairn_geom::{BlockPos, CHUNK_WIDTH, ChunkId, Vec3, chunk_of, neighbors6, to_block_pos};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = i32> {
    -1_000_000i32..=1_000_000
}

fn arb_pos() -> impl Strategy<Value = BlockPos> {
    (coord(), -512i32..=512, coord()).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

proptest! {
    // chunk_of depends only on X/Z and is pure
    #[test]
    fn chunk_of_ignores_y(p in arb_pos(), y in -4096i32..=4096) {
        let q = BlockPos::new(p.x, y, p.z);
        prop_assert_eq!(chunk_of(p), chunk_of(q));
        prop_assert_eq!(chunk_of(p), chunk_of(p));
    }

    // every position lies inside the footprint of its chunk
    #[test]
    fn position_inside_owner_footprint(p in arb_pos()) {
        let id = chunk_of(p);
        let o = id.origin();
        prop_assert!(p.x >= o.x && p.x < o.x + CHUNK_WIDTH);
        prop_assert!(p.z >= o.z && p.z < o.z + CHUNK_WIDTH);
        prop_assert!(id.contains(p));
    }

    // neighbors differ by one step on exactly one axis
    #[test]
    fn neighbors_are_unit_steps(p in arb_pos()) {
        for n in neighbors6(p) {
            let d = (n.x - p.x).abs() + (n.y - p.y).abs() + (n.z - p.z).abs();
            prop_assert_eq!(d, 1);
        }
    }

    // a lateral neighbor is either in the same chunk or in the adjacent one
    #[test]
    fn lateral_neighbor_chunks_are_adjacent(p in arb_pos()) {
        let home = chunk_of(p);
        for n in neighbors6(p) {
            prop_assert!(chunk_of(n).distance_sq(home) <= 1);
        }
    }

    // rounding lands within half a block on every axis
    #[test]
    fn to_block_pos_is_nearest(
        x in -1.0e5f32..1.0e5,
        y in -1.0e3f32..1.0e3,
        z in -1.0e5f32..1.0e5,
    ) {
        let b = to_block_pos(Vec3::new(x, y, z));
        prop_assert!((b.x as f32 - x).abs() <= 0.5 + 1e-2);
        prop_assert!((b.y as f32 - y).abs() <= 0.5 + 1e-2);
        prop_assert!((b.z as f32 - z).abs() <= 0.5 + 1e-2);
    }
}

#[test]
fn chunk_bounds_span_full_height() {
    let b = ChunkId::new(-1, 2).bounds();
    assert_eq!(b.min, Vec3::new(-32.0, 0.0, 64.0));
    assert_eq!(b.max, Vec3::new(0.0, 256.0, 96.0));
}
