use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use cairn_blocks::BlockId;
use cairn_chunk::Chunk;
use cairn_geom::{BlockPos, CHUNK_WIDTH, ChunkId};
use proptest::prelude::*;

fn small_i32() -> impl Strategy<Value = i32> {
    -10_000i32..=10_000
}

fn local() -> impl Strategy<Value = (i32, i32, i32)> {
    (0..CHUNK_WIDTH, -64i32..=300, 0..CHUNK_WIDTH)
}

fn block() -> impl Strategy<Value = BlockId> {
    (0u16..6).prop_map(BlockId)
}

proptest! {
    // set then get returns the value; air reads back as absent
    #[test]
    fn set_get_delete(cx in small_i32(), cz in small_i32(), (lx, y, lz) in local(), b in block()) {
        let id = ChunkId::new(cx, cz);
        let c = Chunk::new(id);
        let o = id.origin();
        let p = BlockPos::new(o.x + lx, y, o.z + lz);
        c.set(p, b).unwrap();
        prop_assert_eq!(c.get(p).unwrap(), b);
        prop_assert_eq!(c.len(), if b.is_air() { 0 } else { 1 });
        c.delete(p).unwrap();
        prop_assert_eq!(c.get(p).unwrap(), BlockId::AIR);
        prop_assert!(c.is_empty());
    }

    // the chunk behaves like a map from position to non-air block
    #[test]
    fn matches_model(
        cx in small_i32(),
        cz in small_i32(),
        ops in proptest::collection::vec((local(), block()), 1..64),
    ) {
        let id = ChunkId::new(cx, cz);
        let c = Chunk::new(id);
        let o = id.origin();
        let mut model: HashMap<BlockPos, BlockId> = HashMap::new();
        for ((lx, y, lz), b) in ops {
            let p = BlockPos::new(o.x + lx, y, o.z + lz);
            c.set(p, b).unwrap();
            if b.is_air() { model.remove(&p); } else { model.insert(p, b); }
        }
        let mut seen: HashMap<BlockPos, BlockId> = HashMap::new();
        c.for_each(|p, b| { seen.insert(p, b); });
        prop_assert_eq!(&seen, &model);
        for (p, b) in &model {
            prop_assert_eq!(c.get(*p).unwrap(), *b);
        }
    }

    // positions outside the footprint never mutate the chunk
    #[test]
    fn foreign_writes_fail(cx in small_i32(), cz in small_i32(), dx in 1i32..4, y in -8i32..64) {
        let id = ChunkId::new(cx, cz);
        let c = Chunk::new(id);
        let o = id.origin();
        let p = BlockPos::new(o.x + CHUNK_WIDTH * dx, y, o.z);
        prop_assert!(c.set(p, BlockId(1)).is_err());
        prop_assert!(c.get(p).is_err());
        prop_assert!(c.is_empty());
    }
}

#[test]
fn concurrent_writers_to_distinct_segments() {
    let c = Arc::new(Chunk::new(ChunkId::new(0, 0)));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let c = c.clone();
            thread::spawn(move || {
                for i in 0..CHUNK_WIDTH {
                    c.set(BlockPos::new(i, t * 8, 0), BlockId(1)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(c.len(), 4 * CHUNK_WIDTH as usize);
    assert_eq!(c.segment_ids(), vec![0, 1, 2, 3]);
}
