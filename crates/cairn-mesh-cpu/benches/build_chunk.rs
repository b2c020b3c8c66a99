use criterion::{Criterion, black_box, criterion_group, criterion_main};

use cairn_blocks::{BlockId, BlockRegistry};
use cairn_chunk::Chunk;
use cairn_geom::{BlockPos, ChunkId};
use cairn_mesh_cpu::build_chunk_mesh;

fn filled_chunk(reg: &BlockRegistry, height: i32) -> Chunk {
    let stone = reg.id_by_name("stone").unwrap_or(BlockId::AIR);
    let c = Chunk::new(ChunkId::new(0, 0));
    for x in 0..32 {
        for z in 0..32 {
            for y in 0..height {
                c.set(BlockPos::new(x, y, z), stone).unwrap();
            }
        }
    }
    c
}

fn bench_build_chunk(c: &mut Criterion) {
    let reg = BlockRegistry::with_defaults();
    let mut group = c.benchmark_group("build_chunk_mesh");
    for height in [16, 48] {
        let chunk = filled_chunk(&reg, height);
        group.bench_function(format!("solid_32x{height}x32"), |b| {
            b.iter(|| {
                let out = build_chunk_mesh(&chunk, &reg, |_| BlockId::AIR);
                black_box(out);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_chunk);
criterion_main!(benches);
