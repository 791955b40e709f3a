use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_transit::blob::BinaryBlob;
use mesh_transit::data::{Block, Centering, GeometryKind, ImageData, ScalarType};
use mesh_transit::metadata::{MeshMetadata, MeshMetadataBuilder};
use mesh_transit::partition::{BlockPartitioner, CyclicPartitioner, Partitioner, PlanePartitioner};

// Random image blocks laid out along x, with a handful of arrays.
fn metadata(n_blocks: usize, n_writers: usize, seed: u64) -> MeshMetadata {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut b = MeshMetadataBuilder::new("bench", GeometryKind::UniformCartesian)
        .array("pressure", Centering::Cell, 1, ScalarType::F64)
        .array("velocity", Centering::Point, 3, ScalarType::F32)
        .array("material", Centering::Cell, 1, ScalarType::I32)
        .ghost_cells(1);
    let mut x0 = 0;
    for j in 0..n_blocks {
        let nx = rng.gen_range(4..32);
        let block = Block::Image(ImageData {
            extent: [x0, x0 + nx, 0, rng.gen_range(4..32), 0, rng.gen_range(0..8)],
            ..Default::default()
        });
        x0 += nx;
        b = b.block(j, j % n_writers, &block);
    }
    b.build(n_writers).unwrap()
}

fn bench_blob(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata_blob");
    for &n in &[16usize, 256, 4096] {
        let md = metadata(n, 8, 42);
        group.bench_with_input(BenchmarkId::new("to_blob", n), &md, |b, md| {
            b.iter(|| {
                let mut blob = BinaryBlob::new();
                md.to_blob(&mut blob);
                blob
            })
        });
        let mut blob = BinaryBlob::new();
        md.to_blob(&mut blob);
        let bytes = blob.into_vec();
        group.bench_with_input(BenchmarkId::new("from_blob", n), &bytes, |b, bytes| {
            b.iter(|| {
                let mut blob = BinaryBlob::from_vec(bytes.clone());
                MeshMetadata::from_blob(&mut blob).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    let md = metadata(4096, 8, 7);
    let strategies: [(&str, Box<dyn Partitioner>); 3] = [
        ("block", Box::new(BlockPartitioner)),
        ("cyclic", Box::new(CyclicPartitioner)),
        ("plane", Box::new(PlanePartitioner::new(16))),
    ];
    for (name, p) in &strategies {
        for &ranks in &[3usize, 64] {
            group.bench_with_input(BenchmarkId::new(*name, ranks), &ranks, |b, &ranks| {
                b.iter(|| p.partition(&md, ranks).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_blob, bench_partition);
criterion_main!(benches);
