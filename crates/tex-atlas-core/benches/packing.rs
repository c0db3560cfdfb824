use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tex_atlas_core::compositing::compose_bin;
use tex_atlas_core::prelude::*;

fn generate_requests(count: usize, min_size: u32, max_size: u32) -> Vec<PlacementRequest> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min_size..=max_size);
            let h = rng.gen_range(min_size..=max_size);
            PlacementRequest::new(format!("tex_{i}"), w, h)
        })
        .collect()
}

fn bench_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_bins");

    for count in [50usize, 200, 800] {
        let requests = generate_requests(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));

        for algorithm in [PackingAlgorithm::Guillotine, PackingAlgorithm::MaxRects] {
            let cfg = AtlasConfig::builder()
                .with_max_dimensions(1024, 1024)
                .algorithm(algorithm)
                .build();
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), count),
                &requests,
                |b, requests| b.iter(|| black_box(pack_bins(requests, &cfg).expect("pack"))),
            );
        }
    }

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let requests = generate_requests(200, 16, 64);
    let cfg = AtlasConfig::builder().with_max_dimensions(1024, 1024).build();
    let bins = pack_bins(&requests, &cfg).expect("pack");
    let textures: Vec<Texture> = requests
        .iter()
        .map(|r| Texture {
            name: r.name.clone(),
            pixels: RgbaImage::from_pixel(r.width, r.height, Rgba([200, 100, 50, 255])),
        })
        .collect();
    let by_name: HashMap<&str, &Texture> =
        textures.iter().map(|t| (t.name.as_str(), t)).collect();

    c.bench_function("compose_bins_200", |b| {
        b.iter(|| {
            for bin in &bins {
                black_box(compose_bin(bin, &by_name).expect("compose"));
            }
        })
    });
}

criterion_group!(benches, bench_algorithms, bench_compose);
criterion_main!(benches);
