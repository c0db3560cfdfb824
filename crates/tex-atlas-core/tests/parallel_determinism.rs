#![cfg(feature = "parallel")]

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use tex_atlas_core::prelude::*;

fn asset(w: u32, h: u32, seed: u8) -> SourceAsset {
    let img = RgbaImage::from_fn(w, h, |x, y| {
        Rgba([
            (x as u8).wrapping_add(seed),
            (y as u8).wrapping_mul(3),
            seed,
            ((x ^ y) as u8).wrapping_mul(17),
        ])
    });
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), w, h, ExtendedColorType::Rgba8)
        .expect("encode");
    SourceAsset::new(buf)
}

fn inputs() -> Vec<(String, SourceAsset)> {
    (0..40u32)
        .map(|i| {
            let w = 4 + (i * 5) % 12;
            let h = 3 + (i * 7) % 13;
            (format!("sprite_{i:02}"), asset(w, h, i as u8))
        })
        .collect()
}

#[test]
fn parallel_build_matches_serial_build() {
    for algorithm in [PackingAlgorithm::Guillotine, PackingAlgorithm::MaxRects] {
        let serial_cfg = AtlasConfig::builder()
            .with_max_dimensions(32, 32)
            .algorithm(algorithm)
            .optimize(false)
            .parallel(false)
            .build();
        let mut parallel_cfg = serial_cfg.clone();
        parallel_cfg.parallel = true;

        let serial = pack(inputs(), &serial_cfg).expect("serial pack");
        let parallel = pack(inputs(), &parallel_cfg).expect("parallel pack");

        assert!(serial.bins.len() > 1, "{algorithm:?}: expected several bins");
        assert_eq!(serial.bins, parallel.bins);
        assert_eq!(serial.artifacts, parallel.artifacts);
        assert_eq!(serial.consumed, parallel.consumed);
    }
}

#[test]
fn parallel_decode_reports_first_failure_by_name() {
    let mut list = inputs();
    list.push(("zz_broken".into(), SourceAsset::new(b"not an image".to_vec())));
    list.push(("aa_broken".into(), SourceAsset::new(vec![0u8; 8])));
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(32, 32)
        .optimize(false)
        .parallel(true)
        .build();
    match pack(list, &cfg) {
        Err(AtlasError::Decode { name, .. }) => assert_eq!(name, "aa_broken"),
        other => panic!("expected Decode, got {other:?}"),
    }
}
