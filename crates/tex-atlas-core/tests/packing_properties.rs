use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tex_atlas_core::prelude::*;

fn random_requests(seed: u64, count: u32, max_side: u32) -> Vec<PlacementRequest> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(1..=max_side);
            let h = rng.gen_range(1..=max_side);
            PlacementRequest::new(format!("r{i}"), w, h)
        })
        .collect()
}

fn assert_disjoint(bin: &Bin) {
    for i in 0..bin.placements.len() {
        for j in (i + 1)..bin.placements.len() {
            let a = &bin.placements[i];
            let b = &bin.placements[j];
            assert!(
                !a.rect.intersects(&b.rect),
                "bin {}: {} {:?} overlaps {} {:?}",
                bin.id,
                a.name,
                a.rect,
                b.name,
                b.rect
            );
        }
    }
}

fn assert_padded(bin: &Bin, padding: u32) {
    for i in 0..bin.placements.len() {
        for j in (i + 1)..bin.placements.len() {
            let a = bin.placements[i].rect;
            let b = bin.placements[j].rect;
            let sa = Rect::new(a.x, a.y, a.w + padding, a.h + padding);
            let sb = Rect::new(b.x, b.y, b.w + padding, b.h + padding);
            assert!(!sa.intersects(&sb), "slots {sa:?} and {sb:?} touch");
        }
    }
}

fn assert_bounds(bin: &Bin, cfg: &AtlasConfig) {
    assert!(bin.width <= cfg.max_width && bin.height <= cfg.max_height);
    for p in &bin.placements {
        assert!(p.rect.right() <= bin.width, "{} exceeds bin width", p.name);
        assert!(p.rect.bottom() <= bin.height, "{} exceeds bin height", p.name);
    }
}

fn assert_complete(requests: &[PlacementRequest], bins: &[Bin]) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for bin in bins {
        for p in &bin.placements {
            *seen.entry(p.name.as_str()).or_default() += 1;
        }
    }
    assert_eq!(seen.len(), requests.len());
    for r in requests {
        assert_eq!(seen.get(r.name.as_str()), Some(&1), "{} placed once", r.name);
    }
    for bin in bins {
        for p in &bin.placements {
            let r = requests.iter().find(|r| r.name == p.name).expect("known name");
            assert_eq!((p.rect.w, p.rect.h), (r.width, r.height));
        }
    }
}

#[test]
fn random_sets_hold_all_invariants() {
    for algorithm in [PackingAlgorithm::Guillotine, PackingAlgorithm::MaxRects] {
        let cfg = AtlasConfig::builder()
            .with_max_dimensions(256, 256)
            .padding(2)
            .algorithm(algorithm)
            .build();
        let requests = random_requests(2024, 300, 64);
        let bins = pack_bins(&requests, &cfg).expect("pack");
        assert!(bins.len() > 1, "{algorithm:?}: 300 sprites cannot fit one 256² bin");
        for bin in &bins {
            assert_disjoint(bin);
            assert_padded(bin, cfg.padding);
            assert_bounds(bin, &cfg);
        }
        assert_complete(&requests, &bins);
    }
}

#[test]
fn three_sprites_share_one_bin() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(1)
        .build();
    let requests = vec![
        PlacementRequest::new("a", 10, 10),
        PlacementRequest::new("b", 20, 5),
        PlacementRequest::new("c", 5, 30),
    ];
    let bins = pack_bins(&requests, &cfg).expect("pack");
    assert_eq!(bins.len(), 1);
    assert_disjoint(&bins[0]);
    assert_padded(&bins[0], 1);
    assert_bounds(&bins[0], &cfg);
    assert_complete(&requests, &bins);
    // Largest area first, name breaks ties.
    let order: Vec<&str> = bins[0].placements.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, ["c", "a", "b"]);
}

#[test]
fn placement_ignores_input_order() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(128, 128)
        .build();
    let requests = random_requests(7, 80, 40);
    let mut shuffled = requests.clone();
    shuffled.shuffle(&mut rand::rngs::StdRng::seed_from_u64(99));
    let a = pack_bins(&requests, &cfg).expect("pack");
    let b = pack_bins(&shuffled, &cfg).expect("pack");
    assert_eq!(a, b);
}

#[test]
fn overflow_opens_new_bins() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(0)
        .build();
    let requests: Vec<_> = (0..5)
        .map(|i| PlacementRequest::new(format!("t{i}"), 40, 40))
        .collect();
    let bins = pack_bins(&requests, &cfg).expect("pack");
    assert_eq!(bins.len(), 5);
    for (i, bin) in bins.iter().enumerate() {
        assert_eq!(bin.id, i);
        assert_eq!(bin.placements.len(), 1);
        assert_bounds(bin, &cfg);
        assert_eq!((bin.width, bin.height), (40, 40));
    }
}

#[test]
fn bin_cap_reports_exhaustion() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(0)
        .max_bins(Some(2))
        .build();
    let requests: Vec<_> = (0..5)
        .map(|i| PlacementRequest::new(format!("t{i}"), 40, 40))
        .collect();
    match pack_bins(&requests, &cfg) {
        Err(AtlasError::PackingExhausted {
            name,
            placed,
            total,
            max_bins,
        }) => {
            // Equal areas are placed in name order, so t2 is the first one left over.
            assert_eq!(name, "t2");
            assert_eq!((placed, total, max_bins), (2, 5, 2));
        }
        other => panic!("expected PackingExhausted, got {other:?}"),
    }
}

#[test]
fn oversize_texture_is_rejected_by_name() {
    let cfg = AtlasConfig::default();
    let requests = vec![
        PlacementRequest::new("small", 16, 16),
        PlacementRequest::new("huge", 4096, 4096),
    ];
    match pack_bins(&requests, &cfg) {
        Err(AtlasError::OversizeTexture {
            name,
            width,
            height,
            max_width,
            max_height,
        }) => {
            assert_eq!(name, "huge");
            assert_eq!((width, height), (4096, 4096));
            assert_eq!((max_width, max_height), (2048, 2048));
        }
        other => panic!("expected OversizeTexture, got {other:?}"),
    }
}

#[test]
fn exact_max_size_texture_fits_with_padding() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(64, 32)
        .padding(4)
        .build();
    let bins = pack_bins(&[PlacementRequest::new("full", 64, 32)], &cfg).expect("pack");
    assert_eq!(bins.len(), 1);
    assert_eq!(bins[0].placements[0].rect, Rect::new(0, 0, 64, 32));
    assert_eq!((bins[0].width, bins[0].height), (64, 32));
}

#[test]
fn zero_sized_request_is_rejected() {
    let cfg = AtlasConfig::default();
    let err = pack_bins(&[PlacementRequest::new("flat", 0, 8)], &cfg).unwrap_err();
    assert!(matches!(err, AtlasError::EmptyTexture { name } if name == "flat"));
}

#[test]
fn smart_sizing_shrinks_to_content() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(512, 512)
        .padding(1)
        .build();
    let bins = pack_bins(
        &[
            PlacementRequest::new("a", 30, 20),
            PlacementRequest::new("b", 10, 10),
        ],
        &cfg,
    )
    .expect("pack");
    let bin = &bins[0];
    let max_right = bin.placements.iter().map(|p| p.rect.right()).max().unwrap();
    let max_bottom = bin.placements.iter().map(|p| p.rect.bottom()).max().unwrap();
    assert_eq!((bin.width, bin.height), (max_right, max_bottom));
}

#[test]
fn fixed_sizing_reports_maximum() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(300, 200)
        .smart_sizing(false)
        .build();
    let bins = pack_bins(&[PlacementRequest::new("a", 10, 10)], &cfg).expect("pack");
    assert_eq!((bins[0].width, bins[0].height), (300, 200));
}

#[test]
fn pow2_and_square_rounding() {
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(256, 256)
        .allow_non_power_of_two(false)
        .allow_non_square(false)
        .padding(1)
        .build();
    let requests = random_requests(11, 60, 48);
    let bins = pack_bins(&requests, &cfg).expect("pack");
    for bin in &bins {
        assert!(bin.width.is_power_of_two() && bin.height.is_power_of_two());
        assert_eq!(bin.width, bin.height);
        assert_bounds(bin, &cfg);
    }

    let cfg = AtlasConfig::builder()
        .with_max_dimensions(256, 256)
        .allow_non_power_of_two(false)
        .build();
    let bins = pack_bins(&[PlacementRequest::new("a", 33, 9)], &cfg).expect("pack");
    assert_eq!((bins[0].width, bins[0].height), (64, 16));

    let cfg = AtlasConfig::builder()
        .with_max_dimensions(256, 256)
        .allow_non_square(false)
        .build();
    let bins = pack_bins(&[PlacementRequest::new("a", 33, 9)], &cfg).expect("pack");
    assert_eq!((bins[0].width, bins[0].height), (33, 33));
}

#[test]
fn later_requests_fill_earlier_bins() {
    // After the 60x60 sprites force two bins, the small sprites should land in
    // leftover space instead of a third bin.
    let cfg = AtlasConfig::builder()
        .with_max_dimensions(64, 64)
        .padding(0)
        .build();
    let requests = vec![
        PlacementRequest::new("big0", 60, 60),
        PlacementRequest::new("big1", 60, 60),
        PlacementRequest::new("tiny0", 4, 4),
        PlacementRequest::new("tiny1", 4, 4),
    ];
    let bins = pack_bins(&requests, &cfg).expect("pack");
    assert_eq!(bins.len(), 2);
    for bin in &bins {
        assert_disjoint(bin);
        assert_bounds(bin, &cfg);
    }
    assert_complete(&requests, &bins);
}
