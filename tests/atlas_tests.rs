//! Atlas layout and generation integration tests
//!
//! Exercises the public atlas API end to end: grid layouts, guillotine
//! packing, rasterization, sidecar files, and validation of the results.

use asset_pipeline::atlas::{
    AtlasConfig, AtlasGenerator, AtlasLayoutEngine, AtlasSidecar, AtlasValidator, AtlasView,
    OverflowPolicy, PackingError, Rectangle, SidecarFormat, SpriteInput, UnitSpec,
};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn solid(w: u32, h: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([seed, 255 - seed, seed / 2, 255]))
}

fn no_pot() -> AtlasConfig {
    AtlasConfig { power_of_two: false, ..Default::default() }
}

fn mixed_items() -> Vec<(String, u32, u32)> {
    (0..30u32).map(|i| (format!("item_{:02}", i), 8 + (i % 5) * 7, 6 + (i % 4) * 9)).collect()
}

// ============================================================================
// Grid Layout
// ============================================================================

#[test]
fn test_grid_worker_layout() {
    let engine = AtlasLayoutEngine::new(AtlasConfig::default());
    let layout = engine.calculate_grid_layout(&UnitSpec::new("worker", 8, 8, (64, 64)));

    assert_eq!((layout.width, layout.height), (512, 512));
    assert_eq!(layout.positions.len(), 64);
    assert_eq!(layout.positions["walk_N_0"], Rectangle::new(0, 0, 64, 64));
    assert_eq!(layout.positions["walk_NW_7"], Rectangle::new(448, 448, 64, 64));
    assert!((layout.efficiency - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_grid_layout_with_padding() {
    let engine = AtlasLayoutEngine::new(AtlasConfig { padding: 2, ..no_pot() });
    let layout = engine.calculate_grid_layout(&UnitSpec::new("imp", 2, 2, (32, 32)));

    assert_eq!((layout.width, layout.height), (66, 66));
    assert_eq!(layout.positions["walk_N_1"], Rectangle::new(34, 0, 32, 32));
    assert_eq!(layout.positions["walk_NE_0"], Rectangle::new(0, 34, 32, 32));
}

#[test]
fn test_grid_layout_rounds_to_power_of_two() {
    let engine = AtlasLayoutEngine::new(AtlasConfig::default());
    let layout = engine.calculate_grid_layout(&UnitSpec::new("slime", 3, 3, (50, 50)));

    assert_eq!((layout.width, layout.height), (256, 256));
    let expected = (9.0 * 2500.0) / (256.0 * 256.0);
    assert!((layout.efficiency - expected).abs() < 1e-9);
}

#[test]
fn test_grid_layout_beyond_compass_directions() {
    let engine = AtlasLayoutEngine::new(no_pot());
    let layout = engine.calculate_grid_layout(&UnitSpec::new("orb", 10, 1, (8, 8)));

    assert!(layout.positions.contains_key("walk_NW_0"));
    assert!(layout.positions.contains_key("walk_dir_8_0"));
    assert!(layout.positions.contains_key("walk_dir_9_0"));
}

// ============================================================================
// Bin Packing
// ============================================================================

#[test]
fn test_packed_layout_has_no_overlaps_and_stays_in_bounds() {
    for config in [AtlasConfig::default(), no_pot(), AtlasConfig { padding: 3, ..no_pot() }] {
        let engine = AtlasLayoutEngine::new(config);
        let items = mixed_items();
        let packed = engine.calculate_packed_layout(&items).unwrap();

        for layout in [packed.clone(), engine.optimize_atlas_size(&packed)] {
            let bounds = Rectangle::new(0, 0, layout.width, layout.height);
            let rects: Vec<&Rectangle> = layout.positions.values().collect();

            assert_eq!(rects.len(), items.len());
            assert!(layout.efficiency > 0.0 && layout.efficiency <= 1.0);
            for (i, a) in rects.iter().enumerate() {
                assert!(bounds.contains_rect(a), "{:?} outside {:?}", a, bounds);
                for b in &rects[i + 1..] {
                    assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
                }
            }
        }
    }
}

#[test]
fn test_packed_layout_preserves_item_sizes() {
    let engine = AtlasLayoutEngine::new(no_pot());
    let items = mixed_items();
    let layout = engine.calculate_packed_layout(&items).unwrap();

    for (name, w, h) in &items {
        let rect = layout.positions[name];
        assert_eq!((rect.width, rect.height), (*w, *h));
    }
}

#[test]
fn test_packing_overflow_policies() {
    let items = vec![("big".to_string(), 100, 100), ("wide".to_string(), 120, 40)];
    let tight = AtlasConfig { max_size: (64, 64), ..no_pot() };

    let err = AtlasLayoutEngine::new(tight.clone()).calculate_packed_layout(&items).unwrap_err();
    assert!(matches!(err, PackingError::NoFit { items: 2, max: (64, 64) }));

    let legacy = AtlasConfig { overflow: OverflowPolicy::EmptyLayout, ..tight };
    let layout = AtlasLayoutEngine::new(legacy).calculate_packed_layout(&items).unwrap();
    assert!(layout.is_empty());
    assert_eq!((layout.width, layout.height), (64, 64));
}

// ============================================================================
// Generation
// ============================================================================

#[test]
fn test_unit_atlas_count_mismatch_names_both_counts() {
    let frames = vec![solid(16, 16, 1); 5];
    let err = AtlasGenerator::default()
        .create_unit_atlas(&frames, &UnitSpec::new("imp", 2, 2, (16, 16)))
        .unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, PackingError::FrameCount { expected: 4, actual: 5 }));
    assert!(message.contains('4') && message.contains('5'));
}

#[test]
fn test_worker_atlas_ignores_padding_and_power_of_two() {
    let frames: Vec<RgbaImage> = (0..64).map(|i| solid(64, 64, i as u8)).collect();

    for config in [AtlasConfig::default(), AtlasConfig { padding: 4, power_of_two: false, ..Default::default() }] {
        let atlas = AtlasGenerator::new(config.clone()).create_worker_atlas(&frames, "worker").unwrap();

        assert_eq!(atlas.atlas.dimensions(), (512, 512));
        assert_eq!(atlas.frame_map.len(), 64);
        assert!(atlas.frame_map.values().all(|f| (f.w, f.h) == (64, 64)));

        let issues = AtlasValidator::new(config).validate(AtlasView::from(&atlas), None);
        assert!(issues.iter().all(|i| !i.is_error()), "{:?}", issues);
    }
}

#[test]
fn test_sprite_atlas_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let sprites = vec![
        SpriteInput::new("house", solid(40, 60, 10)),
        SpriteInput::new("tree", solid(20, 30, 90)),
        SpriteInput::new("rock", solid(10, 10, 200)),
    ];
    let generator = AtlasGenerator::default();
    let atlas = generator.create_sprite_atlas(&sprites).unwrap();

    for format in [SidecarFormat::Json, SidecarFormat::Toml] {
        let saved = atlas.save(temp.path(), "props", "RGBA", format).unwrap();
        let sidecar = AtlasSidecar::load(&saved.sidecar).unwrap();
        let image = image::open(&saved.image).unwrap().to_rgba8();

        assert_eq!(sidecar.frames, atlas.frame_map);
        assert_eq!((sidecar.meta.size.w, sidecar.meta.size.h), image.dimensions());
        for sprite in &sprites {
            let frame = sidecar.frames[&sprite.name];
            assert_eq!(image.get_pixel(frame.x, frame.y), sprite.image.get_pixel(0, 0));
        }

        let view = AtlasView::from_sidecar(&image, &sidecar);
        let issues = AtlasValidator::new(generator.config().clone()).validate(view, None);
        assert!(issues.is_empty(), "{:?}", issues);
    }
}
