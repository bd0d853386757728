//! Criterion benchmarks for asset pipeline critical paths
//!
//! Benchmarks the core performance-critical operations:
//! - Layout: grid layout and guillotine bin packing
//! - Generator: atlas rasterization for units and sprite collections
//! - Scheduler: execution order over the step graph

use asset_pipeline::atlas::{AtlasConfig, AtlasGenerator, AtlasLayoutEngine, SpriteInput, UnitSpec};
use asset_pipeline::pipeline::{execution_order, DependencyGraph, StepId};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Named `(name, width, height)` items of mixed sizes for packing
fn make_items(count: usize) -> Vec<(String, u32, u32)> {
    (0..count)
        .map(|i| {
            let size = match i % 4 {
                0 => 8,
                1 => 16,
                2 => 24,
                _ => 32,
            };
            (format!("item_{}", i), size, size + (i % 3) as u32 * 4)
        })
        .collect()
}

/// Create sprite inputs for atlas generation benchmarks
fn make_sprite_inputs(count: usize, size: u32) -> Vec<SpriteInput> {
    (0..count)
        .map(|i| {
            let color = Rgba([(i * 37 % 256) as u8, (i * 91 % 256) as u8, 128, 255]);
            SpriteInput::new(format!("sprite_{}", i), RgbaImage::from_pixel(size, size, color))
        })
        .collect()
}

// =============================================================================
// Layout Benchmarks
// =============================================================================

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let engine = AtlasLayoutEngine::new(AtlasConfig::default());

    for count in [10, 50, 100, 200].iter() {
        let items = make_items(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("packed_mixed", count), &items, |b, items| {
            b.iter(|| engine.calculate_packed_layout(black_box(items)))
        });
    }

    let padded = AtlasLayoutEngine::new(AtlasConfig { padding: 2, ..Default::default() });
    let items = make_items(100);
    group.bench_function("packed_100_with_padding", |b| {
        b.iter(|| padded.calculate_packed_layout(black_box(&items)))
    });

    let worker = UnitSpec::new("worker", 8, 8, (64, 64));
    group.bench_function("grid_worker", |b| {
        b.iter(|| engine.calculate_grid_layout(black_box(&worker)))
    });

    group.finish();
}

// =============================================================================
// Generator Benchmarks
// =============================================================================

fn bench_generator(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator");
    let generator = AtlasGenerator::default();

    for size in [8, 16, 32].iter() {
        let sprites = make_sprite_inputs(50, *size);
        group.bench_with_input(
            BenchmarkId::new("sprite_atlas_50", format!("{}x{}", size, size)),
            &sprites,
            |b, sprites| b.iter(|| generator.create_sprite_atlas(black_box(sprites))),
        );
    }

    let frames = vec![RgbaImage::from_pixel(64, 64, Rgba([40, 80, 160, 255])); 64];
    group.bench_function("worker_atlas", |b| {
        b.iter(|| generator.create_worker_atlas(black_box(&frames), "worker"))
    });

    group.finish();
}

// =============================================================================
// Scheduler Benchmarks
// =============================================================================

fn bench_scheduler(c: &mut Criterion) {
    let graph = DependencyGraph::standard();
    c.bench_function("scheduler/full_order", |b| {
        b.iter(|| execution_order(black_box(&graph), black_box(&StepId::ALL)))
    });
}

criterion_group!(benches, bench_layout, bench_generator, bench_scheduler);
criterion_main!(benches);
