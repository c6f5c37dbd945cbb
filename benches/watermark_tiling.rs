use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use pagewarden::render::RenderedPage;
use pagewarden::watermark::{StampContext, WatermarkConfig, Watermarker};

fn white_page(width: u32, height: u32) -> RenderedPage {
    RenderedPage {
        index: 1,
        surface: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
    }
}

fn bench_watermark(c: &mut Criterion) {
    let watermarker = Watermarker::new(WatermarkConfig::default()).unwrap();

    let mut group = c.benchmark_group("watermark");
    group.sample_size(20);

    group.bench_function("render_stamp", |b| {
        b.iter(|| {
            watermarker
                .render_stamp(black_box("reader@example.com  |  2025-03-14 09:26:53"))
                .unwrap()
        })
    });

    // Letter page at zoom 1.2: 734x950, 28 tiles
    group.bench_function("apply_letter_1_2x", |b| {
        b.iter_batched(
            || white_page(734, 950),
            |page| {
                watermarker
                    .apply(black_box(page), &StampContext::new(Some("reader@example.com")))
                    .unwrap()
            },
            criterion::BatchSize::LargeInput,
        )
    });

    // Letter page at zoom 2.0: 1224x1584, 72 tiles
    let stamp = watermarker
        .render_stamp("reader@example.com  |  2025-03-14 09:26:53")
        .unwrap();
    group.bench_function("tile_prerendered_stamp_2x", |b| {
        b.iter_batched(
            || white_page(1224, 1584).surface,
            |mut surface| watermarker.stamp_surface(black_box(&mut surface), &stamp),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_watermark);
criterion_main!(benches);
