use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgba, RgbaImage};
use pixkit::{
    convert::{self, ConvertRequest},
    resize::{self, ResizeRequest},
    BackgroundSpec, MaskCompositor, OutputFormat, RgbColor, SegmentationMask, SourceImage,
};

const SIZES: &[(u32, u32)] = &[(320, 240), (1280, 720), (1920, 1080)];

fn source_image(width: u32, height: u32) -> SourceImage {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
    });
    SourceImage::from_rgba(pixels)
}

/// Soft elliptical foreground at a fixed model resolution
fn model_mask() -> SegmentationMask {
    let (width, height) = (320, 320);
    let data = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                let dx = (x as f32 - 160.0) / 120.0;
                let dy = (y as f32 - 160.0) / 150.0;
                (1.5 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0)
            })
        })
        .collect();
    SegmentationMask::new(data, (width, height))
}

fn bench_backgrounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_backgrounds");
    group.sample_size(20);

    let mask = model_mask();
    let backgrounds = [
        BackgroundSpec::Transparent,
        BackgroundSpec::SolidColor {
            color: RgbColor::new(0, 128, 255),
        },
        BackgroundSpec::Blur { radius: 10 },
    ];

    for &(width, height) in SIZES {
        let source = source_image(width, height);
        for background in &backgrounds {
            group.bench_with_input(
                BenchmarkId::new(background.to_string(), format!("{}x{}", width, height)),
                background,
                |b, background| {
                    b.iter(|| {
                        MaskCompositor::composite(black_box(&source), black_box(&mask), background)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_mask_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_scaling");
    let mask = model_mask();

    for &(width, height) in SIZES {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &(width, height),
            |b, &(width, height)| b.iter(|| mask.resize(black_box(width), black_box(height))),
        );
    }

    group.finish();
}

fn bench_editing_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("editing_paths");
    group.sample_size(10);
    let source = source_image(1920, 1080);

    group.bench_function("resize_half_jpeg", |b| {
        let request = ResizeRequest::new(Some(960), Some(540), 92);
        b.iter(|| resize::export_resized(black_box(&source), &request));
    });

    for format in [OutputFormat::Jpeg, OutputFormat::Png] {
        let request = ConvertRequest::new(format, 92);
        group.bench_with_input(
            BenchmarkId::new("convert", format.to_string()),
            &request,
            |b, request| b.iter(|| convert::convert(black_box(&source), request)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_backgrounds, bench_mask_scaling, bench_editing_paths);
criterion_main!(benches);
