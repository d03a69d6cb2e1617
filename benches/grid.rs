use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gridcut::{
    compose, compute_cells, extract_cell, validate_canvas_size, Canvas, GridError, GridSpec,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::hint::black_box;

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

// Geometry only, no pixels
fn bench_compute_cells(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_cells");
    let grids = [(2, 2), (8, 8), (32, 32), (128, 128)];

    for (rows, columns) in grids {
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{}x{}", rows, columns)),
            &(rows, columns),
            |b, &(rows, columns)| {
                b.iter(|| black_box(compute_cells(4000, 3000, rows, columns).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let sizes = [(500, 500), (1000, 1000), (2000, 2000)];

    for (width, height) in sizes {
        let img = create_test_image(width, height);
        let cells = compute_cells(width, height, 4, 4).unwrap();

        group.bench_with_input(
            BenchmarkId::new("size", format!("{}x{}", width, height)),
            &img,
            |b, img| {
                b.iter(|| {
                    for cell in &cells {
                        black_box(extract_cell(img, cell).unwrap());
                    }
                });
            },
        );
    }
    group.finish();
}

// Same-size cells are copied, mismatched ones go through a resize first
fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let spec = GridSpec::new(4, 4).unwrap();
    let cases = [("exact", 128, false), ("stretched", 100, false), ("alpha", 128, true)];

    for (name, source_side, alpha) in cases {
        let cell = if alpha {
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                source_side,
                source_side,
                Rgba([10, 20, 30, 128]),
            ))
        } else {
            create_test_image(source_side, source_side)
        };
        let size = validate_canvas_size(128, 128, spec.rows, spec.columns).unwrap();

        group.bench_with_input(BenchmarkId::new("cells", name), &cell, |b, cell| {
            b.iter(|| {
                let canvas = Canvas::allocate(size, alpha).unwrap();
                let cells = (0..spec.cell_count()).map(|_| Ok::<_, GridError>(cell.clone()));
                black_box(compose(canvas, cells, spec, 128, 128));
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_compute_cells, bench_extract, bench_compose
}
criterion_main!(benches);
