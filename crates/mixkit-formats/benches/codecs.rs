//! Benchmarks for the decode paths hit on every asset load
//!
//! Run with:
//! ```bash
//! cargo bench --bench codecs
//! ```

#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mixkit_formats::codec::{lcw, rle};
use mixkit_formats::hash::hash_name;
use mixkit_formats::image::IndexedImage;
use mixkit_formats::palette::Palette;
use std::hint::black_box;

/// Sprite-like pixels: transparent margins around a patterned body
fn sprite_pixels(width: u16, height: u16) -> Vec<u8> {
    let (w, h) = (usize::from(width), usize::from(height));
    (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if x < w / 4 || x >= w - w / 4 {
                0
            } else {
                ((x * 7 + y * 3) % 48 + 16) as u8
            }
        })
        .collect()
}

fn bench_lcw(c: &mut Criterion) {
    let mut group = c.benchmark_group("lcw_decompress");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let data: Vec<u8> = (0..size).map(|i| ((i / 13) % 61) as u8).collect();
        let packed = lcw::compress(&data);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &packed, |b, packed| {
            b.iter(|| lcw::decompress(black_box(packed), size).expect("valid stream"));
        });
    }

    group.finish();
}

fn bench_rle(c: &mut Criterion) {
    let mut group = c.benchmark_group("rle_decode");

    for (width, height) in [(24u16, 24u16), (128, 128), (640, 400)] {
        let image = IndexedImage::from_pixels(width, height, sprite_pixels(width, height))
            .expect("sized buffer");
        let encoded = rle::encode_frame(&image);

        group.throughput(Throughput::Elements(u64::from(width) * u64::from(height)));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &encoded,
            |b, encoded| {
                b.iter(|| {
                    rle::decode_frame(black_box(encoded), width, height).expect("valid frame")
                });
            },
        );
    }

    group.finish();
}

fn bench_palette_convert(c: &mut Criterion) {
    let mut palette = Palette::new();
    let src = sprite_pixels(640, 400);
    let mut dst = vec![0u32; src.len()];

    let mut group = c.benchmark_group("palette");
    group.throughput(Throughput::Elements(src.len() as u64));
    group.bench_function("convert_640x400", |b| {
        b.iter(|| palette.convert(black_box(&src), &mut dst));
    });
    group.finish();
}

fn bench_hash(c: &mut Criterion) {
    c.bench_function("hash_name", |b| {
        b.iter(|| hash_name(black_box("c:\\westwood\\redalert\\conquer.mix")));
    });
}

criterion_group!(benches, bench_lcw, bench_rle, bench_palette_convert, bench_hash);
criterion_main!(benches);
