// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for PDF assembly in the scanfold-document crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{Rgb, RgbImage};

use scanfold_document::PdfAssembler;

/// Assemble a three-page document from 150 dpi half-letter-sized rasters.
///
/// The rasters are written once up front so only decode, embed and
/// serialisation are timed.
fn bench_assemble_three_pages(c: &mut Criterion) {
    let dir = std::env::temp_dir().join(format!("scanfold_bench_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let pages: Vec<_> = (0..3)
        .map(|i| {
            let path = dir.join(format!("scan_{i:03}.png"));
            let mut img = RgbImage::from_pixel(638, 825, Rgb([250, 250, 245]));
            for x in 100..500 {
                img.put_pixel(x, 200 + i * 10, Rgb([20, 20, 20]));
            }
            img.save(&path).unwrap();
            path
        })
        .collect();

    let assembler = PdfAssembler::new();
    c.bench_function("assemble 3 pages (638x825 @150dpi)", |b| {
        b.iter(|| {
            let bytes = assembler.assemble(black_box(&pages), 150).unwrap();
            black_box(bytes);
        });
    });

    let _ = std::fs::remove_dir_all(&dir);
}

criterion_group!(benches, bench_assemble_three_pages);
criterion_main!(benches);
