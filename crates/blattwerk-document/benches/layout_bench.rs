// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for page selection parsing and watermark placement.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use blattwerk_document::layout::geometry::{self, Position, Rect};
use blattwerk_document::layout::page_range;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Parse a long, overlapping selection against a 2000-page document.
fn bench_page_range_parse(c: &mut Criterion) {
    let spec = (0..200)
        .map(|i| format!("{}-{}", i * 10 + 1, i * 10 + 15))
        .collect::<Vec<_>>()
        .join(",");

    c.bench_function("page_range_parse (200 spans)", |b| {
        b.iter(|| {
            let selection = page_range::parse(black_box(&spec), 2000, false);
            black_box(selection.map(|s| s.len()).unwrap_or(0));
        });
    });
}

/// Tile placement on an A4 page with small boxes, the largest grid a
/// watermark request produces.
fn bench_tile_placement(c: &mut Criterion) {
    let page = Rect::from_size(0.0, 0.0, 595.0, 842.0);
    c.bench_function("placement tile (A4, 5%)", |b| {
        b.iter(|| black_box(geometry::placement(black_box(&page), Position::Tile, 0.05)));
    });
}

criterion_group!(benches, bench_page_range_parse, bench_tile_placement);
criterion_main!(benches);
