//! Normalizer Benchmarks
//!
//! Run with: cargo bench --bench normalize

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sitewatch::normalize::normalize;

fn sample_page(items: usize) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><title>Catalog</title>\
         <style>body { font-family: sans-serif; }</style>\
         <script>window.dataLayer = [];</script></head><body>",
    );
    for i in 0..items {
        html.push_str(&format!(
            "<div class=\"item\"><h2>Item {i}</h2><p>Price: &euro;{i}.99 &amp; free shipping</p>\
             <!-- sku {i} --></div>"
        ));
    }
    html.push_str("</body></html>");
    html
}

fn benchmark_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for items in [10, 1_000] {
        let page = sample_page(items);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_function(format!("html_{}_items", items), |b| {
            b.iter(|| normalize(black_box(&page)));
        });
    }

    let plain = "line of text\n".repeat(1_000);
    group.bench_function("plain_text", |b| {
        b.iter(|| normalize(black_box(&plain)));
    });

    group.finish();
}

criterion_group!(benches, benchmark_normalize);
criterion_main!(benches);
