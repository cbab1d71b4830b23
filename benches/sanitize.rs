//! Benchmarks for preview sanitization.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use jotpad::preview::PreviewRenderer;

fn bench_sanitize_simple(c: &mut Criterion) {
    let renderer = PreviewRenderer::default();
    let html = "<p>Hello <b>World</b></p>";
    c.bench_function("sanitize_simple", |b| {
        b.iter(|| renderer.render(black_box(html)))
    });
}

fn bench_sanitize_document(c: &mut Criterion) {
    let renderer = PreviewRenderer::default();
    let section = concat!(
        "<h2>Section</h2>",
        r#"<p style="color: red; position: fixed">Some <em>styled</em> text with "#,
        r#"<a href="https://example.com" onclick="x()">a link</a>.</p>"#,
        "<ul><li>one</li><li>two &amp; three</li></ul>",
        "<script>alert(1)</script><!-- note -->",
        "<table><tr><td>cell</td></tr></table>",
    );
    let html = section.repeat(200);
    c.bench_function("sanitize_document", |b| {
        b.iter(|| renderer.render(black_box(&html)))
    });
}

criterion_group!(benches, bench_sanitize_simple, bench_sanitize_document);
criterion_main!(benches);
