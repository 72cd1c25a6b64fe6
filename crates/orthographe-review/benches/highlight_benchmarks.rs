//! Benchmarks for the overlap highlighter.
//!
//! Renders are re-run on every change to the error set, so a Brevet-length
//! submission (about 140 words) with a heavily annotated error set should
//! stay well under a millisecond.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orthographe_core::types::{ErrorKind, ErrorSpan};
use orthographe_review::highlight::{highlight, render};

/// A submission of roughly 140 words.
fn brevet_submission() -> String {
    "Le soir tombait sur la petite ville et les enfants rentraient lentement \
     de l'école, leurs cartables battant contre leurs jambes fatiguées. Ma mère \
     nous attendait devant la porte, les mains encore blanches de farine, et \
     elle souriait sans rien dire. "
        .repeat(4)
}

/// `count` spans mixing nested, overlapping, adjacent and malformed shapes.
fn generate_errors(text_len: i64, count: usize) -> Vec<ErrorSpan> {
    (0..count)
        .map(|i| {
            let i = i as i64;
            let start = (i * 37) % text_len;
            let width = match i % 5 {
                0 => 3,
                1 => 12,
                2 => 40,
                3 => 0,
                _ => text_len,
            };
            let kind = if i % 2 == 0 {
                ErrorKind::Grammar
            } else {
                ErrorKind::Lexical
            };
            ErrorSpan::new(kind, start, start + width)
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let text = brevet_submission();
    let len = text.chars().count() as i64;

    let mut group = c.benchmark_group("render");
    for count in [0usize, 10, 40, 120] {
        let errors = generate_errors(len, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &errors, |b, errors| {
            b.iter(|| render(black_box(&text), black_box(errors)))
        });
    }
    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let text = brevet_submission();
    let len = text.chars().count() as i64;
    let errors = generate_errors(len, 40);

    c.bench_function("highlight_40_errors", |b| {
        b.iter(|| highlight(black_box(&text), black_box(&errors)))
    });
}

criterion_group!(benches, bench_render, bench_highlight);
criterion_main!(benches);
