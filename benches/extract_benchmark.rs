use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use goextract::{extract_function, parse_source, print_document, resolve_selection, Selection};
use std::hint::black_box as bb;

// =============================================================================
// Corpus
// =============================================================================

const SMALL: &str = r#"package main

func main() {
	x := 3
	println(x)
}
"#;

const MEDIUM: &str = r#"package geometry

type Point struct {
	X, Y float64
}

func (p Point) Abs() float64 {
	return p.X*p.X + p.Y*p.Y
}

func (p *Point) Scale(f float64) {
	p.X = p.X * f
	p.Y = p.Y * f
}

func Area(w, h float64) float64 {
	// normalize first
	w2 := w * 2
	h2 := h * 2
	area := w2 * h2
	return area / 4
}
"#;

/// A file with `n` functions followed by one whose body is extracted.
fn generated(n: usize) -> String {
    let mut src = String::from("package gen\n");
    for i in 0..n {
        src.push_str(&format!(
            "\nfunc f{i}(a, b int) int {{\n\tc := a + b*{i}\n\tif c > {i} {{\n\t\treturn c\n\t}}\n\treturn a - b\n}}\n"
        ));
    }
    src.push_str("\nfunc target(a, b int) int {\n\tsum := a + b\n\tprod := a * b\n\treturn sum + prod\n}\n");
    src
}

/// Selection covering the two statements of `target` in [`generated`].
fn generated_selection(src: &str) -> Selection {
    let line = src.lines().position(|l| l.starts_with("func target")).unwrap_or(0) as u32 + 2;
    format!("{line}:2-{}:15", line + 1).parse().expect("selection")
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    let cases: [(&str, &str, Selection); 2] = [
        ("small_literal", SMALL, "4:7-4:8".parse().expect("selection")),
        ("medium_statements", MEDIUM, "18:2-20:17".parse().expect("selection")),
    ];
    for (name, src, selection) in cases {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::new("resolve", name), &src, |b, src| {
            let doc = parse_source(src).expect("parse");
            b.iter(|| bb(resolve_selection(&doc, selection)).is_ok());
        });
        group.bench_with_input(BenchmarkId::new("extract", name), &src, |b, src| {
            b.iter_batched(
                || parse_source(src).expect("parse"),
                |mut doc| bb(extract_function(&mut doc, selection, "extracted")).is_ok(),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_scalability(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalability");
    group.sample_size(20);

    for n in [10usize, 100, 1000] {
        let src = generated(n);
        let selection = generated_selection(&src);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("extract", n), &src, |b, src| {
            b.iter_batched(
                || parse_source(src).expect("parse"),
                |mut doc| bb(extract_function(&mut doc, selection, "extracted")).is_ok(),
                BatchSize::LargeInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("extract_and_print", n), &src, |b, src| {
            b.iter_batched(
                || parse_source(src).expect("parse"),
                |mut doc| {
                    let _ = extract_function(&mut doc, selection, "extracted");
                    bb(print_document(&doc))
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract, bench_scalability);
criterion_main!(benches);
