//! Scanner benchmarks.
//!
//! Run with: `cargo bench --package sable-lex`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sable_lex::{Scanner, TokenKind};

fn token_count(source: &str) -> usize {
    let mut scanner = Scanner::new(source);
    let mut count = 0;
    while scanner.next_token().kind != TokenKind::Eof {
        count += 1;
    }
    count
}

fn bench_scanner_simple(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner");

    let source = "var x = 42; fun add(a, b) { return a + b; } print add(x, 1);";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("simple_var", |b| {
        b.iter(|| token_count(black_box("var x = 42;")))
    });

    group.bench_function("function_with_body", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

fn bench_scanner_program(c: &mut Criterion) {
    let mut group = c.benchmark_group("scanner_program");

    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }

        var total = 0;
        for (var i = 0; i < 10; i = i + 1) {
            total = total + fib(i);
        }
        print "sum: " + total;
    "#;
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("fib_program", |b| b.iter(|| token_count(black_box(source))));

    group.finish();
}

criterion_group!(benches, bench_scanner_simple, bench_scanner_program);
criterion_main!(benches);
