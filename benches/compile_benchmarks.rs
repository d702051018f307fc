//! Benchmarks for expression compilation and evaluation.
//!
//! - Compilation: call-heavy trees of increasing depth and width
//! - Evaluation: the reference executor over non-null and null rows
//!
//! Run with the `profiling` feature to collect per-phase scopes:
//!
//! ```bash
//! cargo bench --features profiling
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rowgen::{Compiler, Executor, FunctionRegistry, RowExpression, SqlType, Value};
use std::hint::black_box;

/// plus(plus(...plus(x, 1)..., 1), 1), `depth` calls deep.
fn nested_plus(depth: usize) -> RowExpression {
    (0..depth).fold(RowExpression::input(0, SqlType::Bigint), |inner, _| {
        RowExpression::call(
            "plus",
            SqlType::Bigint,
            vec![inner, RowExpression::constant(1_i64)],
        )
    })
}

/// COALESCE over `width` distinct string calls of one input.
fn wide_coalesce(width: usize) -> RowExpression {
    let names = ["upper", "lower"];
    let operands = (0..width)
        .map(|i| {
            RowExpression::call(
                names[i % names.len()],
                SqlType::Varchar,
                vec![RowExpression::input(i, SqlType::Varchar)],
            )
        })
        .collect();
    RowExpression::coalesce(operands)
}

fn bench_compile(c: &mut Criterion) {
    let registry = FunctionRegistry::with_builtins();
    let mut group = c.benchmark_group("compile");

    for depth in [1, 10, 100] {
        let expr = nested_plus(depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("nested_plus", depth), &expr, |b, expr| {
            b.iter(|| Compiler::compile(black_box(&registry), &[SqlType::Bigint], black_box(expr)))
        });
    }

    for width in [2, 16, 64] {
        let expr = wide_coalesce(width);
        let layout = vec![SqlType::Varchar; width];
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("wide_coalesce", width), &expr, |b, expr| {
            b.iter(|| Compiler::compile(black_box(&registry), &layout, black_box(expr)))
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let registry = FunctionRegistry::with_builtins();
    let mut group = c.benchmark_group("evaluate");

    let Ok(unit) = Compiler::compile(&registry, &[SqlType::Bigint], &nested_plus(50)) else {
        panic!("benchmark expression failed to compile");
    };
    let executor = Executor::new(&unit, None);

    let row = [Some(Value::Bigint(1))];
    group.bench_function("nested_plus_50", |b| {
        b.iter(|| executor.evaluate(black_box(&row)))
    });

    let null_row = [None];
    group.bench_function("nested_plus_50_null", |b| {
        b.iter(|| executor.evaluate(black_box(&null_row)))
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
