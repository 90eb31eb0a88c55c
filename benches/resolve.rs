use criterion::{Criterion, black_box, criterion_group, criterion_main};
use csvmedkit::columns::resolve_columns;
use csvmedkit::indexes::IndexSet;

fn make_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("column_{}", i)).collect()
}

fn bench_resolve_columns(c: &mut Criterion) {
    let narrow = make_names(10);
    let wide = make_names(1_000);

    c.bench_function("resolve_all_10", |b| {
        b.iter(|| black_box(resolve_columns("", &narrow, 1, None).unwrap()))
    });

    c.bench_function("resolve_mixed_10", |b| {
        b.iter(|| black_box(resolve_columns("1,column_3,5-7,9-", &narrow, 1, None).unwrap()))
    });

    c.bench_function("resolve_ranges_1k", |b| {
        b.iter(|| {
            black_box(
                resolve_columns("1-100,column_500,700:800,950-", &wide, 1, Some("50-60")).unwrap(),
            )
        })
    });
}

fn bench_index_set(c: &mut Criterion) {
    c.bench_function("index_parse", |b| {
        b.iter(|| black_box(IndexSet::parse("0,3,5-20,40-60,100,250-").unwrap()))
    });

    let set = IndexSet::parse("0,3,5-20,40-60,100,250-").unwrap();
    c.bench_function("index_contains_10k", |b| {
        b.iter(|| black_box((0..10_000).filter(|&i| set.contains(i)).count()))
    });
}

criterion_group!(benches, bench_resolve_columns, bench_index_set);
criterion_main!(benches);
