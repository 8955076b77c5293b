use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sql_dummy::engine::{Engine, RunOptions};
use sql_dummy::generator::{apply_defaults, GenerationContext};
use sql_dummy::output::{DumpSink, InsertSink, NullSink};
use sql_dummy::schema::{read_schema, TableSpec};

const SCHEMA: &str = r#"
CREATE TABLE users (
    id serial PRIMARY KEY,
    email varchar(120) NOT NULL UNIQUE,
    name text,
    created_at timestamp NOT NULL
);
CREATE TABLE orders (
    id serial PRIMARY KEY,
    user_id integer NOT NULL REFERENCES users(id),
    total numeric(10, 2),
    paid boolean
);
CREATE TABLE order_items (
    order_id integer NOT NULL REFERENCES orders(id),
    sku char(8) NOT NULL,
    quantity smallint,
    PRIMARY KEY (order_id, sku)
);
"#;

fn tables() -> Vec<TableSpec> {
    let mut tables = read_schema(SCHEMA).unwrap();
    apply_defaults(&mut tables);
    tables
}

fn engine(rows: usize) -> Engine {
    Engine::new(
        GenerationContext::new(42),
        RunOptions {
            default_rows: rows,
            table_filter: Vec::new(),
        },
    )
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for rows in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(rows as u64 * 3));
        group.bench_with_input(BenchmarkId::new("null_sink", rows), &rows, |b, &rows| {
            b.iter_with_setup(
                || (tables(), engine(rows)),
                |(mut tables, mut engine)| {
                    engine.run(&mut tables, &mut NullSink).unwrap();
                },
            )
        });
    }

    group.finish();
}

fn bench_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("formats");
    let rows = 1_000;
    group.throughput(Throughput::Elements(rows as u64 * 3));

    group.bench_function("dump", |b| {
        b.iter_with_setup(
            || (tables(), engine(rows)),
            |(mut tables, mut engine)| {
                let mut sink = DumpSink::new(Vec::with_capacity(1 << 20));
                engine.run(&mut tables, &mut sink).unwrap();
                sink.into_inner().unwrap()
            },
        )
    });

    group.bench_function("insert", |b| {
        b.iter_with_setup(
            || (tables(), engine(rows)),
            |(mut tables, mut engine)| {
                let mut sink = InsertSink::new(Vec::with_capacity(1 << 20));
                engine.run(&mut tables, &mut sink).unwrap();
                sink.into_inner().unwrap()
            },
        )
    });

    group.finish();
}

criterion_group!(benches, bench_generate, bench_formats);
criterion_main!(benches);
