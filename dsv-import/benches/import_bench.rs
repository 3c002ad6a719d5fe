//! Benchmarks for buffered and incremental import.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dsv_import::delimiter::guess_delimiter;
use dsv_import::prelude::*;
use std::hint::black_box;
use std::time::Duration;

fn sample_text(rows: usize) -> String {
    let mut text = String::from("id,name,state,pop,area,fips\n");
    for i in 0..rows {
        text.push_str(&format!(
            "{i},County {i},S{},\"{},{:03}\",{}.{},{:05}\n",
            i % 50,
            i % 900 + 1,
            i % 1000,
            i * 7,
            i % 10,
            i
        ));
    }
    text
}

fn bench_import_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_modes");
    group.measurement_time(Duration::from_secs(8));

    for rows in [1_000, 10_000, 50_000] {
        let text = sample_text(rows);
        group.throughput(Throughput::Bytes(text.len() as u64));
        let options = ImportOptions::new();
        let importer = Importer::new().with_config(ImportConfig::production());

        group.bench_with_input(BenchmarkId::new("buffered", rows), &text, |b, text| {
            b.iter(|| {
                importer
                    .import(Source::text(black_box(text.clone())), &options)
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("incremental", rows), &text, |b, text| {
            b.iter(|| {
                importer
                    .import(Source::bytes(black_box(text.as_bytes().to_vec())), &options)
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_filtered_import(c: &mut Criterion) {
    let text = sample_text(10_000);
    let options = ImportOptions::new()
        .with_csv_filter("pop > 500000 && state != 'S1'")
        .with_csv_fields(["id", "population=pop"]);
    let importer = Importer::new().with_config(ImportConfig::production());

    c.bench_function("filtered_import_10k", |b| {
        b.iter(|| {
            importer
                .import(Source::text(black_box(text.clone())), &options)
                .unwrap()
        });
    });
}

fn bench_delimiter_detection(c: &mut Criterion) {
    let samples = [
        ("pipe", "name|pop|area\n"),
        ("semicolon", "name;pop;area\n"),
        ("none", "a single column header\n"),
    ];
    let mut group = c.benchmark_group("delimiter_detection");
    for (name, sample) in samples {
        group.bench_with_input(BenchmarkId::from_parameter(name), sample, |b, sample| {
            b.iter(|| guess_delimiter(black_box(sample)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_import_modes,
    bench_filtered_import,
    bench_delimiter_detection
);

criterion_main!(benches);
