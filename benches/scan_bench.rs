use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use treelens::diff::DiffEngine;
use treelens::fs::MemoryFs;
use treelens::output::{ReportOptions, render_report};
use treelens::scanner::DirectoryScanner;

fn build_tree(file_count: usize) -> MemoryFs {
    let fs = MemoryFs::new();
    for i in 0..file_count {
        let path = format!("module_{}/sub_{}/file_{i}.rs", i % 10, i % 7);
        let content = format!("// file {i}\nfn item_{i}() -> usize {{ {i} }}\n").repeat(8);
        fs.insert_file(&path, content).unwrap();
    }
    fs
}

fn benchmark_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");

    for file_count in &[100, 1000] {
        let fs = build_tree(*file_count);
        let scanner = DirectoryScanner::default();

        group.bench_with_input(
            BenchmarkId::from_parameter(file_count),
            file_count,
            |b, _| b.iter(|| black_box(scanner.scan(&fs))),
        );
    }

    group.finish();
}

fn benchmark_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    let fs = build_tree(1000);
    let scanner = DirectoryScanner::default();
    let before = scanner.scan(&fs);

    // Touch every tenth file so the report carries patches
    for i in (0..1000).step_by(10) {
        let path = format!("module_{}/sub_{}/file_{i}.rs", i % 10, i % 7);
        fs.insert_file(&path, format!("// rewritten {i}\n")).unwrap();
    }
    let after = scanner.scan(&fs);
    let engine = DiffEngine::default();

    group.bench_function("changes_only", |b| {
        b.iter(|| black_box(engine.compare(&before, &after)));
    });

    group.bench_function("with_all_files", |b| {
        b.iter(|| black_box(engine.compare_with_all_files(&before, &after)));
    });

    let report = engine.compare_with_all_files(&before, &after);
    group.bench_function("render_report", |b| {
        b.iter(|| {
            black_box(render_report(
                &report,
                &ReportOptions {
                    include_contents: true,
                },
            ))
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_scan, benchmark_compare);
criterion_main!(benches);
