//! パフォーマンスベンチマーク
//!
//! このモジュールは、xlsxdocクレートのパフォーマンスを測定するためのベンチマークを提供します。
//!
//! 実装するベンチマーク:
//! - 実データ範囲の走査（並列集約）
//! - 前方補完
//! - ワークブックからの抽出とDOCX出力
//!
//! ワークブックは実行時に一時ディレクトリへ生成します。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::Workbook;
use std::path::Path;
use xlsxdoc::{forward_fill, resolve_extent, ExportRequest, ProcessorBuilder};

/// 末尾に空行を含む合成シート（5行ごとに地域が入り、それ以外は空欄）
fn synthetic_rows(rows: usize, cols: usize) -> Vec<Vec<String>> {
    let mut data: Vec<Vec<String>> = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| match c {
                    0 if r % 5 == 0 => format!("Region {}", r / 5),
                    0 => String::new(),
                    _ => format!("R{}C{}", r, c),
                })
                .collect()
        })
        .collect();
    data.extend((0..rows / 10).map(|_| vec![String::new(); cols]));
    data
}

fn write_workbook(path: &Path, rows: &[Vec<String>]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for c in 0..rows[0].len() {
        worksheet
            .write_string(0, c as u16, format!("Col{}", c))
            .unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet
                    .write_string(r as u32 + 1, c as u16, value)
                    .unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}

fn benchmark_extent_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("extent_scan");
    for rows in [1_000usize, 10_000, 100_000] {
        let data = synthetic_rows(rows, 20);
        group.throughput(Throughput::Elements(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| black_box(resolve_extent(black_box(data))));
        });
    }
    group.finish();
}

fn benchmark_forward_fill(c: &mut Criterion) {
    let column: Vec<String> = synthetic_rows(100_000, 1)
        .into_iter()
        .map(|mut row| row.remove(0))
        .collect();

    c.bench_function("forward_fill_100k", |b| {
        b.iter(|| {
            let mut values = column.clone();
            forward_fill(black_box(&mut values));
            black_box(values)
        });
    });
}

fn benchmark_export_document(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bench.xlsx");
    write_workbook(&input, &synthetic_rows(5_000, 10));
    let output = dir.path().join("bench.docx");

    let processor = ProcessorBuilder::new().build().unwrap();
    let request = ExportRequest::new("Sheet1", ["Col0", "Col3", "Col7"], 1, 2);

    let mut group = c.benchmark_group("workbook");
    group.sample_size(10);
    group.bench_function("extract_5k_rows", |b| {
        b.iter(|| black_box(processor.extract(&input, &request).unwrap()));
    });
    group.bench_function("export_docx_5k_rows", |b| {
        b.iter(|| black_box(processor.export_document(&input, &output, &request).unwrap()));
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_extent_scan,
    benchmark_forward_fill,
    benchmark_export_document
);
criterion_main!(benches);
