//! Security Tests
//!
//! 入力ファイル検証のテストケースを実装します。
//! サイズ上限、拡張子の許可リスト、存在しないパス、壊れたコンテナへの対策を検証します。

use std::io::{Cursor, Write};

use rust_xlsxwriter::Workbook;
use xlsxdoc::{ProcessorBuilder, XlsxDocError};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

fn small_workbook(path: &std::path::Path) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Name").unwrap();
    worksheet.write_string(1, 0, "Alice").unwrap();
    workbook.save(path).unwrap();
}

/// サイズ上限を超えるファイルは開く前に拒否される
#[test]
fn test_input_file_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.xlsx");
    small_workbook(&path);
    let size = std::fs::metadata(&path).unwrap().len();

    let processor = ProcessorBuilder::new()
        .with_max_input_file_size(size - 1)
        .build()
        .unwrap();
    match processor.list_sheets(&path) {
        Err(XlsxDocError::UnsupportedFormat(msg)) => {
            assert!(msg.contains("exceeds maximum"));
        }
        e => panic!("Expected UnsupportedFormat error, got {:?}", e),
    }

    // ちょうど上限のサイズは許可される
    let processor = ProcessorBuilder::new()
        .with_max_input_file_size(size)
        .build()
        .unwrap();
    assert_eq!(processor.list_sheets(&path).unwrap(), vec!["Sheet1"]);
}

/// 旧バイナリ形式は再保存を促すメッセージで拒否される
#[test]
fn test_legacy_xls_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.xls");
    std::fs::write(&path, b"\xD0\xCF\x11\xE0").unwrap();

    match xlsxdoc::list_sheets(&path) {
        Err(XlsxDocError::UnsupportedFormat(msg)) => {
            assert!(msg.contains(".xlsx"));
            assert!(msg.contains("re-save"));
        }
        e => panic!("Expected UnsupportedFormat error, got {:?}", e),
    }
}

/// 許可リストにない拡張子は中身に関係なく拒否される
#[test]
fn test_unsupported_extension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = dir.path().join("data.xlsx");
    small_workbook(&xlsx);

    for name in ["data.csv", "data.zip", "data"] {
        let path = dir.path().join(name);
        std::fs::copy(&xlsx, &path).unwrap();
        assert!(
            matches!(
                xlsxdoc::list_sheets(&path),
                Err(XlsxDocError::UnsupportedFormat(_))
            ),
            "{} should be rejected",
            name
        );
    }
}

/// 拡張子の大文字小文字は区別しない
#[test]
fn test_extension_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("REPORT.XLSX");
    small_workbook(&path);

    assert_eq!(xlsxdoc::list_sheets(&path).unwrap(), vec!["Sheet1"]);
}

/// 存在しないパスとディレクトリはFileAccessエラーになる
#[test]
fn test_missing_file_and_directory() {
    let dir = tempfile::tempdir().unwrap();

    let err = xlsxdoc::list_sheets(dir.path().join("missing.xlsx")).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, XlsxDocError::FileAccess { .. }));

    let folder = dir.path().join("folder.xlsx");
    std::fs::create_dir(&folder).unwrap();
    match xlsxdoc::list_sheets(&folder) {
        Err(XlsxDocError::FileAccess { reason, .. }) => {
            assert_eq!(reason, "not a regular file");
        }
        e => panic!("Expected FileAccess error, got {:?}", e),
    }
}

/// 拡張子だけを偽装したテキストファイル
#[test]
fn test_renamed_text_file_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.xlsx");
    std::fs::write(&path, "this is not a workbook").unwrap();

    let err = xlsxdoc::list_sheets(&path).unwrap_err();
    assert!(matches!(err, XlsxDocError::CorruptFile(_)));
    assert!(!err.is_not_found());
}

/// ワークブックのパーツを含まないZIPアーカイブ
#[test]
fn test_zip_without_workbook_parts_is_corrupt() {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"not a spreadsheet").unwrap();
        zip.finish().unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.xlsx");
    std::fs::write(&path, zip_data).unwrap();

    assert!(matches!(
        xlsxdoc::list_sheets(&path),
        Err(XlsxDocError::CorruptFile(_))
    ));
}

/// 出力処理はすべての検証が成功するまでファイルを作成しない
#[test]
fn test_failed_validation_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.xlsx");
    small_workbook(&path);
    let output = dir.path().join("out").join("result.docx");

    let result = xlsxdoc::export_document(&path, &output, "Sheet1", &["Phone"], 1, 2, None);
    assert!(matches!(result, Err(XlsxDocError::MissingColumns(_))));
    assert!(!output.exists());
    assert!(!dir.path().join("out").exists());
}
