//! Security Module
//!
//! 入力ファイルの検証を実装するモジュール。
//! 存在確認、通常ファイル判定、拡張子の許可リスト、サイズ上限を提供します。

use std::io::ErrorKind;
use std::path::Path;

use crate::error::XlsxDocError;

/// 受け付けるスプレッドシートの拡張子（小文字、ドットなし）
pub(crate) const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// 旧バイナリ形式の拡張子
const LEGACY_EXTENSION: &str = "xls";

/// 入力制限の設定
///
/// ファイル処理時の上限値を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputLimits {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 50MiB (52_428_800 bytes)
    pub max_input_file_size: u64,
    /// 選択できる列の最大数
    /// デフォルト: 100
    pub max_selected_columns: usize,
    /// プレビューで返す行数の上限
    /// デフォルト: 50
    pub max_preview_rows: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_file_size: 52_428_800, // 50MiB
            max_selected_columns: 100,
            max_preview_rows: 50,
        }
    }
}

/// 入力ファイルの検証
///
/// ワークブックを開く前に、パス・拡張子・サイズを検証します。
///
/// # 引数
///
/// * `path` - 検証するファイルパス
/// * `max_size` - 許可する最大サイズ（バイト）
///
/// # 戻り値
///
/// * `Ok(u64)` - ファイルサイズ（バイト）
/// * `Err(XlsxDocError::FileAccess)` - パスが存在しない、または通常ファイルではない場合
/// * `Err(XlsxDocError::UnsupportedFormat)` - 拡張子が対象外、旧形式、またはサイズ超過の場合
pub(crate) fn validate_input_file(path: &Path, max_size: u64) -> Result<u64, XlsxDocError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => XlsxDocError::file_access(path, "file does not exist"),
        _ => XlsxDocError::file_access(path, e.to_string()),
    })?;

    if !metadata.is_file() {
        return Err(XlsxDocError::file_access(path, "not a regular file"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if extension == LEGACY_EXTENSION {
        return Err(XlsxDocError::UnsupportedFormat(
            "Legacy .xls workbooks are not supported; re-save the file as .xlsx and try again"
                .to_string(),
        ));
    }

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(XlsxDocError::UnsupportedFormat(format!(
            "'{}' is not a supported spreadsheet type (expected .xlsx or .xlsm)",
            path.display()
        )));
    }

    let size = metadata.len();
    if size > max_size {
        return Err(XlsxDocError::UnsupportedFormat(format!(
            "Input file size exceeds maximum: {} bytes (max: {} bytes)",
            size, max_size
        )));
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_input_limits_default() {
        let limits = InputLimits::default();
        assert_eq!(limits.max_input_file_size, 50 * 1024 * 1024);
        assert_eq!(limits.max_selected_columns, 100);
        assert_eq!(limits.max_preview_rows, 50);
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        match validate_input_file(&path, 1024) {
            Err(XlsxDocError::FileAccess { reason, .. }) => {
                assert_eq!(reason, "file does not exist");
            }
            other => panic!("Expected FileAccess error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder.xlsx");
        fs::create_dir(&path).unwrap();
        match validate_input_file(&path, 1024) {
            Err(XlsxDocError::FileAccess { reason, .. }) => {
                assert_eq!(reason, "not a regular file");
            }
            other => panic!("Expected FileAccess error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_legacy_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.XLS");
        fs::write(&path, b"legacy").unwrap();
        match validate_input_file(&path, 1024) {
            Err(XlsxDocError::UnsupportedFormat(msg)) => assert!(msg.contains("re-save")),
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, b"a,b").unwrap();
        assert!(matches!(
            validate_input_file(&path, 1024),
            Err(XlsxDocError::UnsupportedFormat(_))
        ));

        let path = dir.path().join("noext");
        fs::write(&path, b"a,b").unwrap();
        assert!(matches!(
            validate_input_file(&path, 1024),
            Err(XlsxDocError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_validate_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.xlsx");
        fs::write(&path, vec![0u8; 64]).unwrap();
        match validate_input_file(&path, 63) {
            Err(XlsxDocError::UnsupportedFormat(msg)) => {
                assert!(msg.contains("64 bytes"));
                assert!(msg.contains("max: 63 bytes"));
            }
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
        assert_eq!(validate_input_file(&path, 64).unwrap(), 64);
    }

    #[test]
    fn test_validate_macro_workbook_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.XLSM");
        fs::write(&path, b"zip").unwrap();
        assert!(validate_input_file(&path, 1024).is_ok());
    }
}
