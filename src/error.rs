//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// xlsxdocクレート全体で使用するエラー型
///
/// ワークブックの読み込み、ヘッダー解決、行範囲の抽出、出力ファイルの生成中に
/// 発生するすべてのエラーを統一的に扱うために使用されます。
/// HTTP層などの呼び出し側は、バリアントごとにステータスコードや
/// ユーザー向けメッセージへマッピングします。
///
/// # エラーの種類
///
/// - `FileAccess`: 入力ファイルが存在しない、通常ファイルでない、読み込み中に消えた
/// - `UnsupportedFormat`: 拡張子が対象外、旧形式（.xls）、サイズ上限超過
/// - `CorruptFile`: calamineがコンテナを解析できない
/// - `SheetNotFound`: 指定シートが存在しない
/// - `InvalidRow`: ヘッダー行が範囲外
/// - `InvalidRange`: データ行範囲・列選択が不正
/// - `MissingColumns`: 選択列がヘッダー行に存在しない
/// - `EmptyResult`: 抽出結果が0行
/// - `Render`: 出力ファイルの書き込み、または外部コンバーターの失敗
/// - `Config`: ビルダー設定の検証エラー
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdoc::XlsxDocError;
///
/// match xlsxdoc::list_sheets("missing.xlsx") {
///     Err(XlsxDocError::FileAccess { path, .. }) => {
///         println!("not found: {}", path.display());
///     }
///     other => println!("{:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxDocError {
    /// 入力ファイルにアクセスできない
    ///
    /// パスが存在しない、通常ファイルではない、または検証後に削除された場合に
    /// 使用されます。
    #[error("Cannot access file '{}': {reason}", .path.display())]
    FileAccess {
        /// 対象パス
        path: PathBuf,
        /// 理由
        reason: String,
    },

    /// サポートされていない入力形式
    ///
    /// 拡張子が対象外の場合、旧バイナリ形式（.xls）の場合、
    /// またはファイルサイズが上限を超えた場合に発生します。
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// ワークブックの解析に失敗したエラー
    ///
    /// `#[from]`属性により、`calamine::XlsxError`から自動的に変換されます。
    #[error("Failed to parse spreadsheet: {0}")]
    CorruptFile(#[from] calamine::XlsxError),

    /// 指定されたシートが存在しない
    #[error("Sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound {
        /// 要求されたシート名
        sheet: String,
        /// ワークブック内のシート名
        available: Vec<String>,
    },

    /// ヘッダー行がシートの範囲外
    #[error("Invalid header row {row}: sheet has {total} rows")]
    InvalidRow {
        /// 要求された行番号（1始まり）
        row: u32,
        /// シートの行数
        total: u32,
    },

    /// 行範囲または列選択が不正
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// 選択列がヘッダー行に見つからない
    ///
    /// 最初の1件だけでなく、見つからなかったすべての列名を保持します。
    #[error("Columns not found: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// 抽出結果が空
    #[error("No data rows in the selected range: {0}")]
    EmptyResult(String),

    /// 出力の生成に失敗したエラー
    #[error("Render error: {0}")]
    Render(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ProcessorBuilder::build()`時に無効な設定が検出された場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),
}

impl XlsxDocError {
    /// 入力ファイルまたはシートが見つからないことを示すエラーかどうか
    ///
    /// 呼び出し側が「見つからない」と「リクエスト不正」を区別するために使用します。
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            XlsxDocError::FileAccess { .. } | XlsxDocError::SheetNotFound { .. }
        )
    }

    pub(crate) fn file_access(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        XlsxDocError::FileAccess {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn render(context: &str, err: impl std::fmt::Display) -> Self {
        XlsxDocError::Render(format!("{}: {}", context, err))
    }
}
