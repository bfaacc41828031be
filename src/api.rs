//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// 日付の出力形式
///
/// 日付セルをテキストに変換する際の出力形式を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式（YYYY-MM-DD）
    ///
    /// 時刻部分が0でない場合は `YYYY-MM-DD HH:MM:SS` になります。
    ///
    /// 例: `2025-11-20`, `2025-11-20 09:30:00`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    /// - `%H`: 24時間形式の時（00-23）
    /// - `%M`: 分（00-59）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdoc::{DateFormat, ProcessorBuilder};
    ///
    /// # fn main() -> Result<(), xlsxdoc::XlsxDocError> {
    /// let processor = ProcessorBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// セル値の読み取りモード
///
/// ヘッダー解決は`Value`で読み取り、名前が1つも得られない場合は
/// `Formula`で再試行します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReadMode {
    /// キャッシュされた計算結果を読み取る
    Value,

    /// 数式セルは `=` 付きの数式文字列として読み取り、それ以外はキャッシュ値を読み取る
    ///
    /// 例: `SUM(A1:A10)` → `=SUM(A1:A10)`
    Formula,
}

/// ヘッダー行の空セルの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeaderPolicy {
    /// 空セルに `"Column {n}"`（1始まりの列番号）を割り当てる（デフォルト）
    ///
    /// 列の位置関係が保たれるため、列名による後段の照合と整合します。
    ///
    /// 例: `["Name", "", "Email"]` → `["Name", "Column 2", "Email"]`
    Placeholder,

    /// 空セルを読み飛ばす
    ///
    /// 例: `["Name", "", "Email"]` → `["Name", "Email"]`
    Skip,
}

/// データ行の空セル補完戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FillStrategy {
    /// 結合セルの値を結合範囲へ展開し、残った空セルを前方補完する（デフォルト）
    MergeThenForward,

    /// 結合セルの値を結合範囲へ展開するだけ
    ///
    /// 結合されていない空セルは空文字列のまま残ります。
    MergeAware,

    /// 結合情報を使わず、列ごとに直前の非空値で空セルを埋める
    ///
    /// 例: `["North", "", "", "South", ""]` → `["North", "North", "North", "South", "South"]`
    ForwardFill,
}

impl FillStrategy {
    /// 結合セルの展開を行うかどうか
    pub(crate) fn uses_merges(self) -> bool {
        matches!(self, FillStrategy::MergeThenForward | FillStrategy::MergeAware)
    }

    /// 前方補完を行うかどうか
    pub(crate) fn uses_forward_fill(self) -> bool {
        matches!(self, FillStrategy::MergeThenForward | FillStrategy::ForwardFill)
    }
}

/// プレビュー行の切り出し方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreviewMode {
    /// 先頭から最大N行を読み取り、その範囲内で最後にデータがある行で切り詰める
    ///
    /// 範囲内の途中の空行は残り、シートの行番号との対応が保たれます。
    Window,

    /// 先頭から読み取り、データ開始後の最初の空行で打ち切る（デフォルト）
    LeadingBlock,

    /// シート全体から空でない行だけを最大N行集める
    NonBlankRows,
}
