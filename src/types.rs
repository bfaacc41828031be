//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use serde::Serialize;

use crate::error::XlsxDocError;

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// セル範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellRange {
    pub start: CellCoord,
    pub end: CellCoord,
}

impl CellRange {
    /// 新しい範囲を生成
    pub fn new(start: CellCoord, end: CellCoord) -> Self {
        Self { start, end }
    }

    /// 指定された座標が範囲内にあるかを判定
    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row >= self.start.row
            && coord.row <= self.end.row
            && coord.col >= self.start.col
            && coord.col <= self.end.col
    }
}

/// セル結合範囲の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MergedRegion {
    /// 結合範囲
    pub range: CellRange,

    /// 親セル（左上セル）の座標
    pub parent: CellCoord,
}

impl MergedRegion {
    /// 新しい結合範囲を生成
    pub fn new(range: CellRange) -> Self {
        Self {
            parent: range.start,
            range,
        }
    }
}

/// プレビュー結果
///
/// `rows`の各行は`total_columns`個のセル文字列を持ちます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// プレビュー行（セルはテキスト化済み）
    pub rows: Vec<Vec<String>>,
    /// データを含む最後の行の行番号（1始まり）
    pub total_data_rows: u32,
    /// データを含む最後の列の列番号（1始まり）
    pub total_columns: u32,
}

impl Preview {
    /// 空シートのプレビュー
    pub(crate) fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total_data_rows: 0,
            total_columns: 0,
        }
    }
}

/// 抽出・補完済みのテーブル
///
/// 各行は`columns`と同じ長さを持ち、値が欠けることはありません。
/// 抽出に成功した場合、行数は常に1以上です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// 選択された列名（呼び出し側の指定順）
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行データ
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 指定行・列名の値を取得
    ///
    /// 同名の列が複数ある場合は最初の列の値を返します。
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    /// 指定列の値を上から順に取得
    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|r| r[index].as_str()).collect())
    }

    /// 各行を `(列名, 値)` の組として走査する
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &str)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.as_str(), v.as_str()))
                .collect()
        })
    }
}

/// データ行の範囲指定（すべて1始まり）
///
/// `data_end_row`を省略した場合、シートの最後のデータ行までが対象になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    /// ヘッダー行
    pub header_row: u32,
    /// データ開始行（`header_row`より大きいこと）
    pub data_start_row: u32,
    /// データ終了行（両端を含む）
    pub data_end_row: Option<u32>,
}

impl RowWindow {
    /// 新しい範囲指定を生成
    pub fn new(header_row: u32, data_start_row: u32, data_end_row: Option<u32>) -> Self {
        Self {
            header_row,
            data_start_row,
            data_end_row,
        }
    }

    /// 行範囲の整合性を検証する
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 範囲が有効な場合
    /// * `Err(XlsxDocError::InvalidRange)` - 開始行がヘッダー行以下、または終了行が開始行より前の場合
    pub fn validate(&self) -> Result<(), XlsxDocError> {
        if self.header_row == 0 {
            return Err(XlsxDocError::InvalidRange(
                "Header row must be 1 or greater".to_string(),
            ));
        }

        if self.data_start_row <= self.header_row {
            return Err(XlsxDocError::InvalidRange(format!(
                "Data start row ({}) must be greater than header row ({})",
                self.data_start_row, self.header_row
            )));
        }

        if let Some(end) = self.data_end_row {
            if end < self.data_start_row {
                return Err(XlsxDocError::InvalidRange(format!(
                    "Data end row ({}) must not be before data start row ({})",
                    end, self.data_start_row
                )));
            }
        }

        Ok(())
    }

    /// ヘッダー行直下から始まるテーブル上のスライス範囲（0始まり、終端を含まない）
    ///
    /// # 引数
    ///
    /// * `table_len` - ヘッダー行より下のデータ行数
    pub(crate) fn slice_bounds(&self, table_len: usize) -> (usize, usize) {
        let start = self.data_start_row.saturating_sub(self.header_row + 1) as usize;
        let end = self
            .data_end_row
            .map(|end| end.saturating_sub(self.header_row) as usize)
            .unwrap_or(table_len)
            .min(table_len);
        (start.min(end), end)
    }
}
