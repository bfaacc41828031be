//! Extract Module
//!
//! ヘッダー行・データ行範囲・選択列からテーブルを切り出し、空セルを補完するモジュール。

use tracing::debug;

use crate::api::FillStrategy;
use crate::error::XlsxDocError;
use crate::grid::{is_blank, SheetGrid};
use crate::header::HeaderColumn;
use crate::types::{ExtractedTable, RowWindow};

/// 前方補完
///
/// 上から順に走査し、空（空白のみを含む）セルを同じ列の直前の非空値で置き換えます。
/// 先頭側で直前の値が存在しない空セルは空文字列になります。
///
/// # 使用例
///
/// ```rust
/// let mut region = vec![
///     "North".to_string(),
///     "".to_string(),
///     " ".to_string(),
///     "South".to_string(),
///     "".to_string(),
/// ];
/// xlsxdoc::forward_fill(&mut region);
/// assert_eq!(region, ["North", "North", "North", "South", "South"]);
/// ```
pub fn forward_fill(column: &mut [String]) {
    let mut last: Option<String> = None;
    for value in column.iter_mut() {
        if is_blank(value) {
            *value = last.clone().unwrap_or_default();
        } else {
            last = Some(value.clone());
        }
    }
}

/// 列選択の検証
///
/// # 戻り値
///
/// * `Ok(())` - 1列以上かつ上限以下の場合
/// * `Err(XlsxDocError::InvalidRange)` - 列が未選択、または上限を超える場合
pub(crate) fn validate_selection(
    selected_columns: &[String],
    max_columns: usize,
) -> Result<(), XlsxDocError> {
    if selected_columns.is_empty() {
        return Err(XlsxDocError::InvalidRange(
            "No columns selected for export".to_string(),
        ));
    }

    if selected_columns.len() > max_columns {
        return Err(XlsxDocError::InvalidRange(format!(
            "Too many columns selected: {} (max: {})",
            selected_columns.len(),
            max_columns
        )));
    }

    Ok(())
}

/// 行範囲抽出器
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extractor {
    fill: FillStrategy,
}

impl Extractor {
    /// 新しいExtractorインスタンスを生成
    pub fn new(fill: FillStrategy) -> Self {
        Self { fill }
    }

    /// テーブルを抽出する
    ///
    /// # 引数
    ///
    /// * `grid` - キャッシュ値で読み込んだグリッド（結合セル情報を含む）
    /// * `headers` - ヘッダー行から解決した列名
    /// * `window` - データ行範囲（検証済みであること）
    /// * `selected_columns` - 出力する列名（この順序で出力される）
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExtractedTable)` - 1行以上のテーブル
    /// * `Err(XlsxDocError::InvalidRange)` - データ開始行がシートの範囲外の場合
    /// * `Err(XlsxDocError::MissingColumns)` - 選択列がヘッダーに存在しない場合（すべての欠落列を含む）
    /// * `Err(XlsxDocError::EmptyResult)` - 抽出結果が0行の場合
    pub fn extract(
        &self,
        mut grid: SheetGrid,
        headers: &[HeaderColumn],
        window: &RowWindow,
        selected_columns: &[String],
    ) -> Result<ExtractedTable, XlsxDocError> {
        // 1. データ開始行の範囲検証
        let total = grid.nominal_rows();
        if window.data_start_row as usize > total {
            return Err(XlsxDocError::InvalidRange(format!(
                "Data start row ({}) exceeds the sheet's {} rows",
                window.data_start_row, total
            )));
        }

        // 2. 選択列の位置解決（同名の列は最初の位置を使用）
        let mut positions = Vec::with_capacity(selected_columns.len());
        let mut missing = Vec::new();
        for column in selected_columns {
            let wanted = column.trim();
            match headers.iter().find(|h| h.name == wanted) {
                Some(header) => positions.push(header.index),
                None => missing.push(column.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(XlsxDocError::MissingColumns(missing));
        }

        // 3. 結合セルの展開（ヘッダー行より下のみ）
        let header_row = window.header_row as usize;
        let merged = if self.fill.uses_merges() {
            grid.broadcast_merges(header_row)
        } else {
            0
        };

        // 4. ヘッダー行の直下から最後のデータ行までをテーブルとしてスライス
        let extent = grid.extent();
        let table_len = (extent.last_data_row as usize).saturating_sub(header_row);
        let (start, end) = window.slice_bounds(table_len);
        if start >= end {
            return Err(XlsxDocError::EmptyResult(format!(
                "rows {}..{} of the sheet contain no data",
                window.data_start_row,
                window
                    .data_end_row
                    .map(|row| row.to_string())
                    .unwrap_or_else(|| "end".to_string())
            )));
        }

        // 5. 列ごとに射影して補完
        let mut columns: Vec<Vec<String>> = positions
            .iter()
            .map(|&col| {
                (start..end)
                    .map(|r| grid.cell(header_row + r, col).to_string())
                    .collect()
            })
            .collect();

        if self.fill.uses_forward_fill() {
            for column in &mut columns {
                forward_fill(column);
            }
        }

        let rows: Vec<Vec<String>> = (0..end - start)
            .map(|r| columns.iter().map(|column| column[r].clone()).collect())
            .collect();

        debug!(
            header_row = window.header_row,
            data_start_row = window.data_start_row,
            rows = rows.len(),
            columns = positions.len(),
            merged_cells_filled = merged,
            fill = ?self.fill,
            "extracted table"
        );

        Ok(ExtractedTable::new(
            selected_columns.iter().map(|c| c.trim().to_string()).collect(),
            rows,
        ))
    }
}
