//! Grid Module
//!
//! calamineの範囲データから、シート座標に揃えた稠密なテキストグリッドを構築するモジュール。
//! 結合セルの値の展開もここで行います。

use std::sync::OnceLock;

use calamine::{Data, Range};

use crate::extent::{resolve_extent, SheetExtent};
use crate::formatter::CellFormatter;
use crate::types::{CellCoord, MergedRegion};

/// 空セル判定
///
/// 値が空文字列、または空白文字のみで構成される場合に空とみなします。
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// シート全体のテキストグリッド
///
/// 行・列はシート上の絶対位置（0始まり）に対応します。
/// `rows`と`cols`はフォーマットが報告する見かけ上の範囲であり、
/// 実際にデータがある範囲は`extent()`で求め、セルが書き換わるまで再利用します。
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetGrid {
    /// グリッドデータ（行 × 列）
    cells: Vec<Vec<String>>,

    /// 行数
    rows: usize,

    /// 列数
    cols: usize,

    /// 結合セル範囲
    merged_regions: Vec<MergedRegion>,

    /// 実データ範囲（初回の`extent()`で計算）
    extent: OnceLock<SheetExtent>,
}

impl SheetGrid {
    /// calamineの範囲データからグリッドを構築
    ///
    /// # 引数
    ///
    /// * `range` - `worksheet_range`で取得したセル範囲
    /// * `formatter` - セル値のテキスト化に使用するフォーマッター
    pub fn from_range(range: &Range<Data>, formatter: &CellFormatter) -> Self {
        let (Some(start), Some(end)) = (range.start(), range.end()) else {
            return Self::default();
        };

        let mut grid = Self::default();
        grid.ensure_size(end.0 as usize + 1, end.1 as usize + 1);

        for (row, col, value) in range.used_cells() {
            let text = formatter.format_value(value);
            if text.is_empty() {
                continue;
            }
            let r = start.0 as usize + row;
            let c = start.1 as usize + col;
            grid.cells[r][c] = text;
        }

        grid
    }

    /// 数式を重ねる（数式読み取りモード用）
    ///
    /// 数式を持つセルは `=` 付きの数式文字列に置き換えられ、
    /// それ以外のセルはキャッシュ値のまま残ります。
    pub fn overlay_formulas(&mut self, formulas: &Range<String>, formatter: &CellFormatter) {
        let (Some(start), Some(end)) = (formulas.start(), formulas.end()) else {
            return;
        };

        self.ensure_size(end.0 as usize + 1, end.1 as usize + 1);

        for (row, col, formula) in formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let r = start.0 as usize + row;
            let c = start.1 as usize + col;
            self.cells[r][c] = formatter.format_formula(formula);
        }
        self.extent = OnceLock::new();
    }

    /// 行データからグリッドを構築（長さの異なる行は空文字列で補う）
    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::default();
        grid.ensure_size(rows.len(), cols);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.cells[r][c] = value;
            }
        }
        grid
    }

    /// 結合セル範囲を設定
    pub fn with_merged_regions(mut self, regions: Vec<MergedRegion>) -> Self {
        self.merged_regions = regions;
        self
    }

    /// 見かけ上の行数
    pub fn nominal_rows(&self) -> usize {
        self.rows
    }

    /// 見かけ上の列数
    pub fn nominal_cols(&self) -> usize {
        self.cols
    }

    /// すべての行
    pub fn rows(&self) -> &[Vec<String>] {
        &self.cells
    }

    /// 指定行（範囲外の場合は空スライス）
    pub fn row(&self, index: usize) -> &[String] {
        self.cells.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 指定セルの値（範囲外の場合は空文字列）
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.row(row).get(col).map(String::as_str).unwrap_or("")
    }

    /// 実データ範囲
    ///
    /// 走査はグリッドごとに1回だけ行われ、`overlay_formulas`や
    /// `broadcast_merges`でセルが書き換わった場合にのみ再計算されます。
    pub fn extent(&self) -> SheetExtent {
        *self.extent.get_or_init(|| resolve_extent(&self.cells))
    }

    /// 結合セル範囲
    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }

    /// 結合セルの親セルの値を結合範囲内のセルに複製する
    ///
    /// `first_row`（0始まり）より上の行は変更しません。
    /// ヘッダー行より下のデータ行だけに展開するために使用します。
    ///
    /// # 戻り値
    ///
    /// 値を書き込んだセルの数
    pub fn broadcast_merges(&mut self, first_row: usize) -> usize {
        let mut filled = 0;
        let regions = std::mem::take(&mut self.merged_regions);

        for region in &regions {
            let parent = region.parent;
            let value = self.cell(parent.row as usize, parent.col as usize).to_string();
            if is_blank(&value) {
                continue;
            }

            self.ensure_size(
                region.range.end.row as usize + 1,
                region.range.end.col as usize + 1,
            );

            let row_start = (region.range.start.row as usize).max(first_row);
            for row in row_start..=region.range.end.row as usize {
                for col in region.range.start.col as usize..=region.range.end.col as usize {
                    if CellCoord::new(row as u32, col as u32) == parent {
                        continue;
                    }
                    self.cells[row][col] = value.clone();
                    filled += 1;
                }
            }
        }

        self.merged_regions = regions;
        if filled > 0 {
            self.extent = OnceLock::new();
        }
        filled
    }

    /// グリッドを少なくとも指定サイズまで拡張する
    fn ensure_size(&mut self, rows: usize, cols: usize) {
        if cols > self.cols {
            for row in &mut self.cells {
                row.resize(cols, String::new());
            }
            self.cols = cols;
        }
        if rows > self.rows {
            self.cells.resize(rows, vec![String::new(); self.cols]);
            self.rows = rows;
        }
    }
}
