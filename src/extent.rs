//! Extent Module
//!
//! シートの実際のデータ範囲（最後の使用列・最後のデータ行）を求めるモジュール。
//! フォーマットが報告する範囲は、書式だけが残ったセルや値を消したセルも含むため、
//! プレビューと抽出はすべてこの結果を基準にします。

use rayon::prelude::*;

use crate::grid::is_blank;

/// シートの実データ範囲（1始まり、0はデータなし）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SheetExtent {
    /// 空でないセルを含む最後の列の列番号
    pub max_used_column: u32,
    /// 空でないセルを含む最後の行の行番号
    pub last_data_row: u32,
}

impl SheetExtent {
    /// シートに空でないセルが1つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.max_used_column == 0
    }

    fn merge(self, other: Self) -> Self {
        Self {
            max_used_column: self.max_used_column.max(other.max_used_column),
            last_data_row: self.last_data_row.max(other.last_data_row),
        }
    }
}

/// 行内で最後に空でないセルの列番号（1始まり、すべて空なら0）
pub fn last_used_column<S: AsRef<str>>(row: &[S]) -> u32 {
    row.iter()
        .rposition(|cell| !is_blank(cell.as_ref()))
        .map(|index| index as u32 + 1)
        .unwrap_or(0)
}

/// 全行を走査して実データ範囲を求める
///
/// 行単位で並列に走査し、列・行それぞれの最大値を集約します。
/// 結果は逐次走査と同一です。
///
/// # 引数
///
/// * `rows` - シート座標に揃えた行データ
///
/// # 戻り値
///
/// 実データ範囲（空シートの場合は両方0）
pub fn resolve_extent<S: AsRef<str> + Sync>(rows: &[Vec<S>]) -> SheetExtent {
    rows.par_iter()
        .enumerate()
        .map(|(index, row)| {
            let column = last_used_column(row);
            SheetExtent {
                max_used_column: column,
                last_data_row: if column > 0 { index as u32 + 1 } else { 0 },
            }
        })
        .reduce(SheetExtent::default, SheetExtent::merge)
}

/// 全行を通した最後の使用列の列番号
pub fn max_used_column<S: AsRef<str> + Sync>(rows: &[Vec<S>]) -> u32 {
    resolve_extent(rows).max_used_column
}
